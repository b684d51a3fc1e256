use std::str::FromStr;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::SessionDbError;

/// Values that can be bound as parameters or read back from a result row.
///
/// The same enum is used for both engines so repository code never branches on driver types:
/// ```rust
/// use sql_session::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("ana".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Read a boolean, accepting the `0`/`1` integers the embedded engine stores.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RowValues::Bool(value) => Some(*value),
            RowValues::Int(1) => Some(true),
            RowValues::Int(0) => Some(false),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RowValues::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            RowValues::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// Which relational engine a process talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
pub enum EngineKind {
    /// In-process `SQLite` file.
    #[value(name = "embedded", aliases = ["sqlite", "file"])]
    #[serde(rename = "embedded", alias = "sqlite")]
    EmbeddedFile,
    /// `PostgreSQL` server reached over a socket.
    #[value(name = "networked", aliases = ["postgres", "postgresql", "network"])]
    #[serde(rename = "networked", alias = "postgres", alias = "postgresql")]
    NetworkServer,
}

impl EngineKind {
    #[must_use]
    pub fn is_networked(self) -> bool {
        matches!(self, EngineKind::NetworkServer)
    }

    /// Short human label used in logs and `Database::info`.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            EngineKind::EmbeddedFile => "sqlite",
            EngineKind::NetworkServer => "postgresql",
        }
    }
}

impl FromStr for EngineKind {
    type Err = SessionDbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <EngineKind as ValueEnum>::from_str(s.trim(), true).map_err(|_| {
            SessionDbError::ConfigError(format!(
                "unknown database mode {s:?}; expected `embedded` or `networked`"
            ))
        })
    }
}

/// Key casing applied to result rows by a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyCase {
    /// Upper-case every column name.
    #[default]
    Upper,
    /// Keep the spelling reported by the driver.
    Preserve,
}

impl KeyCase {
    #[must_use]
    pub fn apply(self, name: &str) -> String {
        match self {
            KeyCase::Upper => name.to_uppercase(),
            KeyCase::Preserve => name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_kind_parses_mode_flags() {
        assert_eq!("embedded".parse::<EngineKind>().unwrap(), EngineKind::EmbeddedFile);
        assert_eq!("SQLite".parse::<EngineKind>().unwrap(), EngineKind::EmbeddedFile);
        assert_eq!("networked".parse::<EngineKind>().unwrap(), EngineKind::NetworkServer);
        assert_eq!(" postgresql ".parse::<EngineKind>().unwrap(), EngineKind::NetworkServer);
        assert!(matches!(
            "mysql".parse::<EngineKind>(),
            Err(SessionDbError::ConfigError(_))
        ));
    }

    #[test]
    fn as_bool_accepts_integer_flags() {
        assert_eq!(RowValues::Int(1).as_bool(), Some(true));
        assert_eq!(RowValues::Int(0).as_bool(), Some(false));
        assert_eq!(RowValues::Int(2).as_bool(), None);
        assert_eq!(RowValues::Bool(false).as_bool(), Some(false));
    }
}
