//! Placeholder and literal handling that differs between the two engines.
//!
//! Call sites write SQL with the canonical `?` placeholder. [`rewrite`] turns that into the
//! active engine's syntax while leaving quoted text, comments and dollar-quoted bodies alone.

use std::borrow::Cow;

mod parsers;
mod scanner;

use scanner::{State, advance, open_at, scan_digits};

use crate::types::EngineKind;

/// Placeholder token accepted by every statement in this crate.
pub const CANONICAL_PLACEHOLDER: &str = "?";

/// Target placeholder style for translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// PostgreSQL-style placeholders like `$1`.
    Postgres,
    /// SQLite-style placeholders like `?` or `?1`.
    Sqlite,
}

impl From<EngineKind> for PlaceholderStyle {
    fn from(kind: EngineKind) -> Self {
        match kind {
            EngineKind::EmbeddedFile => PlaceholderStyle::Sqlite,
            EngineKind::NetworkServer => PlaceholderStyle::Postgres,
        }
    }
}

impl EngineKind {
    /// Marker for the bound parameter at 1-based `position`.
    ///
    /// ```rust
    /// use sql_session::prelude::*;
    ///
    /// assert_eq!(EngineKind::EmbeddedFile.placeholder(3), "?");
    /// assert_eq!(EngineKind::NetworkServer.placeholder(3), "$3");
    /// ```
    #[must_use]
    pub fn placeholder(self, position: usize) -> Cow<'static, str> {
        match self {
            EngineKind::EmbeddedFile => Cow::Borrowed(CANONICAL_PLACEHOLDER),
            EngineKind::NetworkServer => Cow::Owned(format!("${position}")),
        }
    }

    /// Boolean literal this engine expects in hand-written SQL.
    ///
    /// Legacy embedded tables store flags as `0`/`1`; the network engine has a real boolean
    /// type. Nothing is coerced: callers embed the literal returned here.
    #[must_use]
    pub fn boolean_literal(self, value: bool) -> &'static str {
        match (self, value) {
            (EngineKind::EmbeddedFile, true) => "1",
            (EngineKind::EmbeddedFile, false) => "0",
            (EngineKind::NetworkServer, true) => "TRUE",
            (EngineKind::NetworkServer, false) => "FALSE",
        }
    }
}

/// Rewrite canonical placeholders in `sql` for `kind`.
///
/// Returns a borrowed `Cow` when no changes are needed.
#[must_use]
pub fn rewrite(sql: &str, kind: EngineKind) -> Cow<'_, str> {
    translate_placeholders(sql, kind.into())
}

/// Translate placeholders to `target`.
///
/// - `Postgres`: bare `?` becomes `$n`, numbered the way `SQLite` numbers it (one more than the
///   largest index used so far), and `?N` becomes `$N`.
/// - `Sqlite`: `$N` becomes `?N`; bare `?` is already native.
///
/// Quoted strings, identifiers, comments and dollar-quoted blocks are skipped. Operators that
/// contain `?` (for example the jsonb `?|`) are not distinguished from placeholders; build such
/// statements with [`crate::query_builder::SqlBuilder`] or dialect-specific SQL instead.
#[must_use]
pub fn translate_placeholders(sql: &str, target: PlaceholderStyle) -> Cow<'_, str> {
    let bytes = sql.as_bytes();
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut highest: u64 = 0;
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        if state != State::Normal {
            let (next, last) = advance(state, bytes, idx);
            state = next;
            idx = last + 1;
            continue;
        }
        if let Some((next, last)) = open_at(bytes, idx) {
            state = next;
            idx = last + 1;
            continue;
        }

        match (bytes[idx], target) {
            (b'?', PlaceholderStyle::Postgres) => {
                let (end, number) = match scan_digits(bytes, idx + 1) {
                    Some((end, digits)) => (end, digits.to_string()),
                    None => (idx + 1, (highest + 1).to_string()),
                };
                highest = highest.max(number.parse().unwrap_or(highest));
                let buf = out.get_or_insert_with(|| String::with_capacity(sql.len() + 8));
                buf.push_str(&sql[copied..idx]);
                buf.push('$');
                buf.push_str(&number);
                copied = end;
                idx = end;
            }
            (b'$', PlaceholderStyle::Postgres) => {
                if let Some((end, digits)) = scan_digits(bytes, idx + 1) {
                    highest = highest.max(digits.parse().unwrap_or(highest));
                    idx = end;
                } else {
                    idx += 1;
                }
            }
            (b'$', PlaceholderStyle::Sqlite) => {
                if let Some((end, digits)) = scan_digits(bytes, idx + 1) {
                    let buf = out.get_or_insert_with(|| String::with_capacity(sql.len()));
                    buf.push_str(&sql[copied..idx]);
                    buf.push('?');
                    buf.push_str(digits);
                    copied = end;
                    idx = end;
                } else {
                    idx += 1;
                }
            }
            _ => idx += 1,
        }
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    }
}

/// Split a multi-statement script on `;` boundaries.
///
/// Semicolons inside quotes, comments and dollar-quoted bodies do not split. Fragments that
/// hold nothing but whitespace and comments are dropped.
#[must_use]
pub fn split_statements(script: &str) -> Vec<&str> {
    let bytes = script.as_bytes();
    let mut statements = Vec::new();
    let mut start = 0;
    let mut has_code = false;
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        if state != State::Normal {
            let (next, last) = advance(state, bytes, idx);
            state = next;
            idx = last + 1;
            continue;
        }
        if let Some((next, last)) = open_at(bytes, idx) {
            if !matches!(next, State::LineComment | State::BlockComment(_)) {
                has_code = true;
            }
            state = next;
            idx = last + 1;
            continue;
        }

        match bytes[idx] {
            b';' => {
                if has_code {
                    statements.push(script[start..idx].trim());
                }
                start = idx + 1;
                has_code = false;
            }
            b if !b.is_ascii_whitespace() => has_code = true,
            _ => {}
        }
        idx += 1;
    }

    if has_code {
        statements.push(script[start..].trim());
    }
    statements
}
