use std::error::Error;
use std::fmt::Write;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Kind, Type};

use crate::error::SessionDbError;
use crate::results::ResultSet;
use crate::types::{KeyCase, RowValues};

/// Extracts a `RowValues` from a `tokio_postgres` row at the given index.
///
/// # Errors
/// Returns `SessionDbError::PostgresError` if the column cannot be decoded, or
/// `SessionDbError::ExecutionError` for a malformed UUID or INTERVAL payload.
pub fn postgres_extract_value(row: &Row, idx: usize) -> Result<RowValues, SessionDbError> {
    let type_info = row.columns()[idx].type_();

    let value = match *type_info {
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)?
            .map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)?
            .map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))),
        Type::INT8 => row
            .try_get::<_, Option<i64>>(idx)?
            .map_or(RowValues::Null, RowValues::Int),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)?
            .map_or(RowValues::Null, |v| RowValues::Float(f64::from(v))),
        Type::FLOAT8 => row
            .try_get::<_, Option<f64>>(idx)?
            .map_or(RowValues::Null, RowValues::Float),
        Type::BOOL => row
            .try_get::<_, Option<bool>>(idx)?
            .map_or(RowValues::Null, RowValues::Bool),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map_or(RowValues::Null, RowValues::Timestamp),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map_or(RowValues::Null, |v| RowValues::Timestamp(v.naive_utc())),
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(idx)?
            .map_or(RowValues::Null, |v| {
                RowValues::Timestamp(v.and_time(NaiveTime::MIN))
            }),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<Value>>(idx)?
            .map_or(RowValues::Null, RowValues::JSON),
        Type::BYTEA => row
            .try_get::<_, Option<Vec<u8>>>(idx)?
            .map_or(RowValues::Null, RowValues::Blob),
        Type::NUMERIC => row
            .try_get::<_, Option<NumericText>>(idx)?
            .map_or(RowValues::Null, |v| RowValues::Text(v.0)),
        Type::TIME => row
            .try_get::<_, Option<NaiveTime>>(idx)?
            .map_or(RowValues::Null, |v| RowValues::Text(v.to_string())),
        Type::UUID => row
            .try_get::<_, Option<RawValue>>(idx)?
            .map_or(Ok(RowValues::Null), |v| format_uuid(&v.0).map(RowValues::Text))?,
        Type::INTERVAL => row
            .try_get::<_, Option<RawValue>>(idx)?
            .map_or(Ok(RowValues::Null), |v| format_interval(&v.0).map(RowValues::Text))?,
        ref other if <String as FromSql<'_>>::accepts(other) => row
            .try_get::<_, Option<String>>(idx)?
            .map_or(RowValues::Null, RowValues::Text),
        // enums travel as their label; anything else is handed over undecoded
        ref other => {
            let is_enum = matches!(other.kind(), Kind::Enum(_));
            row.try_get::<_, Option<RawValue>>(idx)?
                .map_or(RowValues::Null, |v| {
                    if is_enum {
                        RowValues::Text(String::from_utf8_lossy(&v.0).into_owned())
                    } else {
                        RowValues::Blob(v.0)
                    }
                })
        }
    };
    Ok(value)
}

/// Binary wire bytes of any column type.
struct RawValue(Vec<u8>);

impl<'a> FromSql<'a> for RawValue {
    fn from_sql(_: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(Self(raw.to_vec()))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

/// NUMERIC rendered as exact decimal text, keeping the column's scale.
struct NumericText(String);

impl<'a> FromSql<'a> for NumericText {
    fn from_sql(_: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        decode_numeric(raw).map(Self)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

fn read_u16(raw: &[u8], at: usize) -> Result<u16, Box<dyn Error + Sync + Send>> {
    raw.get(at..at + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or_else(|| "numeric value is truncated".into())
}

/// Decode the binary NUMERIC layout: digit count, weight, sign and display scale, then
/// base-10000 digits with the first one weighted `10000^weight`.
fn decode_numeric(raw: &[u8]) -> Result<String, Box<dyn Error + Sync + Send>> {
    let ndigits = usize::from(read_u16(raw, 0)?);
    let weight = i64::from(i16::from_be_bytes(read_u16(raw, 2)?.to_be_bytes()));
    let sign = read_u16(raw, 4)?;
    let dscale = usize::from(read_u16(raw, 6)?);
    match sign {
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_PINF => return Ok("Infinity".to_string()),
        NUMERIC_NINF => return Ok("-Infinity".to_string()),
        _ => {}
    }
    let digits = (0..ndigits)
        .map(|i| read_u16(raw, 8 + 2 * i))
        .collect::<Result<Vec<u16>, _>>()?;
    let digit_at = |i: i64| {
        usize::try_from(i)
            .ok()
            .and_then(|i| digits.get(i).copied())
            .unwrap_or(0)
    };

    let mut out = String::new();
    if sign == NUMERIC_NEG {
        out.push('-');
    }
    if weight < 0 {
        out.push('0');
    } else {
        for i in 0..=weight {
            if i == 0 {
                write!(out, "{}", digit_at(i))?;
            } else {
                write!(out, "{:04}", digit_at(i))?;
            }
        }
    }
    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        let mut group = weight + 1;
        while fraction.len() < dscale {
            write!(fraction, "{:04}", digit_at(group))?;
            group += 1;
        }
        fraction.truncate(dscale);
        out.push('.');
        out.push_str(&fraction);
    }
    Ok(out)
}

fn format_uuid(raw: &[u8]) -> Result<String, SessionDbError> {
    if raw.len() != 16 {
        return Err(SessionDbError::ExecutionError(format!(
            "uuid value has {} bytes, expected 16",
            raw.len()
        )));
    }
    let mut out = String::with_capacity(36);
    for (i, byte) in raw.iter().enumerate() {
        if matches!(i, 4 | 6 | 8 | 10) {
            out.push('-');
        }
        let _ = write!(out, "{byte:02x}");
    }
    Ok(out)
}

/// INTERVAL as an ISO 8601 duration, e.g. `P1M2DT3.5S`.
fn format_interval(raw: &[u8]) -> Result<String, SessionDbError> {
    let (Some(micros), Some(days), Some(months)) = (
        raw.get(0..8).and_then(|b| b.try_into().ok()).map(i64::from_be_bytes),
        raw.get(8..12).and_then(|b| b.try_into().ok()).map(i32::from_be_bytes),
        raw.get(12..16).and_then(|b| b.try_into().ok()).map(i32::from_be_bytes),
    ) else {
        return Err(SessionDbError::ExecutionError(format!(
            "interval value has {} bytes, expected 16",
            raw.len()
        )));
    };
    let sign = if micros < 0 { "-" } else { "" };
    let abs = micros.unsigned_abs();
    let (secs, frac) = (abs / 1_000_000, abs % 1_000_000);
    let mut out = format!("P{months}M{days}DT{sign}{secs}");
    if frac > 0 {
        let frac = format!("{frac:06}");
        out.push('.');
        out.push_str(frac.trim_end_matches('0'));
    }
    out.push('S');
    Ok(out)
}

/// Build a result set from rows, naming columns from `column_names`.
///
/// # Errors
/// Returns errors from row value extraction.
pub fn build_result_set(
    column_names: Vec<String>,
    rows: &[Row],
    key_case: KeyCase,
) -> Result<ResultSet, SessionDbError> {
    let column_count = column_names.len();
    let mut result_set = ResultSet::with_capacity(rows.len());
    result_set.set_column_names(column_names, key_case);

    for row in rows {
        let mut row_values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            row_values.push(postgres_extract_value(row, idx)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}
