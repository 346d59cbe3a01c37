//! Conversion from MySQL protocol values to `RowValue`.

use mysql_async::consts::{ColumnFlags, ColumnType};
use mysql_async::Value;
use sync_core::RowValue;

/// Convert a value read from a result set or a binlog row image.
///
/// Text columns arrive as bytes and are kept as text when they are valid
/// UTF-8. Temporal values are rendered the way MySQL prints them.
pub fn from_mysql(value: Value) -> RowValue {
    match value {
        Value::NULL => RowValue::Null,
        Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(text) => RowValue::Text(text),
            Err(e) => RowValue::Bytes(e.into_bytes()),
        },
        Value::Int(i) => RowValue::Int(i),
        Value::UInt(u) => RowValue::UInt(u),
        Value::Float(f) => RowValue::Float(f64::from(f)),
        Value::Double(d) => RowValue::Float(d),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            let mut text = format!(
                "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
            );
            push_micros(&mut text, micros);
            RowValue::Text(text)
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if negative { "-" } else { "" };
            let hours = u64::from(days) * 24 + u64::from(hours);
            let mut text = format!("{sign}{hours:02}:{minutes:02}:{seconds:02}");
            push_micros(&mut text, micros);
            RowValue::Text(text)
        }
    }
}

/// Convert a result-set value using its column metadata.
///
/// Numeric columns that arrive as text (text protocol results) are parsed so
/// that a backfilled row converts to the same values as its binlog image.
/// Anything that does not parse falls back to [`from_mysql`].
pub fn from_column(value: Value, column_type: ColumnType, flags: ColumnFlags) -> RowValue {
    use ColumnType::*;

    let Value::Bytes(bytes) = &value else {
        return from_mysql(value);
    };
    let Ok(text) = std::str::from_utf8(bytes) else {
        return from_mysql(value);
    };

    let parsed = match column_type {
        MYSQL_TYPE_TINY | MYSQL_TYPE_SHORT | MYSQL_TYPE_INT24 | MYSQL_TYPE_LONG
        | MYSQL_TYPE_LONGLONG | MYSQL_TYPE_YEAR => {
            if flags.contains(ColumnFlags::UNSIGNED_FLAG) {
                text.parse::<u64>().ok().map(RowValue::UInt)
            } else {
                text.parse::<i64>().ok().map(RowValue::Int)
            }
        }
        MYSQL_TYPE_FLOAT | MYSQL_TYPE_DOUBLE => text.parse::<f64>().ok().map(RowValue::Float),
        _ => None,
    };

    parsed.unwrap_or_else(|| from_mysql(value))
}

fn push_micros(text: &mut String, micros: u32) {
    if micros > 0 {
        text.push_str(&format!(".{micros:06}"));
    }
}
