//! Column mapping helpers shared by the SQLite repositories.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;

use vmem_domain::error::{Error, Result};
use vmem_domain::ports::SqlRow;

/// Required string column.
pub fn required_string(row: &dyn SqlRow, name: &str) -> Result<String> {
    row.try_get_string(name)?
        .ok_or_else(|| Error::database(format!("column {name} was NULL")))
}

/// Required integer column.
pub fn required_i64(row: &dyn SqlRow, name: &str) -> Result<i64> {
    row.try_get_i64(name)?
        .ok_or_else(|| Error::database(format!("column {name} was NULL")))
}

/// JSON-encoded column deserialized into `T`; NULL or empty becomes the
/// type's default.
pub fn json_column<T: DeserializeOwned + Default>(row: &dyn SqlRow, name: &str) -> Result<T> {
    match row.try_get_string(name)? {
        Some(text) if !text.is_empty() => serde_json::from_str(&text)
            .map_err(|e| Error::database(format!("column {name} holds invalid JSON: {e}"))),
        _ => Ok(T::default()),
    }
}

/// Epoch-seconds column as a UTC timestamp.
pub fn epoch_column(row: &dyn SqlRow, name: &str) -> Result<Option<DateTime<Utc>>> {
    Ok(row
        .try_get_i64(name)?
        .map(|secs| Utc.timestamp_opt(secs, 0).single().unwrap_or_default()))
}

/// Serialize a value into its JSON column representation.
pub fn to_json_text<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Error::from)
}
