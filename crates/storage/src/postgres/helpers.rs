//! Shared helper functions for PostgreSQL parameter conversion.

use sidecar_core::error::{StorageError, StorageResult};

/// Convert an unsigned height or timestamp to a `BIGINT` parameter.
///
/// Returns an error instead of wrapping when the value does not fit.
pub fn to_bigint(value: u64, field_name: &str) -> StorageResult<i64> {
    i64::try_from(value).map_err(|_| {
        StorageError::SerializationError(format!(
            "{} out of BIGINT range: {}",
            field_name, value
        ))
    })
}

/// Convert an event or transaction index to an `INTEGER` parameter.
pub fn to_integer(value: u32, field_name: &str) -> StorageResult<i32> {
    i32::try_from(value).map_err(|_| {
        StorageError::SerializationError(format!(
            "{} out of INTEGER range: {}",
            field_name, value
        ))
    })
}

/// Serialize a value for a `JSONB` column.
pub fn to_json<T: serde::Serialize>(value: &T, field_name: &str) -> StorageResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| {
        StorageError::SerializationError(format!("{} could not be serialized: {}", field_name, e))
    })
}
