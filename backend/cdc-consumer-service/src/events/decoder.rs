//! Canal-JSON change batch decoding.
//!
//! TiCDC and Canal emit one JSON object per table/operation with the new row
//! images under `data` and, for updates, the prior images under `old`. Each
//! row becomes one [`ChangeEvent`]. `old` is paired with `data` purely by
//! array index: the producer guarantees alignment, and a misaligned batch
//! pairs rows incorrectly rather than failing.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use super::models::{ChangeBatch, ChangeEvent, UNKNOWN};
use crate::error::DecodeError;

const KEY_TABLE: &str = "table";
const KEY_TYPE: &str = "type";
const KEY_DATABASE: &str = "database";
const KEY_DATA: &str = "data";
const KEY_OLD: &str = "old";
const KEY_SQL_TYPE: &str = "sqlType";
const KEY_MYSQL_TYPE: &str = "mysqlType";
const KEY_PK_NAMES: &str = "pkNames";

/// Decode one raw payload into per-row change events, stamped with
/// `processed_at`.
///
/// Only invalid JSON is an error. A payload without a usable `data` array
/// decodes to no events.
pub fn decode(payload: &[u8], processed_at: DateTime<Utc>) -> Result<Vec<ChangeEvent>, DecodeError> {
    let value: Value = serde_json::from_slice(payload)?;
    Ok(ChangeBatch::from_value(&value).into_events(processed_at))
}

/// [`decode`] stamped with the current time.
pub fn decode_now(payload: &[u8]) -> Result<Vec<ChangeEvent>, DecodeError> {
    decode(payload, Utc::now())
}

impl ChangeBatch {
    /// Lenient extraction: shape mismatches fall back to defaults instead of
    /// failing the batch.
    pub fn from_value(value: &Value) -> Self {
        let empty = Map::new();
        let batch = value.as_object().unwrap_or(&empty);

        Self {
            table: label(batch, KEY_TABLE),
            operation_type: label(batch, KEY_TYPE),
            database: label(batch, KEY_DATABASE),
            rows: batch
                .get(KEY_DATA)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            previous_rows: batch.get(KEY_OLD).and_then(Value::as_array).cloned(),
            sql_type_hints: passthrough(batch, KEY_SQL_TYPE, || json!({})),
            driver_type_hints: passthrough(batch, KEY_MYSQL_TYPE, || json!({})),
            primary_key_names: passthrough(batch, KEY_PK_NAMES, || json!([])),
        }
    }

    /// Expand into one event per row, preserving row order.
    pub fn into_events(self, processed_at: DateTime<Utc>) -> Vec<ChangeEvent> {
        let ChangeBatch {
            table,
            operation_type,
            database,
            rows,
            previous_rows,
            sql_type_hints,
            driver_type_hints,
            primary_key_names,
        } = self;

        rows.into_iter()
            .enumerate()
            .map(|(position, row)| ChangeEvent {
                timestamp: processed_at,
                table: table.clone(),
                operation_type: operation_type.clone(),
                database: database.clone(),
                data: row,
                previous_data: previous_rows
                    .as_ref()
                    .and_then(|old| old.get(position))
                    .filter(|old| !old.is_null())
                    .cloned(),
                sql_type_hints: sql_type_hints.clone(),
                driver_type_hints: driver_type_hints.clone(),
                primary_key_names: primary_key_names.clone(),
            })
            .collect()
    }
}

fn label(batch: &Map<String, Value>, key: &str) -> String {
    match batch.get(key) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => UNKNOWN.to_string(),
    }
}

/// Copy a hint verbatim unless it is missing or falsy (`null`, `false`, `0`,
/// `""`), in which case `default` is used. Empty objects and arrays are kept.
fn passthrough(batch: &Map<String, Value>, key: &str, default: fn() -> Value) -> Value {
    match batch.get(key) {
        Some(value) if !is_falsy(value) => value.clone(),
        _ => default(),
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}
