use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Fallback for batch labels the producer left out.
pub const UNKNOWN: &str = "unknown";

/// One message as delivered by the stream transport.
///
/// The payload is kept opaque until the decoder sees it; topic, partition and
/// offset identify the message in logs and when its offset is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChangeMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
}

/// A decoded Canal-JSON batch: one table, one operation, many rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeBatch {
    pub table: String,
    pub operation_type: String,
    pub database: String,
    /// New row state, in producer order.
    pub rows: Vec<Value>,
    /// Prior row state, paired with `rows` by array position only.
    pub previous_rows: Option<Vec<Value>>,
    pub sql_type_hints: Value,
    pub driver_type_hints: Value,
    pub primary_key_names: Value,
}

/// Per-row document written to the index store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEvent {
    #[serde(rename = "@timestamp", serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "table_name")]
    pub table: String,
    pub operation_type: String,
    pub database: String,
    pub data: Value,
    #[serde(rename = "old_data")]
    pub previous_data: Option<Value>,
    #[serde(rename = "sql_type")]
    pub sql_type_hints: Value,
    #[serde(rename = "mysql_type")]
    pub driver_type_hints: Value,
    #[serde(rename = "pk_names")]
    pub primary_key_names: Value,
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
pub fn iso_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_timestamp<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&iso_timestamp(ts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_change_event_document_shape() {
        let event = ChangeEvent {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap(),
            table: "orders".to_string(),
            operation_type: "UPDATE".to_string(),
            database: "shop".to_string(),
            data: json!({"id": "1", "total": "12.5"}),
            previous_data: Some(json!({"total": "9.5"})),
            sql_type_hints: json!({"id": -5, "total": 3}),
            driver_type_hints: json!({"id": "bigint", "total": "decimal(10,2)"}),
            primary_key_names: json!(["id"]),
        };

        let doc = serde_json::to_value(&event).unwrap();
        assert_eq!(
            doc,
            json!({
                "@timestamp": "2024-03-01T12:30:05.000Z",
                "table_name": "orders",
                "operation_type": "UPDATE",
                "database": "shop",
                "data": {"id": "1", "total": "12.5"},
                "old_data": {"total": "9.5"},
                "sql_type": {"id": -5, "total": 3},
                "mysql_type": {"id": "bigint", "total": "decimal(10,2)"},
                "pk_names": ["id"]
            })
        );
    }

    #[test]
    fn test_absent_previous_data_serializes_as_null() {
        let event = ChangeEvent {
            timestamp: Utc::now(),
            table: UNKNOWN.to_string(),
            operation_type: UNKNOWN.to_string(),
            database: UNKNOWN.to_string(),
            data: json!({}),
            previous_data: None,
            sql_type_hints: json!({}),
            driver_type_hints: json!({}),
            primary_key_names: json!([]),
        };

        let doc = serde_json::to_value(&event).unwrap();
        assert!(doc.get("old_data").unwrap().is_null());
    }
}
