//! Audit records for processed objects.
//!
//! One record is written per successful transform to the log container,
//! namespaced by UTC date.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A record describing one processed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Id of the notification that triggered the invocation.
    pub event_id: String,
    /// Source object URL as carried by the notification.
    pub blob_url: String,
    /// Container-qualified name of the written Parquet object.
    pub processed_blob: String,
    /// Rows in the output after empty rows were dropped.
    pub rows: usize,
    /// Columns in the output.
    pub cols: usize,
    /// Processing time, ISO-8601 UTC with a `Z` suffix.
    pub ts_utc: String,
}

impl AuditRecord {
    pub fn new(
        event_id: impl Into<String>,
        blob_url: impl Into<String>,
        processed_blob: impl Into<String>,
        rows: usize,
        cols: usize,
        processed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            blob_url: blob_url.into(),
            processed_blob: processed_blob.into(),
            rows,
            cols,
            ts_utc: format_timestamp(processed_at),
        }
    }
}

/// Format a timestamp as RFC 3339 with microseconds and `Z`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_audit_record_serialization() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 15).unwrap();
        let record = AuditRecord::new(
            "evt-1",
            "https://acct.blob.example/incoming/a.csv",
            "processed/a.parquet",
            3,
            2,
            at,
        );

        let value: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["event_id"], "evt-1");
        assert_eq!(value["processed_blob"], "processed/a.parquet");
        assert_eq!(value["rows"], 3);
        assert_eq!(value["cols"], 2);
        assert_eq!(value["ts_utc"], "2026-10-19T08:30:15.000000Z");
        assert_eq!(value.as_object().unwrap().len(), 6);
    }

    #[test]
    fn test_timestamp_keeps_subseconds() {
        let at = Utc.timestamp_opt(1_700_000_000, 123_456_000).unwrap();
        assert_eq!(format_timestamp(at), "2023-11-14T22:13:20.123456Z");
    }
}
