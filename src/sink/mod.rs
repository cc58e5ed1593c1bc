//! Sink naming and encoding.
//!
//! Provides Parquet encoding and the object names outputs and audit records
//! are written under.

pub mod parquet;

use chrono::{DateTime, Utc};

pub use parquet::ParquetEncoder;

/// Extension of written output objects.
pub const OUTPUT_EXTENSION: &str = "parquet";

/// Derive the output object name: the final extension of the source name is
/// replaced with `.parquet`.
///
/// Only a dot inside the last path segment counts as an extension.
pub fn output_name(source_name: &str) -> String {
    let file_start = source_name.rfind('/').map_or(0, |i| i + 1);
    let stem = match source_name[file_start..].rfind('.') {
        Some(dot) => &source_name[..file_start + dot],
        None => source_name,
    };
    format!("{stem}.{OUTPUT_EXTENSION}")
}

/// Derive the audit record name: `YYYY/MM/DD/HHMMSS_<event_id>.json` in UTC.
pub fn audit_log_name(processed_at: DateTime<Utc>, event_id: &str) -> String {
    format!("{}_{event_id}.json", processed_at.format("%Y/%m/%d/%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_output_name() {
        assert_eq!(output_name("dir/File Name.CSV"), "dir/File Name.parquet");
        assert_eq!(output_name("sales.csv"), "sales.parquet");
        assert_eq!(output_name("a/b/report.2026.csv"), "a/b/report.2026.parquet");
        assert_eq!(output_name("v1.2/data.csv"), "v1.2/data.parquet");
        assert_eq!(output_name("v1.2/data"), "v1.2/data.parquet");
    }

    #[test]
    fn test_audit_log_name() {
        let at = Utc.with_ymd_and_hms(2026, 3, 7, 9, 5, 2).unwrap();
        assert_eq!(audit_log_name(at, "evt-1"), "2026/03/07/090502_evt-1.json");
    }
}
