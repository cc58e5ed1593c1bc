//! Trigger notification decoding.
//!
//! Turns a blob-created notification into the locator of the object to
//! normalize, or into a skip decision when the object is not a CSV file or
//! its URL cannot be split into container and name.

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::prelude::*;
use std::fmt;
use tracing::{error, info};
use url::Url;

use crate::emit;
use crate::error::{EventError, NotificationDecodeSnafu};
use crate::metrics::events::{NotificationSkipped, SkipReason};

/// Suffix an object URL must carry to be processed.
const CSV_SUFFIX: &str = ".csv";

/// A blob-created notification as delivered by the eventing service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Unique identifier of this delivery.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_time: Option<String>,
    /// Event payload; carries the object `url`.
    #[serde(default)]
    pub data: Value,
}

impl Notification {
    /// Build a notification carrying only an id and an object URL.
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            event_type: None,
            subject: None,
            event_time: None,
            data: serde_json::json!({ "url": url.into() }),
        }
    }

    /// The object URL from the payload, or the empty string if absent.
    pub fn blob_url(&self) -> &str {
        self.data.get("url").and_then(Value::as_str).unwrap_or("")
    }
}

/// Decode a notification input holding a single event or an array of events.
pub fn parse_notifications(input: &str) -> Result<Vec<Notification>, EventError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Batch {
        Many(Vec<Notification>),
        One(Box<Notification>),
    }

    let batch: Batch = serde_json::from_str(input).context(NotificationDecodeSnafu)?;
    Ok(match batch {
        Batch::Many(events) => events,
        Batch::One(event) => vec![*event],
    })
}

/// Container and object name of a storage object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectLocator {
    pub container: String,
    pub name: String,
}

impl fmt::Display for ObjectLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.name)
    }
}

/// Result of decoding a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// The object should be processed.
    Process(ObjectLocator),
    /// Nothing to do for this notification.
    Skip(SkipReason),
}

/// Decode a notification into an object locator or a skip decision.
///
/// A URL whose path does not end in `.csv` (any case) is skipped quietly.
/// A CSV URL whose path does not yield both a container and a name is an
/// operational anomaly: it is logged at error level and skipped.
pub fn decode(notification: &Notification) -> Decoded {
    let url = notification.blob_url();

    if !has_csv_suffix(url) {
        info!(event_id = %notification.id, url, "Ignoring non-CSV object");
        emit!(NotificationSkipped {
            reason: SkipReason::NotCsv
        });
        return Decoded::Skip(SkipReason::NotCsv);
    }

    match split_locator(url) {
        Some(locator) => Decoded::Process(locator),
        None => {
            error!(
                event_id = %notification.id,
                url,
                "Object URL has no container or object name, skipping"
            );
            emit!(NotificationSkipped {
                reason: SkipReason::MalformedUrl
            });
            Decoded::Skip(SkipReason::MalformedUrl)
        }
    }
}

/// Check the URL path, without query or fragment, for the `.csv` suffix.
fn has_csv_suffix(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    path.len() >= CSV_SUFFIX.len()
        && path
            .get(path.len() - CSV_SUFFIX.len()..)
            .is_some_and(|suffix| suffix.eq_ignore_ascii_case(CSV_SUFFIX))
}

/// Split the URL path into its first segment (container) and the rest (name).
fn split_locator(url: &str) -> Option<ObjectLocator> {
    let parsed = Url::parse(url).ok()?;
    let path = parsed.path().trim_start_matches('/');
    let (container, name) = path.split_once('/')?;

    let container = decode_component(container)?;
    let name = decode_component(name)?;
    if container.is_empty() || name.is_empty() {
        return None;
    }

    Some(ObjectLocator { container, name })
}

fn decode_component(raw: &str) -> Option<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator(container: &str, name: &str) -> Decoded {
        Decoded::Process(ObjectLocator {
            container: container.to_string(),
            name: name.to_string(),
        })
    }

    #[test]
    fn test_decode_nested_object() {
        let event = Notification::new(
            "evt-1",
            "https://acct.blob.core.windows.net/incoming/dir/sales.csv",
        );
        assert_eq!(decode(&event), locator("incoming", "dir/sales.csv"));
    }

    #[test]
    fn test_suffix_is_case_insensitive() {
        let event = Notification::new("evt-1", "https://acct.blob.example/incoming/A.CsV");
        assert_eq!(decode(&event), locator("incoming", "A.CsV"));
    }

    #[test]
    fn test_non_csv_is_skipped() {
        for url in [
            "https://acct.blob.example/incoming/data.json",
            "https://acct.blob.example/incoming/data.csv.gz",
            "https://acct.blob.example/incoming/csv",
            "",
        ] {
            let event = Notification::new("evt-2", url);
            assert_eq!(decode(&event), Decoded::Skip(SkipReason::NotCsv), "{url}");
        }
    }

    #[test]
    fn test_query_string_ignored_for_suffix() {
        let event = Notification::new("evt-3", "https://acct.blob.example/incoming/a.csv?sv=2024");
        assert_eq!(decode(&event), locator("incoming", "a.csv"));

        let event = Notification::new("evt-3", "https://acct.blob.example/incoming/a.txt?x=.csv");
        assert_eq!(decode(&event), Decoded::Skip(SkipReason::NotCsv));
    }

    #[test]
    fn test_single_segment_path_is_malformed() {
        for url in [
            "https://acct.blob.example/file.csv",
            "https://acct.blob.example//file.csv",
            "not a url.csv",
        ] {
            let event = Notification::new("evt-4", url);
            assert_eq!(decode(&event), Decoded::Skip(SkipReason::MalformedUrl), "{url}");
        }
    }

    #[test]
    fn test_percent_encoded_name_is_decoded() {
        let event = Notification::new(
            "evt-5",
            "https://acct.blob.example/incoming/dir/File%20Name.CSV",
        );
        assert_eq!(decode(&event), locator("incoming", "dir/File Name.CSV"));
    }

    #[test]
    fn test_missing_url_is_empty() {
        let event: Notification =
            serde_json::from_str(r#"{"id": "evt-6", "data": {"api": "PutBlob"}}"#).unwrap();
        assert_eq!(event.blob_url(), "");
        assert_eq!(decode(&event), Decoded::Skip(SkipReason::NotCsv));
    }

    #[test]
    fn test_parse_event_grid_envelope() {
        let input = r#"{
            "id": "831e1650-001e-001b-66ab-eeb76e069631",
            "eventType": "Microsoft.Storage.BlobCreated",
            "subject": "/blobServices/default/containers/incoming/blobs/a.csv",
            "eventTime": "2026-10-19T08:30:00.000Z",
            "data": {"api": "PutBlob", "url": "https://acct.blob.core.windows.net/incoming/a.csv"},
            "dataVersion": "",
            "metadataVersion": "1"
        }"#;
        let events = parse_notifications(input).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "831e1650-001e-001b-66ab-eeb76e069631");
        assert_eq!(
            events[0].event_type.as_deref(),
            Some("Microsoft.Storage.BlobCreated")
        );
        assert_eq!(
            events[0].blob_url(),
            "https://acct.blob.core.windows.net/incoming/a.csv"
        );
    }

    #[test]
    fn test_parse_event_batch() {
        let input = r#"[
            {"id": "a", "data": {"url": "https://h/c/a.csv"}},
            {"id": "b", "data": {"url": "https://h/c/b.txt"}}
        ]"#;
        let events = parse_notifications(input).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].id, "b");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_notifications("{not json").is_err());
        assert!(parse_notifications(r#"{"data": {}}"#).is_err());
    }
}
