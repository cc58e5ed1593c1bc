//! Internal events for metrics emission.
//!
//! Each event struct represents a measurable occurrence in an invocation.
//! Events implement the `InternalEvent` trait which emits the corresponding
//! counter or histogram through the `metrics` facade.

use metrics::{counter, histogram};
use std::time::Duration;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Event emitted when a trigger notification is received.
pub struct NotificationReceived;

impl InternalEvent for NotificationReceived {
    fn emit(self) {
        trace!("Notification received");
        counter!("flurry_notifications_received_total").increment(1);
    }
}

/// Why a notification was skipped without side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The object URL does not end in `.csv`.
    NotCsv,
    /// The object URL could not be split into container and name.
    MalformedUrl,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NotCsv => "not_csv",
            SkipReason::MalformedUrl => "malformed_url",
        }
    }
}

/// Event emitted when a notification is skipped.
pub struct NotificationSkipped {
    pub reason: SkipReason,
}

impl InternalEvent for NotificationSkipped {
    fn emit(self) {
        trace!(reason = self.reason.as_str(), "Notification skipped");
        counter!("flurry_notifications_skipped_total", "reason" => self.reason.as_str())
            .increment(1);
    }
}

/// Final status of an invocation.
#[derive(Debug, Clone, Copy)]
pub enum InvocationStatus {
    Processed,
    Skipped,
    Failed,
}

impl InvocationStatus {
    fn as_str(&self) -> &'static str {
        match self {
            InvocationStatus::Processed => "processed",
            InvocationStatus::Skipped => "skipped",
            InvocationStatus::Failed => "failed",
        }
    }
}

/// Event emitted when an invocation finishes.
pub struct InvocationCompleted {
    pub status: InvocationStatus,
    pub duration: Duration,
}

impl InternalEvent for InvocationCompleted {
    fn emit(self) {
        trace!(
            status = self.status.as_str(),
            duration_ms = self.duration.as_millis(),
            "Invocation completed"
        );
        counter!("flurry_invocations_total", "status" => self.status.as_str()).increment(1);
        histogram!("flurry_invocation_duration_seconds").record(self.duration.as_secs_f64());
    }
}

/// Stage at which an invocation failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Fetch,
    Transform,
    WriteOutput,
    WriteLog,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Fetch => "fetch",
            FailureStage::Transform => "transform",
            FailureStage::WriteOutput => "write_output",
            FailureStage::WriteLog => "write_log",
        }
    }
}

/// Event emitted when an invocation fails.
pub struct InvocationFailed {
    pub stage: FailureStage,
}

impl InternalEvent for InvocationFailed {
    fn emit(self) {
        trace!(stage = self.stage.as_str(), "Invocation failed");
        counter!("flurry_invocations_failed_total", "stage" => self.stage.as_str()).increment(1);
    }
}

/// Event emitted when source bytes are read from storage.
pub struct BytesRead {
    pub bytes: u64,
}

impl InternalEvent for BytesRead {
    fn emit(self) {
        trace!(bytes = self.bytes, "Bytes read");
        counter!("flurry_bytes_read_total").increment(self.bytes);
    }
}

/// Event emitted when Parquet bytes are written to storage.
pub struct BytesWritten {
    pub bytes: u64,
}

impl InternalEvent for BytesWritten {
    fn emit(self) {
        trace!(bytes = self.bytes, "Bytes written");
        counter!("flurry_bytes_written_total").increment(self.bytes);
    }
}

/// Event emitted when fully-empty rows are removed.
pub struct RowsDropped {
    pub count: u64,
}

impl InternalEvent for RowsDropped {
    fn emit(self) {
        trace!(count = self.count, "Empty rows dropped");
        counter!("flurry_rows_dropped_total").increment(self.count);
    }
}

/// Event emitted when a CSV to Parquet transform completes.
pub struct TransformCompleted {
    pub rows: u64,
    pub duration: Duration,
}

impl InternalEvent for TransformCompleted {
    fn emit(self) {
        trace!(
            rows = self.rows,
            duration_ms = self.duration.as_millis(),
            "Transform completed"
        );
        counter!("flurry_rows_written_total").increment(self.rows);
        histogram!("flurry_transform_duration_seconds").record(self.duration.as_secs_f64());
    }
}

// ============================================================================
// Storage request events
// ============================================================================

/// Storage operation type.
#[derive(Debug, Clone, Copy)]
pub enum StorageOperation {
    Get,
    Put,
    List,
}

impl StorageOperation {
    fn as_str(&self) -> &'static str {
        match self {
            StorageOperation::Get => "get",
            StorageOperation::Put => "put",
            StorageOperation::List => "list",
        }
    }
}

/// Outcome of a storage request.
#[derive(Debug, Clone, Copy)]
pub enum RequestStatus {
    Success,
    Error,
}

impl RequestStatus {
    fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Success => "success",
            RequestStatus::Error => "error",
        }
    }
}

/// Event emitted for each storage request.
pub struct StorageRequest {
    pub operation: StorageOperation,
    pub status: RequestStatus,
}

impl InternalEvent for StorageRequest {
    fn emit(self) {
        trace!(
            operation = self.operation.as_str(),
            status = self.status.as_str(),
            "Storage request"
        );
        counter!(
            "flurry_storage_requests_total",
            "operation" => self.operation.as_str(),
            "status" => self.status.as_str()
        )
        .increment(1);
    }
}

/// Event emitted with the latency of a storage request.
pub struct StorageRequestDuration {
    pub operation: StorageOperation,
    pub duration: Duration,
}

impl InternalEvent for StorageRequestDuration {
    fn emit(self) {
        trace!(
            operation = self.operation.as_str(),
            duration_ms = self.duration.as_millis(),
            "Storage request duration"
        );
        histogram!(
            "flurry_storage_request_duration_seconds",
            "operation" => self.operation.as_str()
        )
        .record(self.duration.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_reason_labels() {
        assert_eq!(SkipReason::NotCsv.as_str(), "not_csv");
        assert_eq!(SkipReason::MalformedUrl.as_str(), "malformed_url");
    }

    #[test]
    fn test_emit_without_recorder_is_noop() {
        // No recorder installed: emitting must not panic.
        crate::emit!(BytesRead { bytes: 10 });
        crate::emit!(NotificationSkipped {
            reason: SkipReason::NotCsv
        });
        crate::emit!(InvocationCompleted {
            status: InvocationStatus::Processed,
            duration: Duration::from_millis(5),
        });
    }
}
