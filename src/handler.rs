//! Invocation handler.
//!
//! Runs one notification through decode, fetch, transform, output write and
//! audit write, in that order. Every resource is local to the invocation.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use snafu::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::audit::AuditRecord;
use crate::config::HandlerConfig;
use crate::emit;
use crate::error::{
    AuditSerializeSnafu, FetchSnafu, InvocationError, TransformSnafu, WriteLogSnafu,
    WriteOutputSnafu,
};
use crate::event::{Decoded, Notification, ObjectLocator, decode};
use crate::metrics::events::{
    BytesWritten, InvocationCompleted, InvocationFailed, InvocationStatus, NotificationReceived,
    SkipReason,
};
use crate::sink::{audit_log_name, output_name};
use crate::storage::{BlobStore, ContentType};
use crate::transform::transform;

/// Outcome of a successful invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// Nothing was read or written.
    Skipped(SkipReason),
    /// The object was normalized and both writes succeeded.
    Processed(AuditRecord),
}

/// Handles trigger notifications against a storage capability.
pub struct Handler {
    store: Arc<dyn BlobStore>,
    config: HandlerConfig,
}

impl Handler {
    pub fn new(store: Arc<dyn BlobStore>, config: HandlerConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Handle a notification, stamping the audit record with the current time.
    pub async fn handle(
        &self,
        notification: &Notification,
    ) -> Result<InvocationOutcome, InvocationError> {
        self.handle_at(notification, Utc::now()).await
    }

    /// Handle a notification as if processed at `processed_at`.
    ///
    /// Operational failures are logged and returned; the caller re-signals
    /// them to the trigger.
    pub async fn handle_at(
        &self,
        notification: &Notification,
        processed_at: DateTime<Utc>,
    ) -> Result<InvocationOutcome, InvocationError> {
        emit!(NotificationReceived);
        let start = Instant::now();

        let result = self.process(notification, processed_at).await;

        let status = match &result {
            Ok(InvocationOutcome::Skipped(_)) => InvocationStatus::Skipped,
            Ok(InvocationOutcome::Processed(_)) => InvocationStatus::Processed,
            Err(e) => {
                error!(
                    event_id = %notification.id,
                    url = notification.blob_url(),
                    stage = e.stage().as_str(),
                    "Invocation failed: {}",
                    snafu::Report::from_error(e)
                );
                emit!(InvocationFailed { stage: e.stage() });
                InvocationStatus::Failed
            }
        };
        emit!(InvocationCompleted {
            status,
            duration: start.elapsed(),
        });

        result
    }

    async fn process(
        &self,
        notification: &Notification,
        processed_at: DateTime<Utc>,
    ) -> Result<InvocationOutcome, InvocationError> {
        let locator = match decode(notification) {
            Decoded::Process(locator) => locator,
            Decoded::Skip(reason) => return Ok(InvocationOutcome::Skipped(reason)),
        };
        debug!(event_id = %notification.id, "Processing {locator}");

        let data = self.fetch(&locator).await?;
        let output = transform(&data, &locator.to_string(), self.config.compression)
            .context(TransformSnafu)?;

        let output_container = &self.config.output_container;
        let output_name = output_name(&locator.name);
        let output_len = output.bytes.len();
        self.store
            .write(
                output_container,
                &output_name,
                output.bytes,
                ContentType::Parquet,
            )
            .await
            .context(WriteOutputSnafu {
                container: output_container,
                name: &output_name,
            })?;
        emit!(BytesWritten {
            bytes: output_len as u64,
        });

        let record = AuditRecord::new(
            &notification.id,
            notification.blob_url(),
            format!("{output_container}/{output_name}"),
            output.rows,
            output.cols,
            processed_at,
        );
        self.write_log(&record, processed_at).await?;

        info!(
            event_id = %notification.id,
            container = %locator.container,
            name = %locator.name,
            rows = output.rows,
            cols = output.cols,
            rows_dropped = output.rows_dropped,
            "Wrote {}",
            record.processed_blob
        );

        Ok(InvocationOutcome::Processed(record))
    }

    async fn fetch(&self, locator: &ObjectLocator) -> Result<Bytes, InvocationError> {
        self.store
            .read(&locator.container, &locator.name)
            .await
            .context(FetchSnafu {
                container: &locator.container,
                name: &locator.name,
            })
    }

    async fn write_log(
        &self,
        record: &AuditRecord,
        processed_at: DateTime<Utc>,
    ) -> Result<(), InvocationError> {
        let container = &self.config.log_container;
        let name = audit_log_name(processed_at, &record.event_id);
        let payload = serde_json::to_vec(record).context(AuditSerializeSnafu)?;

        self.store
            .write(container, &name, Bytes::from(payload), ContentType::Json)
            .await
            .context(WriteLogSnafu {
                container,
                name: &name,
            })
    }
}
