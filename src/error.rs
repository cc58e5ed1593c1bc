//! Error types for Flurry using snafu.
//!
//! This module defines structured error types with context selectors for
//! all error conditions in the codebase.

use snafu::prelude::*;

use crate::metrics::events::FailureStage;

// ============ Storage Errors ============

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Invalid storage URL format.
    #[snafu(display("Invalid storage URL: {url}"))]
    InvalidUrl { url: String },

    /// Object store operation failed.
    #[snafu(display("Storage operation failed: {source}"))]
    ObjectStore { source: object_store::Error },

    /// IO error during storage operations.
    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },

    /// S3 configuration error.
    #[snafu(display("S3 configuration error: {source}"))]
    S3Config { source: object_store::Error },

    /// GCS configuration error.
    #[snafu(display("GCS configuration error: {source}"))]
    GcsConfig { source: object_store::Error },

    /// Azure configuration error.
    #[snafu(display("Azure configuration error: {source}"))]
    AzureConfig { source: object_store::Error },
}

impl StorageError {
    /// Check if this error represents a "not found" condition (404, NoSuchKey, etc.)
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::ObjectStore { source } => {
                matches!(source, object_store::Error::NotFound { .. })
            }
            _ => false,
        }
    }
}

// ============ Config Errors ============

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Storage URL is empty.
    #[snafu(display("Storage URL cannot be empty"))]
    EmptyStorageUrl,

    /// Output container is empty.
    #[snafu(display("Output container cannot be empty"))]
    EmptyOutputContainer,

    /// Audit log container is empty.
    #[snafu(display("Audit container cannot be empty"))]
    EmptyAuditContainer,

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML: {source}"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file: {source}"))]
    ReadFile { source: std::io::Error },
}

// ============ Event Errors ============

/// Errors that can occur while decoding trigger notifications.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum EventError {
    /// The notification payload is not valid JSON for an event or event batch.
    #[snafu(display("Failed to decode notification: {source}"))]
    NotificationDecode { source: serde_json::Error },
}

// ============ Transform Errors ============

/// Errors that can occur while converting CSV bytes to Parquet.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TransformError {
    /// The input has no header row.
    #[snafu(display("CSV input has no header row"))]
    MissingHeader,

    /// The input is not valid delimited text.
    #[snafu(display("Failed to parse CSV: {source}"))]
    Parse { source: arrow::error::ArrowError },

    /// Filtering empty rows failed.
    #[snafu(display("Failed to filter empty rows: {source}"))]
    RowFilter { source: arrow::error::ArrowError },

    /// Parquet cannot represent the inferred schema, or the writer failed.
    #[snafu(display("Failed to encode Parquet: {source}"))]
    Encoding {
        source: parquet::errors::ParquetError,
    },
}

// ============ Invocation Errors ============

/// Operational failures of a single invocation.
///
/// These are re-signaled to the trigger mechanism, which owns any
/// re-delivery policy.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum InvocationError {
    /// Reading the source object failed.
    #[snafu(display("Failed to fetch {container}/{name}: {source}"))]
    Fetch {
        container: String,
        name: String,
        source: StorageError,
    },

    /// Parsing or encoding the source object failed.
    #[snafu(display("Failed to transform object: {source}"))]
    Transform { source: TransformError },

    /// Writing the Parquet output failed.
    #[snafu(display("Failed to write output {container}/{name}: {source}"))]
    WriteOutput {
        container: String,
        name: String,
        source: StorageError,
    },

    /// Writing the audit record failed.
    #[snafu(display("Failed to write audit record {container}/{name}: {source}"))]
    WriteLog {
        container: String,
        name: String,
        source: StorageError,
    },

    /// Serializing the audit record failed.
    #[snafu(display("Failed to serialize audit record: {source}"))]
    AuditSerialize { source: serde_json::Error },
}

impl InvocationError {
    /// Stage at which the invocation failed.
    pub fn stage(&self) -> FailureStage {
        match self {
            InvocationError::Fetch { .. } => FailureStage::Fetch,
            InvocationError::Transform { .. } => FailureStage::Transform,
            InvocationError::WriteOutput { .. } => FailureStage::WriteOutput,
            InvocationError::WriteLog { .. } | InvocationError::AuditSerialize { .. } => {
                FailureStage::WriteLog
            }
        }
    }

    /// Check if the source object was missing.
    pub fn is_not_found(&self) -> bool {
        match self {
            InvocationError::Fetch { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

// ============ Application Error (top-level) ============

/// Top-level errors for the `flurry` binary.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum AppError {
    /// Configuration error.
    #[snafu(display("Configuration error"))]
    Config { source: ConfigError },

    /// Failed to read the notification input.
    #[snafu(display("Failed to read notification from {path}"))]
    ReadEvent {
        path: String,
        source: std::io::Error,
    },

    /// Failed to decode the notification input.
    #[snafu(display("Invalid notification input"))]
    Event { source: EventError },

    /// Failed to set up storage.
    #[snafu(display("Storage setup failed"))]
    StorageSetup { source: StorageError },

    /// One or more invocations failed.
    #[snafu(display("{failed} of {total} invocation(s) failed"))]
    InvocationsFailed { failed: usize, total: usize },
}
