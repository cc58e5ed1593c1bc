//! Configuration parsing.
//!
//! Handles loading configuration from YAML files and turning it into the
//! explicit parameters the invocation handler is built from.

mod vars;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{
    ConfigError, EmptyAuditContainerSnafu, EmptyOutputContainerSnafu, EmptyStorageUrlSnafu,
    EnvInterpolationSnafu, ReadFileSnafu, YamlParseSnafu,
};

pub use vars::{interpolate, interpolate_with};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Storage account the notifications refer to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root URL of the storage account.
    /// Examples: "https://acct.blob.core.windows.net", "s3://", "file:///data", "memory://"
    pub url: String,

    /// Storage options (credentials, region, etc.)
    #[serde(default)]
    pub options: HashMap<String, String>,
}

/// Destination for normalized Parquet objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Container receiving the Parquet output (default: "processed").
    #[serde(default = "default_output_container")]
    pub container: String,

    /// Parquet compression codec.
    #[serde(default)]
    pub compression: ParquetCompression,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            container: default_output_container(),
            compression: ParquetCompression::default(),
        }
    }
}

fn default_output_container() -> String {
    "processed".to_string()
}

/// Destination for JSON audit records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Container receiving audit records (default: "logs").
    #[serde(default = "default_audit_container")]
    pub container: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            container: default_audit_container(),
        }
    }
}

fn default_audit_container() -> String {
    "logs".to_string()
}

/// Parquet compression codec.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParquetCompression {
    Uncompressed,
    #[default]
    Snappy,
    Gzip,
    Zstd,
    Lz4,
}

/// Parameters for a single invocation of the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    pub output_container: String,
    pub log_container: String,
    pub compression: ParquetCompression,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            output_container: default_output_container(),
            log_container: default_audit_container(),
            compression: ParquetCompression::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).context(ReadFileSnafu)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text, interpolating environment variables first.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let content = interpolate(content).map_err(|errors| {
            EnvInterpolationSnafu {
                message: errors.join("\n"),
            }
            .build()
        })?;

        let config: Config = serde_yaml::from_str(&content).context(YamlParseSnafu)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        ensure!(!self.storage.url.trim().is_empty(), EmptyStorageUrlSnafu);
        ensure!(
            !self.output.container.trim().is_empty(),
            EmptyOutputContainerSnafu
        );
        ensure!(
            !self.audit.container.trim().is_empty(),
            EmptyAuditContainerSnafu
        );
        Ok(())
    }

    /// Build the handler parameters from this configuration.
    pub fn handler_config(&self) -> HandlerConfig {
        HandlerConfig {
            output_container: self.output.container.clone(),
            log_container: self.audit.container.clone(),
            compression: self.output.compression,
        }
    }
}
