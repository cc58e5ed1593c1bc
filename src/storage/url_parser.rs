//! URL parsing for storage backends.
//!
//! Turns a container URL (the storage root joined with a container name)
//! into the backend configuration needed to build an object store for it.

use object_store::path::Path;
use regex::{Captures, Regex};
use snafu::prelude::*;
use std::sync::OnceLock;

use crate::error::{InvalidUrlSnafu, StorageError};

use super::{AzureConfig, GcsConfig, LocalConfig, MemoryConfig, S3Config};

// URL patterns for different storage backends
const S3_PATH: &str =
    r"^https://s3\.(?P<region>[\w\-]+)\.amazonaws\.com/(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.+))?$";
const S3_VIRTUAL: &str =
    r"^https://(?P<bucket>[a-z0-9\-\.]+)\.s3\.(?P<region>[\w\-]+)\.amazonaws\.com(/(?P<key>.+))?$";
const S3_URL: &str = r"^[sS]3[aA]?://(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.+))?$";

const GCS_URL: &str = r"^[gG][sS]://(?P<bucket>[a-z0-9\-\._]+)(/(?P<key>.+))?$";

const ABFS_URL: &str = r"^abfss?://(?P<container>[a-z0-9\-]+)@(?P<account>[a-z0-9]+)\.dfs\.core\.windows\.net(/(?P<key>.+))?$";
const AZURE_HTTPS: &str = r"^https://(?P<account>[a-z0-9]+)\.(blob|dfs)\.core\.windows\.net/(?P<container>[a-z0-9\-]+)(/(?P<key>.+))?$";

const FILE_URI: &str = r"^file://(?P<path>/.*)$";
const FILE_PATH: &str = r"^(?P<path>/.*)$";

const MEMORY_URL: &str = r"^memory://(?P<key>.*)$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    S3,
    Gcs,
    Azure,
    Local,
    Memory,
}

/// Matchers in evaluation order.
fn matchers() -> &'static [(Backend, Vec<Regex>)] {
    static MATCHERS: OnceLock<Vec<(Backend, Vec<Regex>)>> = OnceLock::new();
    MATCHERS.get_or_init(|| {
        let compile = |patterns: &[&str]| -> Vec<Regex> {
            patterns
                .iter()
                .map(|p| Regex::new(p).expect("storage URL pattern must compile"))
                .collect()
        };

        vec![
            (Backend::S3, compile(&[S3_PATH, S3_VIRTUAL, S3_URL])),
            (Backend::Gcs, compile(&[GCS_URL])),
            (Backend::Azure, compile(&[ABFS_URL, AZURE_HTTPS])),
            (Backend::Memory, compile(&[MEMORY_URL])),
            (Backend::Local, compile(&[FILE_URI, FILE_PATH])),
        ]
    })
}

/// Backend configuration enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    S3(S3Config),
    Gcs(GcsConfig),
    Azure(AzureConfig),
    Local(LocalConfig),
    Memory(MemoryConfig),
}

impl BackendConfig {
    /// Parse a container URL into a backend configuration.
    pub fn parse_url(url: &str) -> Result<Self, StorageError> {
        for (backend, patterns) in matchers() {
            if let Some(caps) = patterns.iter().find_map(|r| r.captures(url)) {
                let config = match backend {
                    Backend::S3 => Self::parse_s3(&caps),
                    Backend::Gcs => Self::parse_gcs(&caps),
                    Backend::Azure => Self::parse_azure(&caps),
                    Backend::Local => Self::parse_local(&caps),
                    Backend::Memory => Self::parse_memory(&caps),
                };
                return config.context(InvalidUrlSnafu { url });
            }
        }

        InvalidUrlSnafu { url }.fail()
    }

    fn parse_s3(caps: &Captures) -> Option<Self> {
        let bucket = caps.name("bucket")?.as_str().to_string();
        let region = caps.name("region").map(|m| m.as_str().to_string());

        Some(BackendConfig::S3(S3Config {
            region,
            bucket,
            key: key_of(caps),
        }))
    }

    fn parse_gcs(caps: &Captures) -> Option<Self> {
        let bucket = caps.name("bucket")?.as_str().to_string();
        Some(BackendConfig::Gcs(GcsConfig {
            bucket,
            key: key_of(caps),
        }))
    }

    fn parse_azure(caps: &Captures) -> Option<Self> {
        let container = caps.name("container")?.as_str().to_string();
        let account = caps.name("account")?.as_str().to_string();
        Some(BackendConfig::Azure(AzureConfig {
            account,
            container,
            key: key_of(caps),
        }))
    }

    fn parse_local(caps: &Captures) -> Option<Self> {
        let path = caps.name("path")?.as_str().trim_end_matches('/');
        let path = if path.is_empty() { "/" } else { path };
        Some(BackendConfig::Local(LocalConfig {
            path: path.to_string(),
        }))
    }

    fn parse_memory(caps: &Captures) -> Option<Self> {
        Some(BackendConfig::Memory(MemoryConfig { key: key_of(caps) }))
    }

    pub(crate) fn key(&self) -> Option<&Path> {
        match self {
            BackendConfig::S3(s3) => s3.key.as_ref(),
            BackendConfig::Gcs(gcs) => gcs.key.as_ref(),
            BackendConfig::Azure(azure) => azure.key.as_ref(),
            BackendConfig::Memory(memory) => memory.key.as_ref(),
            BackendConfig::Local(_) => None,
        }
    }
}

fn key_of(caps: &Captures) -> Option<Path> {
    caps.name("key")
        .map(|m| m.as_str().trim_matches('/'))
        .filter(|k| !k.is_empty())
        .map(Path::from)
}
