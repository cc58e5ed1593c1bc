//! Multi-cloud storage abstraction.
//!
//! Provides the `BlobStore` capability the handler reads and writes objects
//! through, and its production implementation over S3, GCS, Azure Blob
//! Storage, the local filesystem and an in-process memory store.

mod azure;
mod gcs;
mod local;
mod memory;
mod s3;
mod url_parser;

pub use url_parser::BackendConfig;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{
    Attribute, AttributeValue, Attributes, ObjectStore, PutOptions, PutPayload, RetryConfig,
};
use snafu::prelude::*;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::emit;
use crate::error::{InvalidUrlSnafu, ObjectStoreSnafu, StorageError};
use crate::metrics::events::{
    RequestStatus, StorageOperation, StorageRequest, StorageRequestDuration,
};

// Re-export config types
pub use azure::AzureConfig;
pub use gcs::GcsConfig;
pub use local::LocalConfig;
pub use memory::MemoryConfig;
pub use s3::S3Config;

/// Content type attached to written objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Parquet,
    Json,
}

impl ContentType {
    pub fn as_mime(&self) -> &'static str {
        match self {
            ContentType::Parquet => "application/vnd.apache.parquet",
            ContentType::Json => "application/json",
        }
    }
}

/// Object storage capability used by the handler.
///
/// Objects are addressed by container and name; writes always overwrite.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read the full content of `name` in `container`.
    async fn read(&self, container: &str, name: &str) -> Result<Bytes, StorageError>;

    /// Write `bytes` to `name` in `container`, replacing any existing object.
    async fn write(
        &self,
        container: &str,
        name: &str,
        bytes: Bytes,
        content_type: ContentType,
    ) -> Result<(), StorageError>;
}

/// Retry configuration for cloud backends.
///
/// Retries are left to the trigger's re-delivery policy.
pub(crate) fn no_retry_config() -> RetryConfig {
    RetryConfig {
        max_retries: 0,
        ..RetryConfig::default()
    }
}

/// Storage provider bound to a single container.
#[derive(Clone)]
pub struct StorageProvider {
    pub(crate) config: BackendConfig,
    pub(crate) object_store: Arc<dyn ObjectStore>,
    pub(crate) canonical_url: String,
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorageProvider<{}>", self.canonical_url)
    }
}

impl StorageProvider {
    /// Create a storage provider for a container URL with storage options.
    pub async fn for_url_with_options(
        url: &str,
        options: &HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        match BackendConfig::parse_url(url)? {
            BackendConfig::S3(config) => Self::construct_s3(config, options),
            BackendConfig::Gcs(config) => Self::construct_gcs(config, options),
            BackendConfig::Azure(config) => Self::construct_azure(config, options),
            BackendConfig::Local(config) => Self::construct_local(config).await,
            BackendConfig::Memory(config) => Ok(Self::construct_memory(
                config,
                Arc::new(InMemory::new()),
            )),
        }
    }

    /// Canonical URL of the container this provider is bound to.
    pub fn canonical_url(&self) -> &str {
        &self.canonical_url
    }

    /// Get the backend configuration.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Qualify a path with the configured key prefix.
    pub fn qualify_path<'a>(&self, path: &'a Path) -> Cow<'a, Path> {
        match self.config.key() {
            Some(prefix) => Cow::Owned(prefix.parts().chain(path.parts()).collect()),
            None => Cow::Borrowed(path),
        }
    }

    /// Get the contents of an object.
    pub async fn get(&self, path: &Path) -> Result<Bytes, StorageError> {
        let start = Instant::now();
        let result = match self.object_store.get(&self.qualify_path(path)).await {
            Ok(response) => response.bytes().await,
            Err(e) => Err(e),
        };

        record_request(StorageOperation::Get, result.is_ok(), start);
        result.context(ObjectStoreSnafu)
    }

    /// Put bytes to a path with the given content type.
    ///
    /// Local filesystem doesn't support attributes, so the content type is
    /// dropped there.
    pub async fn put(
        &self,
        path: &Path,
        bytes: Bytes,
        content_type: ContentType,
    ) -> Result<(), StorageError> {
        let opts = if matches!(self.config, BackendConfig::Local(_)) {
            PutOptions::default()
        } else {
            PutOptions {
                attributes: Attributes::from_iter([(
                    Attribute::ContentType,
                    AttributeValue::from(content_type.as_mime()),
                )]),
                ..Default::default()
            }
        };

        let path = self.qualify_path(path);
        let start = Instant::now();
        let result = self
            .object_store
            .put_opts(&path, PutPayload::from(bytes), opts)
            .await;

        record_request(StorageOperation::Put, result.is_ok(), start);
        result.context(ObjectStoreSnafu)?;
        Ok(())
    }

    /// List object paths under `prefix`, relative to the container.
    pub async fn list(&self, prefix: Option<&Path>) -> Result<Vec<Path>, StorageError> {
        let key_part_count = self
            .config
            .key()
            .map(|key| key.parts().count())
            .unwrap_or_default();
        let full_prefix = match prefix {
            Some(p) => Some(self.qualify_path(p).into_owned()),
            None => self.config.key().cloned(),
        };

        let start = Instant::now();
        let result: Result<Vec<_>, _> = self
            .object_store
            .list(full_prefix.as_ref())
            .map_ok(|meta| meta.location.parts().skip(key_part_count).collect::<Path>())
            .try_collect()
            .await;

        record_request(StorageOperation::List, result.is_ok(), start);
        result.context(ObjectStoreSnafu)
    }
}

fn record_request(operation: StorageOperation, ok: bool, start: Instant) {
    let status = if ok {
        RequestStatus::Success
    } else {
        RequestStatus::Error
    };
    emit!(StorageRequest { operation, status });
    emit!(StorageRequestDuration {
        operation,
        duration: start.elapsed(),
    });
}

/// Production `BlobStore` resolving containers under a storage root URL.
///
/// The root is the account-level URL (`https://acct.blob.core.windows.net`,
/// `s3://`, `gs://`, `file:///data`, `memory://`); each container becomes an
/// Azure container, a bucket, a sub-directory or a key prefix respectively.
pub struct ContainerStore {
    root_url: String,
    options: HashMap<String, String>,
    /// Shared backing store when the root is `memory://`.
    memory: Option<Arc<InMemory>>,
}

impl std::fmt::Debug for ContainerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContainerStore<{}>", self.root_url)
    }
}

impl ContainerStore {
    /// Create a store for the given root URL.
    ///
    /// The URL is validated by resolving a probe container against it.
    pub fn new(
        root_url: impl Into<String>,
        options: HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        let root_url = root_url.into();
        let probe = BackendConfig::parse_url(&join_container(&root_url, "probe"))?;
        let memory = matches!(probe, BackendConfig::Memory(_)).then(|| Arc::new(InMemory::new()));

        Ok(Self {
            root_url,
            options,
            memory,
        })
    }

    /// URL of a container under this store's root.
    pub fn container_url(&self, container: &str) -> String {
        join_container(&self.root_url, container)
    }

    /// Build the storage provider for a container.
    pub async fn provider(&self, container: &str) -> Result<StorageProvider, StorageError> {
        let url = self.container_url(container);
        debug!("Resolving storage for container {container} at {url}");

        match &self.memory {
            Some(store) => match BackendConfig::parse_url(&url)? {
                BackendConfig::Memory(config) => {
                    Ok(StorageProvider::construct_memory(config, store.clone()))
                }
                _ => InvalidUrlSnafu { url }.fail(),
            },
            None => StorageProvider::for_url_with_options(&url, &self.options).await,
        }
    }

    /// List object names in a container, optionally under a prefix.
    pub async fn list(
        &self,
        container: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<String>, StorageError> {
        let provider = self.provider(container).await?;
        let prefix = prefix.map(Path::from);
        let paths = provider.list(prefix.as_ref()).await?;
        Ok(paths.into_iter().map(|p| p.to_string()).collect())
    }
}

#[async_trait]
impl BlobStore for ContainerStore {
    async fn read(&self, container: &str, name: &str) -> Result<Bytes, StorageError> {
        self.provider(container).await?.get(&Path::from(name)).await
    }

    async fn write(
        &self,
        container: &str,
        name: &str,
        bytes: Bytes,
        content_type: ContentType,
    ) -> Result<(), StorageError> {
        self.provider(container)
            .await?
            .put(&Path::from(name), bytes, content_type)
            .await
    }
}

fn join_container(root_url: &str, container: &str) -> String {
    if root_url.ends_with("://") {
        format!("{root_url}{container}")
    } else {
        format!("{}/{}", root_url.trim_end_matches('/'), container)
    }
}
