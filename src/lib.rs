//! flurry: event-triggered CSV to Parquet normalization.
//!
//! Each blob-created notification for a CSV object runs one invocation:
//! the object is fetched, its headers are normalized, fully-empty rows are
//! dropped, and the result is written as Parquet to an output container
//! together with a JSON audit record in a log container.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use flurry::{Config, ContainerStore, Handler, parse_notifications};
//!
//! let config = Config::from_file("flurry.yaml")?;
//! let store = ContainerStore::new(&config.storage.url, config.storage.options.clone())?;
//! let handler = Handler::new(Arc::new(store), config.handler_config());
//!
//! for event in parse_notifications(&input)? {
//!     handler.handle(&event).await?;
//! }
//! ```

pub mod audit;
pub mod config;
pub mod error;
pub mod event;
pub mod handler;
pub mod metrics;
pub mod sink;
pub mod source;
pub mod storage;
pub mod transform;

// Re-export main types
pub use audit::AuditRecord;
pub use config::{Config, HandlerConfig, ParquetCompression};
pub use event::{Decoded, Notification, ObjectLocator, decode, parse_notifications};
pub use handler::{Handler, InvocationOutcome};
pub use storage::{BlobStore, ContainerStore, ContentType};
pub use transform::{TransformOutput, transform};
