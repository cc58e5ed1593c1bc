//! Source decoding.
//!
//! Turns raw CSV object bytes into normalized Arrow record batches.

pub mod headers;
pub mod reader;

pub use headers::{normalize_header, normalize_headers};
pub use reader::{CsvReader, ReadResult};
