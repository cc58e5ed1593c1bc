//! Parquet encoder.
//!
//! Writes Arrow RecordBatches into a single in-memory Parquet file with
//! configurable compression.

use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use snafu::prelude::*;
use std::time::Instant;
use tracing::debug;

use crate::config::ParquetCompression;
use crate::error::{EncodingSnafu, TransformError};

/// Encodes record batches as one Parquet file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetEncoder {
    compression: ParquetCompression,
}

impl ParquetEncoder {
    /// Create an encoder using the given compression codec.
    pub fn new(compression: ParquetCompression) -> Self {
        Self { compression }
    }

    fn writer_properties(&self) -> WriterProperties {
        let compression = match self.compression {
            ParquetCompression::Uncompressed => Compression::UNCOMPRESSED,
            ParquetCompression::Snappy => Compression::SNAPPY,
            ParquetCompression::Gzip => Compression::GZIP(GzipLevel::default()),
            ParquetCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
            ParquetCompression::Lz4 => Compression::LZ4,
        };

        WriterProperties::builder()
            .set_compression(compression)
            .build()
    }

    /// Encode `batches` (all sharing `schema`) into Parquet bytes.
    ///
    /// Fails with an encoding error if Parquet cannot represent a column type.
    pub fn encode(
        &self,
        schema: SchemaRef,
        batches: &[RecordBatch],
    ) -> Result<Bytes, TransformError> {
        let start = Instant::now();
        let mut writer = ArrowWriter::try_new(Vec::new(), schema, Some(self.writer_properties()))
            .context(EncodingSnafu)?;

        for batch in batches {
            writer.write(batch).context(EncodingSnafu)?;
        }

        let buffer = writer.into_inner().context(EncodingSnafu)?;
        debug!(
            "Encoded {} batches into {} Parquet bytes ({:?}) in {:?}",
            batches.len(),
            buffer.len(),
            self.compression,
            start.elapsed()
        );

        Ok(Bytes::from(buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::sync::Arc;

    fn test_schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, true),
            Field::new("value", DataType::Int64, true),
        ]))
    }

    fn test_batch(num_rows: usize) -> RecordBatch {
        let ids: Vec<String> = (0..num_rows).map(|i| format!("id_{i}")).collect();
        let values: Vec<i64> = (0..num_rows).map(|i| i as i64).collect();

        RecordBatch::try_new(
            test_schema(),
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(Int64Array::from(values)),
            ],
        )
        .unwrap()
    }

    fn row_count(bytes: Bytes) -> usize {
        ParquetRecordBatchReaderBuilder::try_new(bytes)
            .unwrap()
            .build()
            .unwrap()
            .map(|b| b.unwrap().num_rows())
            .sum()
    }

    #[test]
    fn test_encode_every_codec() {
        for compression in [
            ParquetCompression::Uncompressed,
            ParquetCompression::Snappy,
            ParquetCompression::Gzip,
            ParquetCompression::Zstd,
            ParquetCompression::Lz4,
        ] {
            let bytes = ParquetEncoder::new(compression)
                .encode(test_schema(), &[test_batch(50), test_batch(25)])
                .unwrap();
            assert_eq!(&bytes[..4], b"PAR1", "{compression:?}");
            assert_eq!(row_count(bytes), 75, "{compression:?}");
        }
    }

    #[test]
    fn test_encode_no_batches_keeps_schema() {
        let bytes = ParquetEncoder::default().encode(test_schema(), &[]).unwrap();
        let builder = ParquetRecordBatchReaderBuilder::try_new(bytes).unwrap();
        assert_eq!(builder.schema().fields().len(), 2);
        assert_eq!(builder.metadata().file_metadata().num_rows(), 0);
    }
}
