//! CSV to Parquet transform.
//!
//! Parses the source bytes, normalizes headers, drops fully-empty rows and
//! encodes the result as a single Parquet file.

use arrow::datatypes::SchemaRef;
use bytes::Bytes;
use std::time::Instant;

use crate::config::ParquetCompression;
use crate::emit;
use crate::error::TransformError;
use crate::metrics::events::TransformCompleted;
use crate::sink::ParquetEncoder;
use crate::source::CsvReader;

/// Result of transforming one CSV object.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    /// Encoded Parquet file.
    pub bytes: Bytes,
    /// Schema written to the Parquet file.
    pub schema: SchemaRef,
    pub rows: usize,
    pub cols: usize,
    pub rows_dropped: usize,
}

/// Transform raw CSV bytes into Parquet.
///
/// `path` is only used for logging.
pub fn transform(
    data: &[u8],
    path: &str,
    compression: ParquetCompression,
) -> Result<TransformOutput, TransformError> {
    let start = Instant::now();

    let read = CsvReader::default().read(data, path)?;
    let bytes = ParquetEncoder::new(compression).encode(read.schema.clone(), &read.batches)?;

    let output = TransformOutput {
        bytes,
        cols: read.schema.fields().len(),
        schema: read.schema,
        rows: read.total_records,
        rows_dropped: read.rows_dropped,
    };

    emit!(TransformCompleted {
        rows: output.rows as u64,
        duration: start.elapsed(),
    });

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::AsArray;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    #[test]
    fn test_transform_counts() {
        let csv = "First Name, Last Name\nAda,Lovelace\n,\nGrace,Hopper\n";
        let output = transform(csv.as_bytes(), "people.csv", ParquetCompression::Snappy).unwrap();

        assert_eq!(output.rows, 2);
        assert_eq!(output.cols, 2);
        assert_eq!(output.rows_dropped, 1);
    }

    #[test]
    fn test_transform_output_is_readable_parquet() {
        let csv = "City,Population\nOslo,709000\nBergen,291000\n";
        let output = transform(csv.as_bytes(), "cities.csv", ParquetCompression::Zstd).unwrap();

        let reader = ParquetRecordBatchReaderBuilder::try_new(output.bytes)
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<_> = reader.map(|b| b.unwrap()).collect();
        assert_eq!(batches.len(), 1);

        let batch = &batches[0];
        assert_eq!(batch.schema().field(0).name(), "city");
        assert_eq!(batch.schema().field(1).name(), "population");
        assert_eq!(batch.column(0).as_string::<i32>().value(1), "Bergen");
    }

    #[test]
    fn test_all_rows_empty_yields_header_only_file() {
        let output = transform(b"a,b\n,\n,\n", "blank.csv", ParquetCompression::Snappy).unwrap();
        assert_eq!(output.rows, 0);
        assert_eq!(output.cols, 2);
        assert_eq!(output.rows_dropped, 2);

        let builder = ParquetRecordBatchReaderBuilder::try_new(output.bytes).unwrap();
        assert_eq!(builder.schema().fields().len(), 2);
    }

    #[test]
    fn test_transform_propagates_parse_errors() {
        let err = transform(b"", "empty.csv", ParquetCompression::Snappy).unwrap_err();
        assert!(matches!(err, TransformError::MissingHeader));
    }
}
