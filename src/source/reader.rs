//! CSV reader.
//!
//! Parses delimited text with a header row into Arrow RecordBatches, using
//! a schema inferred from the data, normalized column names, and with
//! fully-empty rows removed.

use arrow::array::{Array, AsArray, BooleanArray, RecordBatch};
use arrow::compute::filter_record_batch;
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use regex::Regex;
use snafu::prelude::*;
use std::io::Cursor;
use std::sync::{Arc, LazyLock};
use tracing::debug;

use crate::emit;
use crate::error::{MissingHeaderSnafu, ParseSnafu, RowFilterSnafu, TransformError};
use crate::metrics::events::{BytesRead, RowsDropped};

use super::headers::normalize_header;

/// Empty fields are null for every column type.
static NULL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^$").expect("Invalid regex pattern"));

/// Configuration for the CSV reader.
#[derive(Debug, Clone)]
struct CsvReaderConfig {
    /// Number of records per batch.
    batch_size: usize,
    /// Field delimiter.
    delimiter: u8,
}

impl Default for CsvReaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 8192,
            delimiter: b',',
        }
    }
}

/// Result of reading and normalizing a CSV object.
#[derive(Debug)]
pub struct ReadResult {
    /// Schema with normalized column names.
    pub schema: SchemaRef,
    /// Parsed record batches, fully-empty rows removed.
    pub batches: Vec<RecordBatch>,
    /// Rows remaining after filtering.
    pub total_records: usize,
    /// Rows removed because every field was empty.
    pub rows_dropped: usize,
}

/// A reader for CSV objects that yields Arrow RecordBatches.
#[derive(Debug, Default)]
pub struct CsvReader {
    config: CsvReaderConfig,
}

impl CsvReader {
    fn format(&self) -> Format {
        Format::default()
            .with_header(true)
            .with_delimiter(self.config.delimiter)
            .with_null_regex(NULL_PATTERN.clone())
    }

    /// Parse `data` into normalized record batches.
    ///
    /// `path` is only used for logging.
    pub fn read(&self, data: &[u8], path: &str) -> Result<ReadResult, TransformError> {
        emit!(BytesRead {
            bytes: data.len() as u64,
        });

        let format = self.format();
        let (inferred, records) = format
            .infer_schema(Cursor::new(data), None)
            .context(ParseSnafu)?;
        ensure!(!inferred.fields().is_empty(), MissingHeaderSnafu);

        let schema = normalized_schema(&inferred);
        debug!(
            "Inferred {} columns from {} records in {}: {:?}",
            schema.fields().len(),
            records,
            path,
            schema
                .fields()
                .iter()
                .map(|f| format!("{}:{}", f.name(), f.data_type()))
                .collect::<Vec<_>>()
        );

        let reader = ReaderBuilder::new(Arc::clone(&schema))
            .with_format(format)
            .with_batch_size(self.config.batch_size)
            .build(Cursor::new(data))
            .context(ParseSnafu)?;

        let mut batches = Vec::new();
        let mut total_records = 0;
        let mut rows_dropped = 0;

        for batch in reader {
            let batch = batch.context(ParseSnafu)?;
            let (batch, dropped) = drop_empty_rows(batch)?;
            rows_dropped += dropped;
            total_records += batch.num_rows();
            if batch.num_rows() > 0 {
                batches.push(batch);
            }
        }

        if rows_dropped > 0 {
            emit!(RowsDropped {
                count: rows_dropped as u64
            });
        }

        debug!(
            "Parsed {} batches ({} records, {} empty rows dropped) from {}",
            batches.len(),
            total_records,
            rows_dropped,
            path
        );

        Ok(ReadResult {
            schema,
            batches,
            total_records,
            rows_dropped,
        })
    }
}

/// Rename every field to its normalized name, keeping order and types.
///
/// Inference types a column with no values as `Null`; it is read as Utf8 so
/// its empty fields carry a null buffer like every other column.
fn normalized_schema(schema: &Schema) -> SchemaRef {
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|f| {
            let data_type = match f.data_type() {
                DataType::Null => DataType::Utf8,
                other => other.clone(),
            };
            Field::new(normalize_header(f.name()), data_type, true)
        })
        .collect();
    Arc::new(Schema::new(fields))
}

/// Remove rows where every column is null or an empty string.
fn drop_empty_rows(batch: RecordBatch) -> Result<(RecordBatch, usize), TransformError> {
    let keep: BooleanArray = (0..batch.num_rows())
        .map(|row| {
            Some(
                batch
                    .columns()
                    .iter()
                    .any(|column| !field_is_empty(column.as_ref(), row)),
            )
        })
        .collect();

    let dropped = keep.false_count();
    if dropped == 0 {
        return Ok((batch, 0));
    }

    let filtered = filter_record_batch(&batch, &keep).context(RowFilterSnafu)?;
    Ok((filtered, dropped))
}

fn field_is_empty(column: &dyn Array, row: usize) -> bool {
    if column.is_null(row) {
        return true;
    }
    match column.data_type() {
        DataType::Null => true,
        DataType::Utf8 => column.as_string::<i32>().value(row).is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int64Array, StringArray};

    fn read(csv: &str) -> ReadResult {
        CsvReader::default().read(csv.as_bytes(), "test.csv").unwrap()
    }

    #[test]
    fn test_fully_empty_rows_dropped() {
        let result = read("a,b,c\n1,,\n,,\n3,x,y\n");

        assert_eq!(result.total_records, 2);
        assert_eq!(result.rows_dropped, 1);

        let batch = &result.batches[0];
        let a = batch.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(a.value(0), 1);
        assert_eq!(a.value(1), 3);

        let b = batch.column(1).as_any().downcast_ref::<StringArray>().unwrap();
        assert!(b.is_null(0));
        assert_eq!(b.value(1), "x");
    }

    #[test]
    fn test_empty_rows_dropped_with_all_empty_column() {
        let result = read("First Name, Last Name,Notes\nAda,Lovelace,\n,,\n");

        assert_eq!(result.total_records, 1);
        assert_eq!(result.rows_dropped, 1);
        assert_eq!(result.schema.field(2).name(), "notes");
        assert_eq!(result.schema.field(2).data_type(), &DataType::Utf8);

        let notes = result.batches[0].column(2);
        assert!(notes.is_null(0));
    }

    #[test]
    fn test_null_typed_column_counts_as_empty() {
        let column = arrow::array::NullArray::new(2);
        assert!(field_is_empty(&column, 0));
        assert!(field_is_empty(&column, 1));
    }

    #[test]
    fn test_empty_rows_dropped_across_batches() {
        let reader = CsvReader {
            config: CsvReaderConfig {
                batch_size: 2,
                ..CsvReaderConfig::default()
            },
        };
        let result = reader
            .read(b"a,b\n1,\n,\n,\n2,x\n,\n3,\n", "batched.csv")
            .unwrap();

        assert_eq!(result.total_records, 3);
        assert_eq!(result.rows_dropped, 3);
        let values: Vec<i64> = result
            .batches
            .iter()
            .flat_map(|b| {
                b.column(0)
                    .as_any()
                    .downcast_ref::<Int64Array>()
                    .unwrap()
                    .values()
                    .to_vec()
            })
            .collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_headers_normalized_in_order() {
        let result = read("First Name, Last Name,AGE\nAda,Lovelace,36\n");
        let names: Vec<_> = result.schema.fields().iter().map(|f| f.name().clone()).collect();
        assert_eq!(names, vec!["first_name", "last_name", "age"]);
    }

    #[test]
    fn test_duplicate_normalized_headers_pass_through() {
        let result = read("Total,total \n1,2\n");
        let names: Vec<_> = result.schema.fields().iter().map(|f| f.name().clone()).collect();
        assert_eq!(names, vec!["total", "total"]);
        assert_eq!(result.total_records, 1);
    }

    #[test]
    fn test_types_inferred() {
        let result = read("id,price,active,label\n1,2.5,true,a\n2,3.0,false,b\n");
        let types: Vec<_> = result
            .schema
            .fields()
            .iter()
            .map(|f| f.data_type().clone())
            .collect();
        assert_eq!(
            types,
            vec![
                DataType::Int64,
                DataType::Float64,
                DataType::Boolean,
                DataType::Utf8
            ]
        );
    }

    #[test]
    fn test_whitespace_only_row_is_kept() {
        let result = read("a,b\n , \n1,2\n");
        assert_eq!(result.total_records, 2);
        assert_eq!(result.rows_dropped, 0);
    }

    #[test]
    fn test_header_only_input() {
        let result = read("a,b\n");
        assert_eq!(result.schema.fields().len(), 2);
        assert_eq!(result.total_records, 0);
        assert!(result.batches.is_empty());
    }

    #[test]
    fn test_empty_input_has_no_header() {
        let err = CsvReader::default().read(b"", "empty.csv").unwrap_err();
        assert!(matches!(err, TransformError::MissingHeader));
    }

    #[test]
    fn test_ragged_rows_fail_to_parse() {
        let err = CsvReader::default()
            .read(b"a,b\n1,2,3\n", "ragged.csv")
            .unwrap_err();
        assert!(matches!(err, TransformError::Parse { .. }));
    }

    #[test]
    fn test_invalid_utf8_fails_to_parse() {
        let err = CsvReader::default()
            .read(b"a,b\n\xff\xfe,1\n", "binary.csv")
            .unwrap_err();
        assert!(matches!(err, TransformError::Parse { .. }));
    }
}
