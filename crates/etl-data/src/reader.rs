//! Table loading from Parquet and CSV files.
//!
//! Parquet columns are decoded through Arrow into [`Table`] cells; CSV
//! columns are read as text and typed by inference.

use std::fs::File;
use std::path::Path;

use arrow::array::{Array, ArrayRef, ArrowPrimitiveType, AsArray, PrimitiveArray};
use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type,
    Int8Type, TimeUnit, TimestampMicrosecondType, TimestampMillisecondType,
    TimestampNanosecondType, TimestampSecondType, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use etl_core::error::{EtlError, Result};
use etl_core::table::{Cell, Column, Table, Value};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::debug;

/// Field texts read as missing cells in CSV input.
const NA_VALUES: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "<NA>", "#N/A",
];

// ── Public API ────────────────────────────────────────────────────────────────

/// Read a table, choosing the format from the file extension.
///
/// `.parquet` / `.pq` are read as Parquet, `.csv` as CSV.
pub fn read_table(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("parquet") | Some("pq") => read_parquet_table(path),
        Some("csv") => read_csv_table(path),
        _ => Err(EtlError::Config(format!(
            "cannot infer table format of {} (expected .csv or .parquet)",
            path.display()
        ))),
    }
}

/// Read every row group of a Parquet file into a [`Table`].
pub fn read_parquet_table(path: &Path) -> Result<Table> {
    let file = File::open(path).map_err(|source| EtlError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).map_err(|source| EtlError::ParquetRead {
            path: path.to_path_buf(),
            source,
        })?;
    let schema = builder.schema().clone();
    let reader = builder.build().map_err(|source| EtlError::ParquetRead {
        path: path.to_path_buf(),
        source,
    })?;

    let mut columns: Vec<Column> = schema
        .fields()
        .iter()
        .map(|field| Column::new(field.name().clone(), Vec::new()))
        .collect();

    let mut batches = 0usize;
    for batch in reader {
        let batch = batch.map_err(|source| EtlError::ArrowRead {
            path: path.to_path_buf(),
            source,
        })?;
        for (column, array) in columns.iter_mut().zip(batch.columns()) {
            let cells = array_to_cells(array, &column.name, path)?;
            column.cells.extend(cells);
        }
        batches += 1;
    }

    let table = Table::new(columns)?;
    debug!(
        "Read {} rows x {} columns from {} ({} batches)",
        table.num_rows(),
        table.num_columns(),
        path.display(),
        batches
    );
    Ok(table)
}

/// Read a headed CSV file into a [`Table`], inferring one type per column.
///
/// A column whose present fields all parse as integers becomes integer;
/// otherwise all-numeric becomes float, all `true`/`false` (any case) becomes
/// boolean, and anything else stays string. Fields listed in the NA set are
/// missing cells.
pub fn read_csv_table(path: &Path) -> Result<Table> {
    let file = File::open(path).map_err(|source| EtlError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|source| EtlError::CsvRead {
            path: path.to_path_buf(),
            source,
        })?
        .clone();

    let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for result in reader.records() {
        let record = result.map_err(|source| EtlError::CsvRead {
            path: path.to_path_buf(),
            source,
        })?;
        for (dest, field) in raw.iter_mut().zip(record.iter()) {
            let field = if NA_VALUES.contains(&field) {
                None
            } else {
                Some(field.to_string())
            };
            dest.push(field);
        }
    }

    let columns = headers
        .iter()
        .zip(raw)
        .map(|(name, fields)| Column::new(name, infer_cells(fields)))
        .collect();

    let table = Table::new(columns)?;
    debug!(
        "Read {} rows x {} columns from {}",
        table.num_rows(),
        table.num_columns(),
        path.display()
    );
    Ok(table)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Type a column of CSV fields.
fn infer_cells(fields: Vec<Option<String>>) -> Vec<Cell> {
    let present = || fields.iter().flatten();

    if present().all(|s| s.parse::<i64>().is_ok()) {
        return fields
            .iter()
            .map(|f| f.as_ref().and_then(|s| s.parse().ok()).map(Value::Int))
            .collect();
    }
    if present().all(|s| s.parse::<f64>().is_ok()) {
        return fields
            .iter()
            .map(|f| f.as_ref().and_then(|s| s.parse().ok()).map(Value::Float))
            .collect();
    }
    if present().all(|s| parse_bool(s).is_some()) {
        return fields
            .iter()
            .map(|f| f.as_deref().and_then(parse_bool).map(Value::Bool))
            .collect();
    }
    fields.into_iter().map(|f| f.map(Value::Str)).collect()
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn primitive_cells<T: ArrowPrimitiveType>(
    array: &PrimitiveArray<T>,
    f: impl Fn(T::Native) -> Option<Value>,
) -> Vec<Cell> {
    array.iter().map(|v| v.and_then(&f)).collect()
}

fn float_value(v: f64) -> Option<Value> {
    // NaN is the missing marker in float columns.
    if v.is_nan() {
        None
    } else {
        Some(Value::Float(v))
    }
}

fn temporal_cells<T>(array: &PrimitiveArray<T>, date_only: bool) -> Vec<Cell>
where
    T: arrow::datatypes::ArrowTemporalType,
    i64: From<T::Native>,
{
    (0..array.len())
        .map(|i| {
            if array.is_null(i) {
                return None;
            }
            if date_only {
                array.value_as_date(i).map(Value::Date)
            } else {
                array.value_as_datetime(i).map(Value::Timestamp)
            }
        })
        .collect()
}

/// Convert one Arrow array into cells.
///
/// Signed and unsigned integers, floats, booleans, strings, dates and
/// timestamps are supported, as are dictionary-encoded columns of those types.
/// Any other type is a schema error.
fn array_to_cells(array: &ArrayRef, column: &str, path: &Path) -> Result<Vec<Cell>> {
    let cells = match array.data_type() {
        DataType::Null => vec![None; array.len()],
        DataType::Int8 => primitive_cells(array.as_primitive::<Int8Type>(), |v| {
            Some(Value::Int(v.into()))
        }),
        DataType::Int16 => primitive_cells(array.as_primitive::<Int16Type>(), |v| {
            Some(Value::Int(v.into()))
        }),
        DataType::Int32 => primitive_cells(array.as_primitive::<Int32Type>(), |v| {
            Some(Value::Int(v.into()))
        }),
        DataType::Int64 => {
            primitive_cells(array.as_primitive::<Int64Type>(), |v| Some(Value::Int(v)))
        }
        DataType::UInt8 => primitive_cells(array.as_primitive::<UInt8Type>(), |v| {
            Some(Value::Int(v.into()))
        }),
        DataType::UInt16 => primitive_cells(array.as_primitive::<UInt16Type>(), |v| {
            Some(Value::Int(v.into()))
        }),
        DataType::UInt32 => primitive_cells(array.as_primitive::<UInt32Type>(), |v| {
            Some(Value::Int(v.into()))
        }),
        DataType::UInt64 => primitive_cells(array.as_primitive::<UInt64Type>(), |v| {
            Some(match i64::try_from(v) {
                Ok(i) => Value::Int(i),
                Err(_) => Value::Float(v as f64),
            })
        }),
        DataType::Float32 => primitive_cells(array.as_primitive::<Float32Type>(), |v| {
            float_value(v.into())
        }),
        DataType::Float64 => primitive_cells(array.as_primitive::<Float64Type>(), float_value),
        DataType::Boolean => array
            .as_boolean()
            .iter()
            .map(|v| v.map(Value::Bool))
            .collect(),
        DataType::Utf8 => array
            .as_string::<i32>()
            .iter()
            .map(|v| v.map(Value::from))
            .collect(),
        DataType::LargeUtf8 => array
            .as_string::<i64>()
            .iter()
            .map(|v| v.map(Value::from))
            .collect(),
        DataType::Utf8View => array
            .as_string_view()
            .iter()
            .map(|v| v.map(Value::from))
            .collect(),
        DataType::Date32 => temporal_cells(array.as_primitive::<Date32Type>(), true),
        DataType::Date64 => temporal_cells(array.as_primitive::<Date64Type>(), true),
        DataType::Timestamp(unit, _) => match unit {
            TimeUnit::Second => temporal_cells(array.as_primitive::<TimestampSecondType>(), false),
            TimeUnit::Millisecond => {
                temporal_cells(array.as_primitive::<TimestampMillisecondType>(), false)
            }
            TimeUnit::Microsecond => {
                temporal_cells(array.as_primitive::<TimestampMicrosecondType>(), false)
            }
            TimeUnit::Nanosecond => {
                temporal_cells(array.as_primitive::<TimestampNanosecondType>(), false)
            }
        },
        DataType::Dictionary(_, value_type) => {
            let decoded = arrow::compute::cast(array, value_type).map_err(|source| {
                EtlError::ArrowRead {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            return array_to_cells(&decoded, column, path);
        }
        other => {
            return Err(EtlError::Schema(format!(
                "column '{}' in {} has unsupported type {}",
                column,
                path.display(),
                other
            )))
        }
    };
    Ok(cells)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Arc;

    use arrow::array::{
        BooleanArray, Date32Array, DictionaryArray, Float64Array, Int32Array, Int64Array,
        StringArray, TimestampMillisecondArray,
    };
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use chrono::NaiveDate;
    use etl_core::error::ErrorKind;
    use parquet::arrow::ArrowWriter;
    use tempfile::TempDir;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn write_csv(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        path
    }

    fn write_parquet(dir: &Path, name: &str, batch: &RecordBatch) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
        writer.write(batch).unwrap();
        writer.close().unwrap();
        path
    }

    fn cells(table: &Table, name: &str) -> Vec<Cell> {
        table.column(name).unwrap().cells.clone()
    }

    // ── read_parquet_table ────────────────────────────────────────────────────

    #[test]
    fn test_read_parquet_supported_types() {
        let dir = TempDir::new().unwrap();
        let schema = Arc::new(Schema::new(vec![
            Field::new("index", DataType::Int64, false),
            Field::new("Store_ID", DataType::Int32, true),
            Field::new("CPI", DataType::Float64, true),
            Field::new("IsHoliday", DataType::Boolean, true),
            Field::new("Type", DataType::Utf8, true),
            Field::new("Date", DataType::Date32, true),
            Field::new(
                "Seen",
                DataType::Timestamp(TimeUnit::Millisecond, None),
                true,
            ),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![0, 1])),
                Arc::new(Int32Array::from(vec![Some(1), None])),
                Arc::new(Float64Array::from(vec![Some(211.5), Some(f64::NAN)])),
                Arc::new(BooleanArray::from(vec![Some(false), Some(true)])),
                Arc::new(StringArray::from(vec![Some("A"), None])),
                // 14645 days after the epoch is 2010-02-05.
                Arc::new(Date32Array::from(vec![Some(14645), None])),
                Arc::new(TimestampMillisecondArray::from(vec![Some(0), None])),
            ],
        )
        .unwrap();
        let path = write_parquet(dir.path(), "extra.parquet", &batch);

        let table = read_parquet_table(&path).unwrap();

        assert_eq!(table.num_rows(), 2);
        assert_eq!(
            table.column_names(),
            vec!["index", "Store_ID", "CPI", "IsHoliday", "Type", "Date", "Seen"]
        );
        assert_eq!(cells(&table, "index"), vec![Some(Value::Int(0)), Some(Value::Int(1))]);
        assert_eq!(cells(&table, "Store_ID"), vec![Some(Value::Int(1)), None]);
        assert_eq!(cells(&table, "CPI"), vec![Some(Value::Float(211.5)), None]);
        assert_eq!(
            cells(&table, "IsHoliday"),
            vec![Some(Value::Bool(false)), Some(Value::Bool(true))]
        );
        assert_eq!(cells(&table, "Type"), vec![Some(Value::from("A")), None]);
        assert_eq!(
            cells(&table, "Date"),
            vec![
                Some(Value::Date(NaiveDate::from_ymd_opt(2010, 2, 5).unwrap())),
                None
            ]
        );
        assert_eq!(
            cells(&table, "Seen"),
            vec![
                Some(Value::Timestamp(
                    NaiveDate::from_ymd_opt(1970, 1, 1)
                        .unwrap()
                        .and_hms_opt(0, 0, 0)
                        .unwrap()
                )),
                None
            ]
        );
    }

    #[test]
    fn test_read_parquet_dictionary_column() {
        let dir = TempDir::new().unwrap();
        let store_type: DictionaryArray<Int32Type> =
            vec![Some("A"), None, Some("B"), Some("A")].into_iter().collect();
        let schema = Arc::new(Schema::new(vec![
            Field::new("index", DataType::Int64, false),
            Field::new(
                "Type",
                DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8)),
                true,
            ),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![0, 1, 2, 3])),
                Arc::new(store_type),
            ],
        )
        .unwrap();
        let path = write_parquet(dir.path(), "extra.parquet", &batch);

        let table = read_parquet_table(&path).unwrap();

        assert_eq!(
            cells(&table, "Type"),
            vec![
                Some(Value::from("A")),
                None,
                Some(Value::from("B")),
                Some(Value::from("A"))
            ]
        );
    }

    #[test]
    fn test_read_parquet_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read_parquet_table(&dir.path().join("absent.parquet")).unwrap_err();
        assert!(matches!(err, EtlError::FileRead { .. }));
        assert_eq!(err.kind(), ErrorKind::Read);
    }

    #[test]
    fn test_read_parquet_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(dir.path(), "broken.parquet", &["this is not parquet"]);
        let err = read_parquet_table(&path).unwrap_err();
        assert!(matches!(err, EtlError::ParquetRead { .. }));
        assert_eq!(err.kind(), ErrorKind::Read);
    }

    // ── read_csv_table ────────────────────────────────────────────────────────

    #[test]
    fn test_read_csv_infers_types() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            dir.path(),
            "store.csv",
            &[
                "index,Store_ID,Date,IsHoliday,Weekly_Sales",
                "0,1,2010-02-05,FALSE,24924.5",
                "1,1,2010-02-12,TRUE,46039",
                "2,,2010-02-19,False,",
            ],
        );

        let table = read_csv_table(&path).unwrap();

        assert_eq!(table.num_rows(), 3);
        assert_eq!(
            cells(&table, "Store_ID"),
            vec![Some(Value::Int(1)), Some(Value::Int(1)), None]
        );
        assert_eq!(
            cells(&table, "Date")[0],
            Some(Value::from("2010-02-05"))
        );
        assert_eq!(
            cells(&table, "IsHoliday"),
            vec![
                Some(Value::Bool(false)),
                Some(Value::Bool(true)),
                Some(Value::Bool(false))
            ]
        );
        assert_eq!(
            cells(&table, "Weekly_Sales"),
            vec![
                Some(Value::Float(24924.5)),
                Some(Value::Float(46039.0)),
                None
            ]
        );
    }

    #[test]
    fn test_read_csv_na_tokens() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(dir.path(), "na.csv", &["a,b", "NA,x", "NaN,null", "3,y"]);

        let table = read_csv_table(&path).unwrap();

        assert_eq!(cells(&table, "a"), vec![None, None, Some(Value::Int(3))]);
        assert_eq!(
            cells(&table, "b"),
            vec![Some(Value::from("x")), None, Some(Value::from("y"))]
        );
    }

    #[test]
    fn test_read_csv_ragged_rows_fail() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(dir.path(), "ragged.csv", &["a,b", "1,2", "3"]);
        let err = read_csv_table(&path).unwrap_err();
        assert!(matches!(err, EtlError::CsvRead { .. }));
    }

    #[test]
    fn test_read_csv_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read_csv_table(&dir.path().join("absent.csv")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Read);
    }

    // ── read_table ────────────────────────────────────────────────────────────

    #[test]
    fn test_read_table_dispatches_on_extension() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(dir.path(), "store.CSV", &["a", "1"]);
        assert_eq!(read_table(&path).unwrap().num_rows(), 1);

        let err = read_table(&dir.path().join("store.xlsx")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
