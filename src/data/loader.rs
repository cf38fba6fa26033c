use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray, BinaryArray, Float64Array, Int64Array, StringArray};
use arrow::compute::{cast_with_options, CastOptions};
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use log::{debug, info};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CommentDataset, Record};
use crate::error::{PrepError, Result};

/// Which columns to pull out of a comment table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    pub text_column: String,
    /// Label columns that must be present. Other columns (ids, unused
    /// labels) are ignored.
    pub label_columns: Vec<String>,
}

impl TableSpec {
    pub fn new(text_column: &str, label_columns: &[&str]) -> Self {
        TableSpec {
            text_column: text_column.to_string(),
            label_columns: label_columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn wanted(&self) -> Vec<(String, Role)> {
        std::iter::once((self.text_column.clone(), Role::Text))
            .chain(self.label_columns.iter().map(|c| (c.clone(), Role::Label)))
            .collect()
    }
}

/// How a projected column is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Text,
    Label,
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a comment table. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row; text column as UTF-8, labels as integers
/// * `.parquet` – any string-like text column (plain, view, dictionary,
///   binary); integer, boolean, float or string label columns
/// * `.json`    – `[{ "comment_text": "...", "toxic": 0, ... }, ...]`
pub fn load_comments(path: &Path, spec: &TableSpec) -> Result<CommentDataset> {
    let table = read_table(path, &spec.wanted())?;

    let mut records = Vec::with_capacity(table.rows.len());
    for (row_no, row) in table.rows.into_iter().enumerate() {
        let mut cells = row.into_iter();
        let mut record = match cells.next() {
            Some(Cell::Malformed(lossy)) => Record::malformed(lossy),
            Some(cell) => Record::new(cell.into_text()),
            None => Record::new(""),
        };
        for (column, cell) in spec.label_columns.iter().zip(cells) {
            let value = cell.into_label(path, row_no, column)?;
            record.labels.insert(column.clone(), value);
        }
        records.push(record);
    }

    info!(
        "Loaded {} rows from {} (labels: {:?})",
        records.len(),
        path.display(),
        spec.label_columns
    );
    Ok(CommentDataset::new(records, spec.label_columns.clone()).with_source(path))
}

/// Load a single label column from a table, in row order.
pub fn load_labels(path: &Path, column: &str) -> Result<Vec<Option<i64>>> {
    let table = read_table(path, &[(column.to_string(), Role::Label)])?;
    let labels = table
        .rows
        .into_iter()
        .enumerate()
        .map(|(row_no, row)| match row.into_iter().next() {
            Some(cell) => cell.into_label(path, row_no, column),
            None => Ok(None),
        })
        .collect::<Result<Vec<_>>>()?;
    debug!("Loaded {} '{column}' labels from {}", labels.len(), path.display());
    Ok(labels)
}

/// Load a text table and a separately stored label column, joined by row
/// position. The joined column is stored under `as_column`.
pub fn load_joined(
    text_path: &Path,
    text_column: &str,
    label_path: &Path,
    label_column: &str,
    as_column: &str,
) -> Result<CommentDataset> {
    let texts = load_comments(text_path, &TableSpec::new(text_column, &[]))?;
    let labels = load_labels(label_path, label_column)?;
    if texts.len() != labels.len() {
        return Err(PrepError::LengthMismatch {
            text_path: text_path.to_path_buf(),
            label_path: label_path.to_path_buf(),
            text_rows: texts.len(),
            label_rows: labels.len(),
        });
    }
    Ok(texts.with_label_column(as_column, &labels))
}

// ---------------------------------------------------------------------------
// Raw table: the requested columns, in request order
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Text(String),
    Int(i64),
    Float(f64),
    /// Text that was not valid UTF-8, decoded lossily.
    Malformed(String),
    Null,
}

impl Cell {
    fn into_text(self) -> String {
        match self {
            Cell::Text(s) | Cell::Malformed(s) => s,
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => f.to_string(),
            Cell::Null => String::new(),
        }
    }

    fn into_label(self, path: &Path, row: usize, column: &str) -> Result<Option<i64>> {
        let invalid = |value: String| PrepError::InvalidLabel {
            path: path.to_path_buf(),
            row,
            column: column.to_string(),
            value,
        };
        match self {
            Cell::Null => Ok(None),
            Cell::Int(i) => Ok(Some(i)),
            Cell::Float(f) if f.is_nan() => Ok(None),
            Cell::Float(f) if f.fract() == 0.0 => Ok(Some(f as i64)),
            Cell::Float(f) => Err(invalid(f.to_string())),
            Cell::Malformed(s) => Err(invalid(s)),
            Cell::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                if let Ok(i) = trimmed.parse::<i64>() {
                    return Ok(Some(i));
                }
                match trimmed.parse::<f64>() {
                    Ok(f) if f.fract() == 0.0 => Ok(Some(f as i64)),
                    _ => Err(invalid(s)),
                }
            }
        }
    }
}

struct RawTable {
    rows: Vec<Vec<Cell>>,
}

fn read_table(path: &Path, wanted: &[(String, Role)]) -> Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => read_csv(path, wanted),
        "parquet" | "pq" => read_parquet(path, wanted),
        "json" => read_json(path, wanted),
        other => Err(PrepError::UnsupportedFormat(other.to_string())),
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| PrepError::from_io(path, e))
}

fn missing(path: &Path, column: &str) -> PrepError {
    PrepError::MissingColumn {
        path: path.to_path_buf(),
        column: column.to_string(),
    }
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names; every cell is read as text and
/// converted on projection.
fn read_csv(path: &Path, wanted: &[(String, Role)]) -> Result<RawTable> {
    let mut reader = csv::Reader::from_reader(open(path)?);
    let headers = reader.headers()?.clone();

    let indices = wanted
        .iter()
        .map(|(col, _)| {
            headers
                .iter()
                .position(|h| h == col)
                .ok_or_else(|| missing(path, col))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut rows = Vec::new();
    for result in reader.byte_records() {
        let record = result?;
        rows.push(
            indices
                .iter()
                .map(|&i| match record.get(i) {
                    Some(bytes) => decode_text(bytes),
                    None => Cell::Null,
                })
                .collect(),
        );
    }
    Ok(RawTable { rows })
}

/// A cell whose bytes are not UTF-8 is kept, lossily decoded, so one bad
/// row does not abort the whole table.
fn decode_text(bytes: &[u8]) -> Cell {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cell::Text(text.to_string()),
        Err(_) => Cell::Malformed(String::from_utf8_lossy(bytes).into_owned()),
    }
}

// ---------------------------------------------------------------------------
// JSON reader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`). A key missing
/// from a given object reads as null; a key missing from every object is a
/// schema error.
fn read_json(path: &Path, wanted: &[(String, Role)]) -> Result<RawTable> {
    let root: JsonValue = serde_json::from_reader(BufReader::new(open(path)?))?;
    let records = match root {
        JsonValue::Array(items) => items,
        _ => {
            return Err(PrepError::MalformedTable {
                path: path.to_path_buf(),
                reason: "expected a top-level JSON array of records".into(),
            })
        }
    };

    if !records.is_empty() {
        for (col, _) in wanted {
            let present = records
                .iter()
                .any(|rec| rec.as_object().is_some_and(|obj| obj.contains_key(col)));
            if !present {
                return Err(missing(path, col));
            }
        }
    }

    let rows = records
        .iter()
        .map(|rec| {
            wanted
                .iter()
                .map(|(col, _)| json_to_cell(rec.get(col.as_str())))
                .collect()
        })
        .collect();
    Ok(RawTable { rows })
}

fn json_to_cell(val: Option<&JsonValue>) -> Cell {
    match val {
        None | Some(JsonValue::Null) => Cell::Null,
        Some(JsonValue::String(s)) => Cell::Text(s.clone()),
        Some(JsonValue::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Cell::Int(i)
            } else if let Some(f) = n.as_f64() {
                Cell::Float(f)
            } else {
                Cell::Text(n.to_string())
            }
        }
        Some(JsonValue::Bool(b)) => Cell::Int(i64::from(*b)),
        Some(other) => Cell::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Works with files written by both Pandas (`df.to_parquet()`, including
/// categorical columns stored as dictionaries) and Polars
/// (`df.write_parquet()`, which uses string views).
fn read_parquet(path: &Path, wanted: &[(String, Role)]) -> Result<RawTable> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(open(path)?)?;
    let schema = builder.schema().clone();
    for (col, _) in wanted {
        if schema.index_of(col).is_err() {
            return Err(missing(path, col));
        }
    }
    let reader = builder.build()?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;
        let batch_schema = batch.schema();
        let columns = wanted
            .iter()
            .map(|(col, role)| {
                let idx = batch_schema.index_of(col).map_err(|_| missing(path, col))?;
                normalize_column(path, col, batch.column(idx), *role)
            })
            .collect::<Result<Vec<_>>>()?;

        for row in 0..batch.num_rows() {
            rows.push(columns.iter().map(|col| col.cell(row)).collect());
        }
    }
    Ok(RawTable { rows })
}

/// A projected column cast to one of the few layouts cells are read from.
enum Normalized {
    Text(StringArray),
    Bytes(BinaryArray),
    Int(Int64Array),
    Float(Float64Array),
}

impl Normalized {
    fn cell(&self, row: usize) -> Cell {
        match self {
            Normalized::Text(a) if a.is_valid(row) => Cell::Text(a.value(row).to_string()),
            Normalized::Bytes(a) if a.is_valid(row) => decode_text(a.value(row)),
            Normalized::Int(a) if a.is_valid(row) => Cell::Int(a.value(row)),
            Normalized::Float(a) if a.is_valid(row) => Cell::Float(a.value(row)),
            _ => Cell::Null,
        }
    }
}

/// Cast a column once per batch: text to `Utf8` (binary stays bytes and is
/// decoded per row), labels to `Int64`, `Float64`, or `Utf8` for parsing.
fn normalize_column(path: &Path, name: &str, col: &ArrayRef, role: Role) -> Result<Normalized> {
    let source = col.data_type();
    let target = match role {
        Role::Text
            if matches!(
                source,
                DataType::Binary | DataType::LargeBinary | DataType::BinaryView
            ) =>
        {
            DataType::Binary
        }
        Role::Text => DataType::Utf8,
        Role::Label if source.is_floating() => DataType::Float64,
        Role::Label if source.is_integer() || matches!(source, DataType::Boolean | DataType::Null) => {
            DataType::Int64
        }
        Role::Label => DataType::Utf8,
    };

    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    let cast = cast_with_options(col, &target, &options).map_err(|e| PrepError::MalformedTable {
        path: path.to_path_buf(),
        reason: format!("column '{name}': cannot read {source} as {target}: {e}"),
    })?;

    Ok(match target {
        DataType::Binary => Normalized::Bytes(cast.as_binary::<i32>().clone()),
        DataType::Int64 => Normalized::Int(cast.as_primitive::<Int64Type>().clone()),
        DataType::Float64 => Normalized::Float(cast.as_primitive::<Float64Type>().clone()),
        _ => Normalized::Text(cast.as_string::<i32>().clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    use arrow::array::{DictionaryArray, StringViewArray, UInt64Array, UInt8Array};
    use arrow::datatypes::Int32Type;
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn csv_keeps_requested_columns_only() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "train.csv",
            "id,comment_text,toxic,obscene\n\
             a1,\"hello, there\",0,1\n\
             a2,\"multi\nline\",1,0\n",
        );
        let ds = load_comments(&path, &TableSpec::new("comment_text", &["toxic"])).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.column_names, ["toxic"]);
        assert_eq!(ds.records[0].comment_text, "hello, there");
        assert_eq!(ds.records[1].comment_text, "multi\nline");
        assert_eq!(ds.records[1].label("toxic"), Some(Some(1)));
        assert_eq!(ds.records[0].label("obscene"), None);
    }

    #[test]
    fn csv_empty_label_cell_is_missing() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "t.csv", "comment_text,toxic\nx,\ny,-1\n");
        let ds = load_comments(&path, &TableSpec::new("comment_text", &["toxic"])).unwrap();
        assert_eq!(ds.records[0].label("toxic"), Some(None));
        assert_eq!(ds.records[1].label("toxic"), Some(Some(-1)));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load_comments(
            &dir.path().join("nope.csv"),
            &TableSpec::new("comment_text", &["toxic"]),
        )
        .unwrap_err();
        assert!(matches!(err, PrepError::NotFound { .. }));
    }

    #[test]
    fn missing_column_is_schema_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "t.csv", "comment_text,insult\nx,0\n");
        let err = load_comments(&path, &TableSpec::new("comment_text", &["toxic"])).unwrap_err();
        match err {
            PrepError::MissingColumn { column, .. } => assert_eq!(column, "toxic"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_integer_label_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "t.csv", "comment_text,toxic\nx,maybe\n");
        let err = load_comments(&path, &TableSpec::new("comment_text", &["toxic"])).unwrap_err();
        assert!(matches!(err, PrepError::InvalidLabel { row: 0, .. }));
    }

    #[test]
    fn integral_float_labels_are_accepted() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "t.csv", "comment_text,toxic\nx,1.0\n");
        let ds = load_comments(&path, &TableSpec::new("comment_text", &["toxic"])).unwrap();
        assert_eq!(ds.records[0].label("toxic"), Some(Some(1)));
    }

    #[test]
    fn unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "t.xlsx", "");
        let err = load_comments(&path, &TableSpec::new("comment_text", &[])).unwrap_err();
        assert!(matches!(err, PrepError::UnsupportedFormat(ext) if ext == "xlsx"));
    }

    #[test]
    fn joined_tables_align_by_position() {
        let dir = TempDir::new().unwrap();
        let text = write(&dir, "test.csv", "id,comment_text\n1,first\n2,second\n");
        let labels = write(&dir, "test_labels.csv", "id,toxic\n1,-1\n2,0\n");
        let ds = load_joined(&text, "comment_text", &labels, "toxic", "label").unwrap();
        assert_eq!(ds.column_names, ["label"]);
        assert_eq!(ds.records[0].label("label"), Some(Some(-1)));
        assert_eq!(ds.records[1].comment_text, "second");
        assert_eq!(ds.records[1].label("label"), Some(Some(0)));
    }

    #[test]
    fn joined_tables_must_match_in_length() {
        let dir = TempDir::new().unwrap();
        let text = write(&dir, "test.csv", "comment_text\nfirst\nsecond\n");
        let labels = write(&dir, "test_labels.csv", "toxic\n0\n");
        let err = load_joined(&text, "comment_text", &labels, "toxic", "label").unwrap_err();
        assert!(matches!(
            err,
            PrepError::LengthMismatch { text_rows: 2, label_rows: 1, .. }
        ));
    }

    #[test]
    fn json_records() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "t.json",
            r#"[{"comment_text": "a", "toxic": 1}, {"comment_text": "b", "toxic": null}]"#,
        );
        let ds = load_comments(&path, &TableSpec::new("comment_text", &["toxic"])).unwrap();
        assert_eq!(ds.records[0].label("toxic"), Some(Some(1)));
        assert_eq!(ds.records[1].label("toxic"), Some(None));
    }

    fn write_parquet(dir: &TempDir, name: &str, columns: Vec<(&str, ArrayRef)>) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let batch = RecordBatch::try_from_iter(columns).unwrap();
        let mut writer =
            ArrowWriter::try_new(File::create(&path).unwrap(), batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
        path
    }

    #[test]
    fn csv_undecodable_text_is_flagged_not_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.csv");
        let mut bytes = b"comment_text,toxic\nfine,0\nbad ".to_vec();
        bytes.push(0xff);
        bytes.extend_from_slice(b" byte,1\nalso fine,1\n");
        std::fs::write(&path, bytes).unwrap();

        let ds = load_comments(&path, &TableSpec::new("comment_text", &["toxic"])).unwrap();
        assert_eq!(ds.len(), 3);
        assert!(ds.records[0].valid_utf8);
        assert!(!ds.records[1].valid_utf8);
        assert_eq!(ds.records[1].comment_text, "bad \u{fffd} byte");
        assert_eq!(ds.records[1].label("toxic"), Some(Some(1)));
        assert!(ds.records[2].valid_utf8);
    }

    #[test]
    fn csv_undecodable_label_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.csv");
        let mut bytes = b"comment_text,toxic\nx,".to_vec();
        bytes.push(0xff);
        bytes.push(b'\n');
        std::fs::write(&path, bytes).unwrap();

        let err = load_comments(&path, &TableSpec::new("comment_text", &["toxic"])).unwrap_err();
        assert!(matches!(err, PrepError::InvalidLabel { row: 0, .. }));
    }

    #[test]
    fn json_top_level_must_be_an_array() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "t.json", r#"{"comment_text": "a", "toxic": 1}"#);
        let err = load_comments(&path, &TableSpec::new("comment_text", &["toxic"])).unwrap_err();
        assert!(err.is_schema_error());
        assert!(matches!(err, PrepError::MalformedTable { .. }));
    }

    #[test]
    fn parquet_view_and_dictionary_text_with_narrow_labels() {
        let dir = TempDir::new().unwrap();
        let dict: DictionaryArray<Int32Type> =
            vec![Some("red"), None, Some("red"), Some("blue")].into_iter().collect();
        let path = write_parquet(
            &dir,
            "t.parquet",
            vec![
                (
                    "view_text",
                    Arc::new(StringViewArray::from(vec![
                        Some("first"),
                        Some("second"),
                        None,
                        Some("a string view longer than twelve bytes"),
                    ])) as ArrayRef,
                ),
                ("dict_text", Arc::new(dict) as ArrayRef),
                ("toxic", Arc::new(UInt8Array::from(vec![Some(0), Some(1), None, Some(1)])) as ArrayRef),
            ],
        );

        let ds = load_comments(&path, &TableSpec::new("view_text", &["toxic"])).unwrap();
        let texts: Vec<_> = ds.records.iter().map(|r| r.comment_text.as_str()).collect();
        assert_eq!(texts, ["first", "second", "", "a string view longer than twelve bytes"]);
        let labels: Vec<_> = ds.records.iter().map(|r| r.label("toxic")).collect();
        assert_eq!(labels, [Some(Some(0)), Some(Some(1)), Some(None), Some(Some(1))]);

        let ds = load_comments(&path, &TableSpec::new("dict_text", &[])).unwrap();
        let texts: Vec<_> = ds.records.iter().map(|r| r.comment_text.as_str()).collect();
        assert_eq!(texts, ["red", "", "red", "blue"]);
    }

    #[test]
    fn parquet_label_out_of_range_is_schema_error() {
        let dir = TempDir::new().unwrap();
        let path = write_parquet(
            &dir,
            "t.parquet",
            vec![
                ("comment_text", Arc::new(StringArray::from(vec!["x"])) as ArrayRef),
                ("toxic", Arc::new(UInt64Array::from(vec![u64::MAX])) as ArrayRef),
            ],
        );
        let err = load_comments(&path, &TableSpec::new("comment_text", &["toxic"])).unwrap_err();
        assert!(err.is_schema_error());
        assert!(matches!(err, PrepError::MalformedTable { .. }));
    }

    #[test]
    fn parquet_table() {
        let dir = TempDir::new().unwrap();
        let path = write_parquet(
            &dir,
            "train.parquet",
            vec![
                ("comment_text", Arc::new(StringArray::from(vec![Some("a"), None])) as ArrayRef),
                ("toxic", Arc::new(Int64Array::from(vec![Some(0), Some(1)])) as ArrayRef),
            ],
        );

        let ds = load_comments(&path, &TableSpec::new("comment_text", &["toxic"])).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.records[0].comment_text, "a");
        assert_eq!(ds.records[1].comment_text, "");
        assert_eq!(ds.records[1].label("toxic"), Some(Some(1)));

        let err = load_labels(&path, "severe_toxic").unwrap_err();
        assert!(matches!(err, PrepError::MissingColumn { .. }));
    }
}
