use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Label – the binary class handed to the classifier
// ---------------------------------------------------------------------------

/// Binary class of a prepared example. Serialized as `0` / `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Label {
    Negative,
    Positive,
}

impl Label {
    pub fn as_u8(self) -> u8 {
        match self {
            Label::Negative => 0,
            Label::Positive => 1,
        }
    }
}

impl From<Label> for u8 {
    fn from(label: Label) -> u8 {
        label.as_u8()
    }
}

impl TryFrom<u8> for Label {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Label::Negative),
            1 => Ok(Label::Positive),
            other => Err(format!("label must be 0 or 1, got {other}")),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the source table
// ---------------------------------------------------------------------------

/// A single comment row.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub comment_text: String,
    /// `false` when the source bytes were not UTF-8; `comment_text` then
    /// holds a lossy decoding and the row never passes the language filter.
    pub valid_utf8: bool,
    /// Label columns: column_name → raw integer value (`None` for an empty cell).
    pub labels: BTreeMap<String, Option<i64>>,
}

impl Record {
    pub fn new(comment_text: impl Into<String>) -> Self {
        Record {
            comment_text: comment_text.into(),
            valid_utf8: true,
            labels: BTreeMap::new(),
        }
    }

    /// A row whose text cell was not valid UTF-8.
    pub fn malformed(lossy_text: impl Into<String>) -> Self {
        Record {
            valid_utf8: false,
            ..Record::new(lossy_text)
        }
    }

    /// Builder-style helper used by loaders and tests.
    pub fn with_label(mut self, column: &str, value: Option<i64>) -> Self {
        self.labels.insert(column.to_string(), value);
        self
    }

    /// Raw value of a label column. Outer `None` means the column is absent.
    pub fn label(&self, column: &str) -> Option<Option<i64>> {
        self.labels.get(column).copied()
    }
}

// ---------------------------------------------------------------------------
// CommentDataset – the complete loaded table
// ---------------------------------------------------------------------------

/// An ordered set of records loaded from one source table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentDataset {
    pub records: Vec<Record>,
    /// Ordered list of label column names (excludes the text column).
    pub column_names: Vec<String>,
    /// Table the records were read from, if any.
    pub source: Option<PathBuf>,
}

impl CommentDataset {
    pub fn new(records: Vec<Record>, column_names: Vec<String>) -> Self {
        CommentDataset {
            records,
            column_names,
            source: None,
        }
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }

    /// Keep only the records at `indices`, preserving their order.
    pub fn select(&self, indices: &[usize]) -> CommentDataset {
        CommentDataset {
            records: indices.iter().map(|&i| self.records[i].clone()).collect(),
            column_names: self.column_names.clone(),
            source: self.source.clone(),
        }
    }

    /// Attach a label column taken from another table, row by row.
    ///
    /// Callers check lengths first; extra values are ignored and missing
    /// ones become empty cells.
    pub fn with_label_column(mut self, column: &str, values: &[Option<i64>]) -> CommentDataset {
        for (i, record) in self.records.iter_mut().enumerate() {
            record
                .labels
                .insert(column.to_string(), values.get(i).copied().flatten());
        }
        if !self.has_column(column) {
            self.column_names.push(column.to_string());
        }
        self
    }

    /// Count of records per raw value of `column` (empty cells under `None`).
    pub fn value_counts(&self, column: &str) -> BTreeMap<Option<i64>, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            if let Some(value) = record.label(column) {
                *counts.entry(value).or_insert(0) += 1;
            }
        }
        counts
    }
}

// ---------------------------------------------------------------------------
// LabeledExample / Split – what callers get back
// ---------------------------------------------------------------------------

/// The unit produced for the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabeledExample {
    pub text: String,
    pub label: Label,
}

impl LabeledExample {
    pub fn new(text: impl Into<String>, label: Label) -> Self {
        LabeledExample {
            text: text.into(),
            label,
        }
    }
}

/// Split a set of examples into parallel `(texts, labels)` arrays.
pub fn into_arrays(examples: Vec<LabeledExample>) -> (Vec<String>, Vec<u8>) {
    examples
        .into_iter()
        .map(|ex| (ex.text, ex.label.as_u8()))
        .unzip()
}

/// Count of `(negative, positive)` examples.
pub fn class_counts(examples: &[LabeledExample]) -> (usize, usize) {
    let positive = examples
        .iter()
        .filter(|ex| ex.label == Label::Positive)
        .count();
    (examples.len() - positive, positive)
}

/// Disjoint train / validation partition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Split {
    pub train: Vec<LabeledExample>,
    pub validation: Vec<LabeledExample>,
}

impl Split {
    pub fn len(&self) -> usize {
        self.train.len() + self.validation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.train.is_empty() && self.validation.is_empty()
    }

    /// `(X_train, X_val, y_train, y_val)`.
    pub fn into_arrays(self) -> (Vec<String>, Vec<String>, Vec<u8>, Vec<u8>) {
        let (x_train, y_train) = into_arrays(self.train);
        let (x_val, y_val) = into_arrays(self.validation);
        (x_train, x_val, y_train, y_val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> CommentDataset {
        CommentDataset::new(
            vec![
                Record::new("a").with_label("toxic", Some(1)),
                Record::new("b").with_label("toxic", Some(0)),
                Record::new("c").with_label("toxic", None),
                Record::new("d").with_label("toxic", Some(0)),
            ],
            vec!["toxic".into()],
        )
    }

    #[test]
    fn value_counts_groups_missing_cells() {
        let counts = dataset().value_counts("toxic");
        assert_eq!(counts.get(&Some(0)), Some(&2));
        assert_eq!(counts.get(&Some(1)), Some(&1));
        assert_eq!(counts.get(&None), Some(&1));
    }

    #[test]
    fn select_preserves_order() {
        let picked = dataset().select(&[3, 0]);
        let texts: Vec<_> = picked.records.iter().map(|r| r.comment_text.as_str()).collect();
        assert_eq!(texts, ["d", "a"]);
        assert_eq!(picked.column_names, ["toxic"]);
        assert_eq!(picked.source, None);
    }

    #[test]
    fn with_label_column_adds_column_once() {
        let ds = CommentDataset::new(vec![Record::new("x"), Record::new("y")], vec![])
            .with_label_column("label", &[Some(-1), Some(0)]);
        assert_eq!(ds.column_names, ["label"]);
        assert_eq!(ds.records[0].label("label"), Some(Some(-1)));
        assert_eq!(ds.records[1].label("label"), Some(Some(0)));
    }

    #[test]
    fn label_serializes_as_integer() {
        let ex = LabeledExample::new("hi", Label::Positive);
        let json = serde_json::to_string(&ex).unwrap();
        assert_eq!(json, r#"{"text":"hi","label":1}"#);
        let back: LabeledExample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ex);
        assert!(serde_json::from_str::<LabeledExample>(r#"{"text":"x","label":2}"#).is_err());
    }

    #[test]
    fn split_arrays_stay_parallel() {
        let split = Split {
            train: vec![
                LabeledExample::new("t1", Label::Positive),
                LabeledExample::new("t2", Label::Negative),
            ],
            validation: vec![LabeledExample::new("v1", Label::Negative)],
        };
        assert_eq!(split.len(), 3);
        let (x_train, x_val, y_train, y_val) = split.into_arrays();
        assert_eq!(x_train, ["t1", "t2"]);
        assert_eq!(y_train, [1, 0]);
        assert_eq!(x_val, ["v1"]);
        assert_eq!(y_val, [0]);
    }
}
