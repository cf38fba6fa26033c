//! Class balancing by random undersampling.

use std::collections::BTreeMap;

use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;

use super::model::{class_counts, CommentDataset, Label, LabeledExample};
use crate::error::{PrepError, Result};

/// Which raw label values count as positive and which as negative.
/// Values in neither list are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMapping {
    pub positive: Vec<i64>,
    pub negative: Vec<i64>,
}

impl LabelMapping {
    /// `1 → 1`, `0 → 0`.
    pub fn binary() -> Self {
        LabelMapping {
            positive: vec![1],
            negative: vec![0],
        }
    }

    /// `-1 → 1`, `0 → 0`; rows marked `-1` (withheld) are treated as positive.
    pub fn withheld_as_positive() -> Self {
        LabelMapping {
            positive: vec![-1],
            negative: vec![0],
        }
    }

    pub fn map(&self, value: i64) -> Option<Label> {
        if self.positive.contains(&value) {
            Some(Label::Positive)
        } else if self.negative.contains(&value) {
            Some(Label::Negative)
        } else {
            None
        }
    }
}

/// Examples derived from a dataset plus the rows that had no usable label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Labeling {
    pub examples: Vec<LabeledExample>,
    /// Raw value → number of rows dropped with it (`None` = empty cell).
    pub dropped: BTreeMap<Option<i64>, usize>,
}

impl Labeling {
    pub fn dropped_total(&self) -> usize {
        self.dropped.values().sum()
    }
}

/// Convert records to labeled examples using `column` and `mapping`.
///
/// The dataset is left untouched. Rows with an unmapped or missing value are
/// counted in [`Labeling::dropped`] and logged.
pub fn label_examples(
    dataset: &CommentDataset,
    column: &str,
    mapping: &LabelMapping,
) -> Result<Labeling> {
    if !dataset.has_column(column) {
        return Err(PrepError::MissingColumn {
            path: dataset
                .source
                .clone()
                .unwrap_or_else(|| "<in-memory dataset>".into()),
            column: column.to_string(),
        });
    }

    let mut labeling = Labeling::default();
    for record in &dataset.records {
        let raw = record.label(column).flatten();
        match raw.and_then(|value| mapping.map(value)) {
            Some(label) => labeling
                .examples
                .push(LabeledExample::new(record.comment_text.clone(), label)),
            None => *labeling.dropped.entry(raw).or_insert(0) += 1,
        }
    }

    if !labeling.dropped.is_empty() {
        warn!(
            "Dropped {} rows with unmapped '{column}' values: {}",
            labeling.dropped_total(),
            describe_dropped(&labeling.dropped)
        );
    }
    Ok(labeling)
}

fn describe_dropped(dropped: &BTreeMap<Option<i64>, usize>) -> String {
    dropped
        .iter()
        .map(|(value, count)| match value {
            Some(v) => format!("{v} ×{count}"),
            None => format!("<empty> ×{count}"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Undersample both classes to the size of the smaller one, then shuffle.
///
/// Each class is sampled without replacement. If either class is empty the
/// result is empty.
pub fn undersample<R: Rng + ?Sized>(
    examples: Vec<LabeledExample>,
    rng: &mut R,
) -> Vec<LabeledExample> {
    let (mut positive, mut negative): (Vec<_>, Vec<_>) = examples
        .into_iter()
        .partition(|ex| ex.label == Label::Positive);

    let min_length = positive.len().min(negative.len());
    debug!(
        "Undersampling {} positive / {} negative to {min_length} each",
        positive.len(),
        negative.len()
    );

    sample_in_place(&mut positive, min_length, rng);
    sample_in_place(&mut negative, min_length, rng);

    let mut output = positive;
    output.append(&mut negative);
    output.shuffle(rng);
    output
}

fn sample_in_place<T, R: Rng + ?Sized>(items: &mut Vec<T>, amount: usize, rng: &mut R) {
    items.shuffle(rng);
    items.truncate(amount);
}

/// Result of [`balance`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Balanced {
    pub examples: Vec<LabeledExample>,
    /// Class sizes before undersampling: `(negative, positive)`.
    pub available: (usize, usize),
    pub dropped: BTreeMap<Option<i64>, usize>,
}

/// Label, undersample, and shuffle a dataset.
pub fn balance<R: Rng + ?Sized>(
    dataset: &CommentDataset,
    column: &str,
    mapping: &LabelMapping,
    rng: &mut R,
) -> Result<Balanced> {
    let Labeling { examples, dropped } = label_examples(dataset, column, mapping)?;
    let available = class_counts(&examples);
    let examples = undersample(examples, rng);
    info!(
        "Balanced '{column}': {} negative / {} positive available, {} examples kept",
        available.0,
        available.1,
        examples.len()
    );
    Ok(Balanced {
        examples,
        available,
        dropped,
    })
}
