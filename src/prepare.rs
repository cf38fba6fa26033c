//! The three dataset loaders: load → language filter → balance → shuffle.

use std::collections::BTreeMap;
use std::path::PathBuf;

use log::info;
use rand::Rng;
use serde::Serialize;

use crate::config::PrepareConfig;
use crate::data::balance::{balance, LabelMapping};
use crate::data::filter::{FilterReport, LanguageFilter, LanguageIdentifier, WhatlangIdentifier};
use crate::data::loader::{load_comments, load_joined, TableSpec};
use crate::data::model::{into_arrays, CommentDataset, LabeledExample, Split};
use crate::data::split::train_validation_split;
use crate::error::Result;

/// Column name the secondary loader stores the joined labels under.
const JOINED_LABEL_COLUMN: &str = "label";

/// What happened to the rows of one load.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PrepReport {
    pub sources: Vec<PathBuf>,
    pub source_rows: usize,
    pub kept_by_language: usize,
    pub excluded_empty: usize,
    pub excluded_malformed_encoding: usize,
    pub excluded_undetermined: usize,
    pub excluded_other_language: usize,
    pub excluded_detector_failure: usize,
    /// Raw label value → rows dropped because it maps to no class.
    pub dropped_labels: BTreeMap<String, usize>,
    pub available_negative: usize,
    pub available_positive: usize,
    pub balanced: usize,
}

impl PrepReport {
    fn new(sources: Vec<PathBuf>, source_rows: usize, filter: &FilterReport) -> Self {
        PrepReport {
            sources,
            source_rows,
            kept_by_language: filter.kept,
            excluded_empty: filter.empty,
            excluded_malformed_encoding: filter.malformed,
            excluded_undetermined: filter.undetermined,
            excluded_other_language: filter.rejected,
            excluded_detector_failure: filter.unavailable,
            ..Default::default()
        }
    }
}

/// Prepares balanced, language-filtered example sets from comment tables.
#[derive(Debug)]
pub struct DatasetPreparer {
    config: PrepareConfig,
    filter: LanguageFilter,
}

impl DatasetPreparer {
    /// Preparer using the `whatlang` identifier.
    pub fn new(config: PrepareConfig) -> Result<Self> {
        Self::with_identifier(config, WhatlangIdentifier)
    }

    pub fn with_identifier(
        config: PrepareConfig,
        identifier: impl LanguageIdentifier + 'static,
    ) -> Result<Self> {
        config.validate()?;
        let filter = LanguageFilter::new(identifier, &config.target_language)
            .with_min_confidence(config.min_confidence);
        Ok(DatasetPreparer { config, filter })
    }

    pub fn config(&self) -> &PrepareConfig {
        &self.config
    }

    /// Primary table, balanced on the label column, split into train and
    /// validation.
    pub fn prepare_train_validation<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<(Split, PrepReport)> {
        let path = self.config.train_path();
        let dataset = load_comments(&path, &self.primary_spec())?;
        let (examples, report) = self.filter_and_balance(
            vec![path],
            dataset,
            &self.config.label_column,
            &LabelMapping::binary(),
            rng,
        )?;
        let split = train_validation_split(examples, self.config.validation_fraction, rng)?;
        info!(
            "Train/validation: {} train, {} validation",
            split.train.len(),
            split.validation.len()
        );
        Ok((split, report))
    }

    /// Test table, balanced on the label column; no further split.
    pub fn prepare_test<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<(Vec<LabeledExample>, PrepReport)> {
        let path = self.config.test_path();
        if path == self.config.train_path() {
            info!(
                "Test loader reads the same table as the train loader ({})",
                path.display()
            );
        }
        let dataset = load_comments(&path, &self.primary_spec())?;
        self.filter_and_balance(
            vec![path],
            dataset,
            &self.config.label_column,
            &LabelMapping::binary(),
            rng,
        )
    }

    /// Secondary text table joined with its label table by row position.
    /// `-1` becomes positive, `0` negative, anything else is dropped.
    pub fn prepare_secondary_train<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<(Vec<LabeledExample>, PrepReport)> {
        let text_path = self.config.test_text_path();
        let label_path = self.config.test_labels_path();
        let dataset = load_joined(
            &text_path,
            &self.config.text_column,
            &label_path,
            &self.config.label_column,
            JOINED_LABEL_COLUMN,
        )?;
        self.filter_and_balance(
            vec![text_path, label_path],
            dataset,
            JOINED_LABEL_COLUMN,
            &LabelMapping::withheld_as_positive(),
            rng,
        )
    }

    /// `(X_train, X_val, y_train, y_val)`.
    pub fn load_train_validation<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<(Vec<String>, Vec<String>, Vec<u8>, Vec<u8>)> {
        Ok(self.prepare_train_validation(rng)?.0.into_arrays())
    }

    /// `(texts, labels)` from the test table.
    pub fn load_test<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(Vec<String>, Vec<u8>)> {
        Ok(into_arrays(self.prepare_test(rng)?.0))
    }

    /// `(texts, labels)` from the secondary source.
    pub fn load_secondary_train<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<(Vec<String>, Vec<u8>)> {
        Ok(into_arrays(self.prepare_secondary_train(rng)?.0))
    }

    fn primary_spec(&self) -> TableSpec {
        TableSpec::new(&self.config.text_column, &[self.config.label_column.as_str()])
    }

    fn filter_and_balance<R: Rng + ?Sized>(
        &self,
        sources: Vec<PathBuf>,
        dataset: CommentDataset,
        column: &str,
        mapping: &LabelMapping,
        rng: &mut R,
    ) -> Result<(Vec<LabeledExample>, PrepReport)> {
        let source_rows = dataset.len();
        let (kept, filter_report) = self.filter.apply(&dataset);
        let balanced = balance(&kept, column, mapping, rng)?;

        let mut report = PrepReport::new(sources, source_rows, &filter_report);
        report.dropped_labels = balanced
            .dropped
            .iter()
            .map(|(value, count)| {
                let key = value.map_or_else(|| "empty".to_string(), |v| v.to_string());
                (key, *count)
            })
            .collect();
        report.available_negative = balanced.available.0;
        report.available_positive = balanced.available.1;
        report.balanced = balanced.examples.len();
        Ok((balanced.examples, report))
    }
}
