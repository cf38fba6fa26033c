use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{PrepError, Result};

/// Source tables and preparation settings.
///
/// Every field has a default, so a config file only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepareConfig {
    pub data_dir: PathBuf,
    /// Primary labeled table (train/validation loader).
    pub train_file: String,
    /// Table read by the test loader.
    pub test_file: String,
    /// Unlabeled text table for the secondary-source loader.
    pub test_text_file: String,
    /// Label table aligned by row with `test_text_file`.
    pub test_labels_file: String,
    pub text_column: String,
    pub label_column: String,
    pub target_language: String,
    pub min_confidence: f64,
    pub validation_fraction: f64,
    /// Fixed seed for sampling and shuffling; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            train_file: "train.csv".to_string(),
            test_file: "train.csv".to_string(),
            test_text_file: "test.csv".to_string(),
            test_labels_file: "test_labels.csv".to_string(),
            text_column: "comment_text".to_string(),
            label_column: "toxic".to_string(),
            target_language: "en".to_string(),
            min_confidence: 0.0,
            validation_fraction: 0.1,
            seed: None,
        }
    }
}

impl PrepareConfig {
    /// Read a JSON config file and validate it.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| PrepError::from_io(path, e))?;
        let config: PrepareConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.validation_fraction > 0.0 && self.validation_fraction < 1.0) {
            return Err(PrepError::Config(format!(
                "validation_fraction must be in (0, 1), got {}",
                self.validation_fraction
            )));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(PrepError::Config(format!(
                "min_confidence must be in [0, 1], got {}",
                self.min_confidence
            )));
        }
        for (name, value) in [
            ("text_column", &self.text_column),
            ("label_column", &self.label_column),
            ("target_language", &self.target_language),
        ] {
            if value.trim().is_empty() {
                return Err(PrepError::Config(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }

    pub fn train_path(&self) -> PathBuf {
        self.data_dir.join(&self.train_file)
    }

    pub fn test_path(&self) -> PathBuf {
        self.data_dir.join(&self.test_file)
    }

    pub fn test_text_path(&self) -> PathBuf {
        self.data_dir.join(&self.test_text_file)
    }

    pub fn test_labels_path(&self) -> PathBuf {
        self.data_dir.join(&self.test_labels_file)
    }

    /// Random source for one run: seeded when `seed` is set.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}
