//! Error types for dataset preparation.
//!
//! Only source-level failures surface here. Per-row language detection
//! failures never become a `PrepError`; they exclude the row instead.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors raised while loading or preparing a dataset.
#[derive(Error, Debug)]
pub enum PrepError {
    /// Source table does not exist.
    #[error("source table not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// Any other I/O failure on a source or output file.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An expected column is absent from the source table.
    #[error("{}: missing required column '{column}'", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    /// A label cell holds something other than an integer.
    #[error("{}: row {row}, column '{column}': '{value}' is not an integer label", .path.display())]
    InvalidLabel {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
    },

    /// Two tables joined by row position have different lengths.
    #[error("{} has {text_rows} rows but label table {} has {label_rows}", .text_path.display(), .label_path.display())]
    LengthMismatch {
        text_path: PathBuf,
        label_path: PathBuf,
        text_rows: usize,
        label_rows: usize,
    },

    /// The source parses but its shape or column types are unusable.
    #[error("{}: {reason}", .path.display())]
    MalformedTable { path: PathBuf, reason: String },

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    /// Invalid preparation settings.
    #[error("configuration error: {0}")]
    Config(String),
}

impl PrepError {
    /// Map an `io::Error` on `path`, keeping "file not found" distinct.
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            PrepError::NotFound { path }
        } else {
            PrepError::Io { path, source }
        }
    }

    /// Whether this is a schema problem (as opposed to I/O or config).
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            PrepError::MissingColumn { .. }
                | PrepError::InvalidLabel { .. }
                | PrepError::LengthMismatch { .. }
                | PrepError::MalformedTable { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PrepError>;
