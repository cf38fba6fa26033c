use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::info;
use serde::Serialize;

use crate::data::model::LabeledExample;
use crate::error::{PrepError, Result};

/// On-disk format for prepared examples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// `text,label` with a header row.
    #[default]
    Csv,
    /// One `{"text": ..., "label": ...}` object per line.
    JsonLines,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::JsonLines => "jsonl",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "jsonl" | "json-lines" | "ndjson" => Ok(OutputFormat::JsonLines),
            other => Err(format!("unknown output format '{other}' (expected csv or jsonl)")),
        }
    }
}

/// Write `examples` to `<dir>/<name>.<ext>` and return the file path.
pub fn write_examples(
    dir: &Path,
    name: &str,
    examples: &[LabeledExample],
    format: OutputFormat,
) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| PrepError::from_io(dir, e))?;
    let path = dir.join(format!("{name}.{}", format.extension()));
    let file = File::create(&path).map_err(|e| PrepError::from_io(&path, e))?;

    match format {
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(file);
            for example in examples {
                writer.serialize(example)?;
            }
            writer.flush().map_err(|e| PrepError::from_io(&path, e))?;
        }
        OutputFormat::JsonLines => {
            let mut writer = BufWriter::new(file);
            for example in examples {
                serde_json::to_writer(&mut writer, example)?;
                writer.write_all(b"\n").map_err(|e| PrepError::from_io(&path, e))?;
            }
            writer.flush().map_err(|e| PrepError::from_io(&path, e))?;
        }
    }

    info!("Wrote {} examples to {}", examples.len(), path.display());
    Ok(path)
}

/// Pretty-printed JSON summary next to the example files.
pub fn write_summary<T: Serialize>(dir: &Path, summary: &T) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| PrepError::from_io(dir, e))?;
    let path = dir.join("summary.json");
    let text = serde_json::to_string_pretty(summary)?;
    fs::write(&path, text).map_err(|e| PrepError::from_io(&path, e))?;
    Ok(path)
}
