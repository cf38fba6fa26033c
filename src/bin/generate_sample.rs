//! Writes a small synthetic comment corpus shaped like the Jigsaw toxic
//! comment tables: `train.csv`, `train.parquet`, `test.csv`, `test_labels.csv`.
//!
//! Usage: `generate_sample [OUTPUT_DIR]` (defaults to `data`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const LABEL_COLUMNS: [&str; 6] = [
    "toxic",
    "severe_toxic",
    "obscene",
    "threat",
    "insult",
    "identity_hate",
];

const FRIENDLY: [&str; 6] = [
    "Thanks for fixing the citation in the history section, it reads much better now.",
    "I think the article would benefit from a short summary of the main arguments.",
    "Could you explain why the infobox was removed? I could not find the discussion.",
    "Great work on the references, the new sources are reliable and easy to check.",
    "Please have a look at the talk page before reverting the changes again.",
    "The photograph in the lead section is lovely, where was it taken?",
];

const HOSTILE: [&str; 5] = [
    "You are a complete idiot and everyone here is sick of your stupid edits.",
    "Stop vandalising this page, you pathetic loser, nobody wants you here.",
    "What a worthless moron, go crawl back under the rock you came from.",
    "Your edits are garbage and so are you, get lost and never come back.",
    "Only a brainless fool would write something this ignorant and hateful.",
];

const FOREIGN: [&str; 4] = [
    "Merci beaucoup pour la correction, l'article est beaucoup plus clair maintenant.",
    "Ich verstehe nicht, warum dieser Abschnitt gelöscht wurde, bitte erklären.",
    "Gracias por la ayuda, la sección de historia está mucho mejor así.",
    "Спасибо за исправление, теперь статья выглядит гораздо лучше.",
];

struct Row {
    id: String,
    text: String,
    labels: [i64; 6],
}

fn generate_rows(rng: &mut StdRng, n: usize, toxic_rate: f64, foreign_rate: f64) -> Vec<Row> {
    (0..n)
        .map(|i| {
            let toxic = rng.gen_bool(toxic_rate);
            let text = if rng.gen_bool(foreign_rate) {
                FOREIGN.choose(rng).copied().unwrap_or_default().to_string()
            } else if toxic {
                HOSTILE.choose(rng).copied().unwrap_or_default().to_string()
            } else {
                FRIENDLY.choose(rng).copied().unwrap_or_default().to_string()
            };
            let mut labels = [0i64; 6];
            if toxic {
                labels[0] = 1;
                for label in labels.iter_mut().skip(1) {
                    *label = i64::from(rng.gen_bool(0.3));
                }
            }
            Row {
                id: format!("{:016x}", rng.gen::<u64>() ^ i as u64),
                text,
                labels,
            }
        })
        .collect()
}

fn write_train_csv(path: &Path, rows: &[Row]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating train.csv")?;
    let mut header = vec!["id", "comment_text"];
    header.extend(LABEL_COLUMNS);
    writer.write_record(&header)?;
    for row in rows {
        let mut record = vec![row.id.clone(), row.text.clone()];
        record.extend(row.labels.iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_train_parquet(path: &Path, rows: &[Row]) -> Result<()> {
    let mut fields = vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("comment_text", DataType::Utf8, false),
    ];
    fields.extend(
        LABEL_COLUMNS
            .iter()
            .map(|name| Field::new(*name, DataType::Int64, false)),
    );
    let schema = Arc::new(Schema::new(fields));

    let mut columns: Vec<Arc<dyn arrow::array::Array>> = vec![
        Arc::new(StringArray::from(
            rows.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            rows.iter().map(|r| r.text.as_str()).collect::<Vec<_>>(),
        )),
    ];
    for idx in 0..LABEL_COLUMNS.len() {
        columns.push(Arc::new(Int64Array::from(
            rows.iter().map(|r| r.labels[idx]).collect::<Vec<_>>(),
        )));
    }

    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;
    let file = std::fs::File::create(path).context("creating train.parquet")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

/// `test.csv` carries only text; labels live in `test_labels.csv`, where
/// `-1` marks rows withheld from scoring.
fn write_test_tables(dir: &Path, rng: &mut StdRng, rows: &[Row]) -> Result<()> {
    let mut text_writer =
        csv::Writer::from_path(dir.join("test.csv")).context("creating test.csv")?;
    text_writer.write_record(["id", "comment_text"])?;

    let mut label_writer =
        csv::Writer::from_path(dir.join("test_labels.csv")).context("creating test_labels.csv")?;
    let mut header = vec!["id"];
    header.extend(LABEL_COLUMNS);
    label_writer.write_record(&header)?;

    for row in rows {
        text_writer.write_record([row.id.as_str(), row.text.as_str()])?;
        let labels: Vec<i64> = if rng.gen_bool(0.4) {
            vec![-1; LABEL_COLUMNS.len()]
        } else {
            row.labels.to_vec()
        };
        let mut record = vec![row.id.clone()];
        record.extend(labels.iter().map(|v| v.to_string()));
        label_writer.write_record(&record)?;
    }
    text_writer.flush()?;
    label_writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let mut rng = StdRng::seed_from_u64(42);
    let train = generate_rows(&mut rng, 500, 0.1, 0.05);
    let test = generate_rows(&mut rng, 200, 0.1, 0.05);

    write_train_csv(&out_dir.join("train.csv"), &train)?;
    write_train_parquet(&out_dir.join("train.parquet"), &train)?;
    write_test_tables(&out_dir, &mut rng, &test)?;

    println!(
        "Wrote {} training and {} test comments to {}",
        train.len(),
        test.len(),
        out_dir.display()
    );
    Ok(())
}
