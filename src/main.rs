use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use comment_prep::output::{write_examples, write_summary, OutputFormat};
use comment_prep::{DatasetPreparer, PrepReport, PrepareConfig};

#[derive(Parser)]
#[command(name = "comment-prep")]
#[command(about = "Filter, balance and split toxic-comment datasets", long_about = None)]
struct Cli {
    /// JSON config file (keys of PrepareConfig; missing keys keep defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding the source tables
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Seed for sampling and shuffling (unseeded runs differ every time)
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// Where prepared files are written
    #[arg(long, global = true, default_value = "prepared")]
    out: PathBuf,
    /// Output format: csv or jsonl
    #[arg(long, global = true, default_value = "csv")]
    format: OutputFormat,
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Balanced primary table split 90/10 into train and validation
    TrainVal,
    /// Balanced test table, unsplit
    Test,
    /// Secondary text table joined with its label table (-1 → 1, 0 → 0)
    Secondary,
}

#[derive(Serialize)]
struct Summary<'a> {
    command: &'a str,
    seed: Option<u64>,
    files: Vec<PathBuf>,
    report: PrepReport,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut config = match &cli.config {
        Some(path) => PrepareConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PrepareConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    let preparer = DatasetPreparer::new(config).context("invalid configuration")?;
    let mut rng = preparer.config().rng();

    let (command, files, report) = match cli.command {
        Commands::TrainVal => {
            let (split, report) = preparer
                .prepare_train_validation(&mut rng)
                .context("preparing train/validation data")?;
            let files = vec![
                write_examples(&cli.out, "train", &split.train, cli.format)?,
                write_examples(&cli.out, "validation", &split.validation, cli.format)?,
            ];
            ("train-val", files, report)
        }
        Commands::Test => {
            let (examples, report) = preparer
                .prepare_test(&mut rng)
                .context("preparing test data")?;
            let files = vec![write_examples(&cli.out, "test", &examples, cli.format)?];
            ("test", files, report)
        }
        Commands::Secondary => {
            let (examples, report) = preparer
                .prepare_secondary_train(&mut rng)
                .context("preparing secondary training data")?;
            let files = vec![write_examples(&cli.out, "secondary_train", &examples, cli.format)?];
            ("secondary", files, report)
        }
    };

    let balanced = report.balanced;
    let summary = Summary {
        command,
        seed: preparer.config().seed,
        files,
        report,
    };
    let summary_path = write_summary(&cli.out, &summary)?;

    println!(
        "{command}: {balanced} balanced examples written to {} (summary: {})",
        cli.out.display(),
        summary_path.display()
    );
    Ok(())
}
