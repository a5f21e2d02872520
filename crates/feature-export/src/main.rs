use anyhow::Context;
use clap::Parser;
use data_validator::Validator;
use feature_export::{ExportSummary, FeatureExporter};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Build model-ready feature tables from raw trip CSVs.
#[derive(Parser, Debug)]
#[command(name = "trip-features", version, about)]
struct Args {
    /// Directory holding train.csv and test.csv
    #[arg(long)]
    input: PathBuf,
    /// Directory to write train.csv and test.csv into
    #[arg(long, default_value = "data/processed")]
    output: PathBuf,
    /// Fail on the first invalid row instead of skipping it
    #[arg(long)]
    strict: bool,
    /// Log level
    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    fs::create_dir_all(&args.output)
        .with_context(|| format!("cannot create {}", args.output.display()))?;

    let exporter = FeatureExporter::new(Validator::default(), args.strict);
    for name in ["train.csv", "test.csv"] {
        let summary = export_file(&exporter, &args.input.join(name), &args.output.join(name))?;
        info!(
            "{}: read {}, wrote {}, skipped {}",
            name, summary.rows_read, summary.rows_written, summary.rows_skipped
        );
    }
    Ok(())
}

fn export_file(
    exporter: &FeatureExporter,
    source: &Path,
    destination: &Path,
) -> anyhow::Result<ExportSummary> {
    let input = File::open(source).with_context(|| format!("cannot open {}", source.display()))?;
    let output = File::create(destination)
        .with_context(|| format!("cannot create {}", destination.display()))?;
    exporter
        .export(BufReader::new(input), BufWriter::new(output))
        .with_context(|| format!("export of {} failed", source.display()))
}
