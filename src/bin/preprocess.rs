use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use house_price_api::data::{preprocess, CleaningPolicy};
use house_price_api::{telemetry, Config};

#[derive(Parser)]
#[command(name = "preprocess")]
#[command(about = "Cleans the raw house dataset before model training")]
struct Cli {
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Raw CSV; defaults to `preprocessing.input_path`.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Destination CSV; defaults to `preprocessing.output_path`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Column left untouched by every cleaning step.
    #[arg(short, long)]
    target: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    telemetry::init(&config.logging);

    let input = cli.input.unwrap_or(config.preprocessing.input_path);
    let output = cli.output.unwrap_or(config.preprocessing.output_path);
    let policy = CleaningPolicy {
        target_column: cli.target.unwrap_or(config.preprocessing.target_column),
    };

    let report = preprocess(&input, &output, &policy)?;
    info!(
        "Dropped columns: {:?}, encoded columns: {:?}, rows {} -> {}",
        report.dropped_columns,
        report.encoded_columns,
        report.input_shape.0,
        report.output_shape.0
    );

    Ok(())
}
