use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use trafficseg_cli::config::Config;
use trafficseg_cli::RunOutcome;

/// Segment a traffic count dataset into recurring traffic regimes
#[derive(Parser, Debug)]
#[command(name = "trafficseg", version)]
struct Args {
    /// JSON file with the traffic count intervals
    input: PathBuf,

    /// JSON run configuration, the six reference runs when absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory receiving the CSV files of every run
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };
    let dataset = trafficseg_datasets::from_path(&args.input)
        .with_context(|| format!("cannot load {}", args.input.display()))?;
    log::info!(
        "loaded {} intervals with {} samples",
        dataset.nintervals(),
        dataset.nsamples()
    );

    let outcomes = trafficseg_cli::run(&config, dataset.intervals(), &args.out)?;
    let failed = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, RunOutcome::Failed { .. }))
        .map(RunOutcome::name)
        .collect::<Vec<_>>();
    if !failed.is_empty() {
        log::warn!("{} of {} runs failed: {}", failed.len(), outcomes.len(), failed.join(", "));
    }

    Ok(())
}
