use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use sec_eval_core::{
    batch, BatchSummary, ConfigLoader, DockerRuntime, EvalConfig, Evaluator,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Extra headroom on the Docker client timeout beyond the container budget,
/// so the outer wait timeout always fires first.
const CLIENT_TIMEOUT_SLACK: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[clap(
    name = "sec-eval",
    author,
    version = "0.1.0",
    about = "Evaluation runner for patch application and PoC reproduction"
)]
struct Cli {
    #[clap(
        long,
        help = "Path to the output.jsonl file containing git_patch and instance_id for patch evaluation"
    )]
    input_file: PathBuf,

    #[clap(long, help = "Report path (defaults to report.jsonl next to the input file)")]
    output: Option<PathBuf>,

    #[clap(long, short, help = "YAML configuration file with evaluation settings")]
    config: Option<PathBuf>,

    #[clap(
        long,
        help = "Also accept runs that reached the PoC step without a sanitizer report"
    )]
    generous: bool,

    #[clap(long, help = "Number of instances evaluated concurrently")]
    workers: Option<usize>,

    #[clap(long, short, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level_filter = cli.log_level.parse().unwrap_or(LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(log_level_filter)
        .init();

    if let Err(e) = run(cli).await {
        log::error!("Error during patch evaluation: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli).await?;
    log::info!(
        "Evaluating with {} worker(s) in {} mode",
        config.workers,
        if config.generous { "generous" } else { "strict" }
    );

    let records = batch::read_records(&cli.input_file).await?;
    log::info!(
        "Loaded {} record(s) from {}",
        records.len(),
        cli.input_file.display()
    );

    let runtime = DockerRuntime::new(config.outer_timeout() + config.stop_grace() + CLIENT_TIMEOUT_SLACK)
        .context("Failed to connect to Docker")?;
    let evaluator = Evaluator::new(Arc::new(runtime), &config);

    let verdicts = evaluator.evaluate_batch(&records).await;

    let report_path = cli
        .output
        .clone()
        .unwrap_or_else(|| batch::default_report_path(&cli.input_file));
    batch::write_report(&report_path, &verdicts).await?;

    let summary = BatchSummary::from_verdicts(&verdicts);
    log::info!(
        "Wrote {} verdict(s) to {} ({} passed, {} failed)",
        summary.total,
        report_path.display(),
        summary.passed,
        summary.failed
    );
    Ok(())
}

async fn load_config(cli: &Cli) -> Result<EvalConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            log::info!("Loading configuration from file: {}", path.display());
            ConfigLoader::from_file(path).await?
        }
        None => ConfigLoader::from_env()?,
    };

    if cli.generous {
        config.generous = true;
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    config.validate()?;
    Ok(config)
}
