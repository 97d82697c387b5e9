use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};

use motion_pipeline::{
    AppError, Configuration, FrameDumpTarget, ImageSequenceSource, OrchestratorBuilder,
};

/// Detects motion between consecutive frames of an image sequence.
#[derive(Debug, Parser)]
#[command(name = "motion-pipeline", version)]
struct Cli {
    /// Directory of frames, read in file name order.
    #[arg(value_name = "SOURCE")]
    source: PathBuf,

    /// TOML configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn init_logging(level: Level) {
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() -> Result<ExitCode, AppError> {
    let cli = Cli::parse();
    let configuration = Configuration::load(cli.config.as_deref())?;
    init_logging(configuration.logging.max_level()?);

    let cancel_token = CancellationToken::new();
    let watcher_token = cancel_token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, stopping presentation");
                watcher_token.cancel();
            }
            Err(e) => warn!("Unable to listen for interrupts: {}", e),
        }
    });

    let source = ImageSequenceSource::new(&cli.source).with_rate(configuration.source.rate);
    let target = FrameDumpTarget::new(cancel_token)
        .output_dir(configuration.presentation.output_dir.clone())
        .pace(configuration.presentation.pace);

    let orchestrator = OrchestratorBuilder::new(configuration)
        .source(Box::new(source))
        .target(Box::new(target))
        .build()?;

    let report = orchestrator.run().await;
    report.log_summary();
    Ok(ExitCode::from(report.exit_code()))
}
