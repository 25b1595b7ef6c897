//! icestack CLI — fetch the sea-ice radar feed and write the layer sequence.

use clap::Parser;
use std::path::PathBuf;

use icestack_core::capture::CaptureTime;
use icestack_core::job::{self, JobConfig};
use icestack_core::render::RenderConfig;
use icestack_core::timeline::{SequenceParams, Termination};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "icestack")]
#[command(
    about = "Assemble recent sea-ice radar captures into a fixed sequence of annotated map layers"
)]
#[command(version)]
struct Cli {
    /// Feed of timestamped radar capture references (JSON, newest first).
    #[arg(long, default_value = icestack_core::feed::DEFAULT_FEED_URL)]
    feed_url: String,

    /// Scratch directory for intermediate downloads.
    #[arg(long, env = "DATA_WORKING_DIRECTORY")]
    working_dir: PathBuf,

    /// Directory receiving the final layer images.
    #[arg(long, env = "DATA_TARGET_DIRECTORY")]
    target_dir: PathBuf,

    /// Path to write the scan report (JSON).
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    std::fs::create_dir_all(&cli.working_dir)?;
    std::fs::create_dir_all(&cli.target_dir)?;

    let config = JobConfig {
        feed_url: cli.feed_url,
        params: SequenceParams::default(),
        render: RenderConfig::new(cli.working_dir, cli.target_dir),
    };
    let now = CaptureTime::from_naive(chrono::Local::now().naive_local());

    let report = match job::run(&config, now) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Run aborted: {}", e);
            return Err(e.into());
        }
    };

    match report.termination {
        // The stale abort was already logged as an error by the scan.
        Termination::Stale => {}
        _ => tracing::info!(
            "Run complete: {} of {} slots filled.",
            report.slots.len(),
            config.params.max_layers
        ),
    }

    if let Some(path) = cli.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, &json)?;
        tracing::info!("Report written to {}", path.display());
    }

    Ok(())
}
