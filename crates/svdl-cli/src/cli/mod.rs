//! CLI for the svdl segmented video downloader.

mod download;

use anyhow::Result;
use clap::Parser;
use svdl_core::config;

/// svdl: fetch a segmented video manifest, download every part with resume,
/// and merge them into one file with the configured concat tool.
#[derive(Debug, Parser)]
#[command(name = "svdl")]
#[command(about = "Segmented video downloader/merger", long_about = None)]
pub struct Cli {
    /// Manifest URL. Prompted for on stdin when omitted.
    pub url: Option<String>,

    /// Number of concurrent segment downloads (overrides config).
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,
}

pub async fn run_from_args() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_or_init()?;
    tracing::debug!("loaded config: {:?}", cfg);
    download::run_download(cli, &cfg).await
}
