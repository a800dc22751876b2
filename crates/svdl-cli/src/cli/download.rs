//! The one command svdl has: prompt for the manifest URL if needed, run the
//! pipeline on a blocking task, and render download progress meanwhile.

use anyhow::{bail, Context, Result};
use std::io::{self, BufRead, Write};
use std::time::Instant;
use svdl_core::config::SvdlConfig;
use svdl_core::pipeline::{self, RunOptions};
use svdl_core::progress::{ProgressTracker, SegmentProgress};

use super::Cli;

const PROGRESS_INTERVAL_MS: u128 = 250;

pub async fn run_download(cli: Cli, cfg: &SvdlConfig) -> Result<()> {
    let url = match cli.url {
        Some(u) => u,
        None => prompt_url()?,
    };

    let mut opts = RunOptions::from_config(cfg);
    if let Some(workers) = cli.workers {
        opts.workers = workers.max(1);
    }

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<SegmentProgress>(256);
    let printer = tokio::spawn(async move {
        let mut tracker = ProgressTracker::default();
        let mut last_print = Instant::now();
        while let Some(ev) = progress_rx.recv().await {
            tracker.update(&ev);
            if last_print.elapsed().as_millis() >= PROGRESS_INTERVAL_MS {
                print!("\r  {}  ", render_progress(&tracker));
                let _ = io::stdout().flush();
                last_print = Instant::now();
            }
        }
        println!();
    });

    let run_url = url.clone();
    let result = tokio::task::spawn_blocking(move || pipeline::run(&run_url, &opts, Some(progress_tx)))
        .await
        .context("download task join")?;
    let _ = printer.await;

    let output = result?;
    println!("Merged output: {}", output.display());
    Ok(())
}

fn prompt_url() -> Result<String> {
    print!("Manifest URL: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read manifest URL from stdin")?;
    let url = line.trim().to_string();
    if url.is_empty() {
        bail!("no manifest URL given");
    }
    Ok(url)
}

fn render_progress(tracker: &ProgressTracker) -> String {
    let done_mib = tracker.bytes_done() as f64 / 1_048_576.0;
    let rate_mib = tracker.bytes_per_sec() / 1_048_576.0;
    match (tracker.total_bytes(), tracker.fraction()) {
        (Some(total), Some(fraction)) => {
            let total_mib = total as f64 / 1_048_576.0;
            format!(
                "{:.1} / {:.1} MiB ({:.1}%)  {} segment(s)  {:.2} MiB/s",
                done_mib,
                total_mib,
                fraction * 100.0,
                tracker.segments_seen(),
                rate_mib
            )
        }
        _ => format!(
            "{:.1} MiB  {} segment(s)  {:.2} MiB/s",
            done_mib,
            tracker.segments_seen(),
            rate_mib
        ),
    }
}
