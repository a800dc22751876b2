//! Logging init: file under XDG state dir, or graceful fallback to stderr.

use anyhow::Result;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Per-event writer: a clone of the log file, or stderr when cloning fails.
struct LogWriter(Option<fs::File>);

impl io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.0 {
            Some(f) => f.write(buf),
            None => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.0 {
            Some(f) => f.flush(),
            None => io::stderr().lock().flush(),
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,svdl_core=debug,svdl_cli=debug"))
}

/// Initialize structured logging to `~/.local/state/svdl/svdl.log`.
/// On failure (e.g. log dir unwritable), returns Err before installing any
/// global subscriber so the caller can fall back to stderr.
pub fn init_logging() -> Result<()> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("svdl")?;
    let log_dir = xdg_dirs.get_state_home().join("svdl");

    fs::create_dir_all(&log_dir)?;
    let log_file_path: PathBuf = log_dir.join("svdl.log");

    let file = Arc::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file_path)?,
    );

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(move || LogWriter(file.try_clone().ok()))
        .with_ansi(false)
        .init();

    tracing::info!("svdl logging initialized at {}", log_file_path.display());

    Ok(())
}

/// Initialize logging to stderr only (no file). Use when init_logging() fails
/// so the CLI doesn't crash.
pub fn init_logging_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}
