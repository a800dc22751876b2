//! End-to-end run: preflight, resolve, download, merge, clean up.

use anyhow::{bail, Context, Result};
use chrono::Local;
use std::fs;
use std::path::PathBuf;

use crate::cleanup;
use crate::config::SvdlConfig;
use crate::coordinator::{self, TaskReport};
use crate::manifest;
use crate::merge;
use crate::progress::SegmentProgress;
use crate::retry::RetryPolicy;

/// Everything one run needs; derived from config, with CLI overrides applied
/// on top by the caller.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub workers: usize,
    pub tool: String,
    pub tmp_dir: PathBuf,
    pub out_dir: PathBuf,
    pub retry: RetryPolicy,
}

impl RunOptions {
    pub fn from_config(cfg: &SvdlConfig) -> Self {
        Self {
            workers: cfg.workers.max(1),
            tool: cfg.tool.clone(),
            tmp_dir: cfg.tmp_dir.clone(),
            out_dir: cfg.out_dir.clone(),
            retry: cfg.retry_policy(),
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_config(&SvdlConfig::default())
    }
}

fn download_failures(reports: &[TaskReport]) -> Vec<String> {
    reports
        .iter()
        .filter_map(|r| {
            r.result
                .as_ref()
                .err()
                .map(|e| format!("segment {} ({}): {}", r.index, r.url, e))
        })
        .collect()
}

/// Runs the whole pipeline for one manifest URL and returns the merged
/// output path.
///
/// Order of operations: tool preflight (fail fast before any transfer),
/// directory setup, manifest resolution, pooled downloads with an explicit
/// join of every task, then merge and cleanup. If any segment failed, the
/// merge is refused and the partial files are kept on disk so the next run
/// resumes them. Cleanup runs after the merge attempt whether it succeeded
/// or not.
pub fn run(
    manifest_url: &str,
    opts: &RunOptions,
    progress: Option<tokio::sync::mpsc::Sender<SegmentProgress>>,
) -> Result<PathBuf> {
    merge::preflight(&opts.tool)
        .with_context(|| format!("concat tool '{}' unusable", opts.tool))?;

    fs::create_dir_all(&opts.tmp_dir)
        .with_context(|| format!("create {}", opts.tmp_dir.display()))?;
    fs::create_dir_all(&opts.out_dir)
        .with_context(|| format!("create {}", opts.out_dir.display()))?;

    let started = Local::now();
    let tasks = manifest::resolve(manifest_url, &opts.tmp_dir)?;
    if tasks.is_empty() {
        bail!("manifest resolved to zero segments");
    }
    tracing::info!("resolved {} segment(s)", tasks.len());

    let reports =
        coordinator::download_all(tasks, opts.workers.max(1), opts.retry, progress);

    let failures = download_failures(&reports);
    if !failures.is_empty() {
        // Partial files stay in tmp_dir: a rerun resumes them from their
        // current size instead of starting over.
        bail!(
            "{} of {} segment(s) failed, merge refused; partial files kept in {}:\n  {}",
            failures.len(),
            reports.len(),
            opts.tmp_dir.display(),
            failures.join("\n  ")
        );
    }

    let segment_paths: Vec<PathBuf> = reports.into_iter().map(|r| r.path).collect();
    let output = merge::output_path(&opts.out_dir, started);

    let (list_path, merge_result) = match merge::write_list_file(&opts.tmp_dir, &segment_paths) {
        Ok(list) => {
            let res = merge::merge(&opts.tool, &list, &output);
            (Some(list), res)
        }
        Err(e) => (None, Err(e)),
    };

    let removed = cleanup::remove_run_files(&segment_paths, list_path.as_deref());
    tracing::debug!("removed {} intermediate file(s)", removed);

    merge_result.context("merge failed")?;
    tracing::info!("merged output at {}", output.display());
    Ok(output)
}
