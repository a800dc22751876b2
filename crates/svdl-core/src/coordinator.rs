//! Bounded worker pool over segment fetches.
//!
//! Workers pull tasks from a shared queue in submission order, run the
//! fetcher with retry, and report per-task results over a channel. Every
//! worker is joined before this function returns, so the merge step can
//! never observe a file that is still being written. Reports come back
//! sorted by ascending task index regardless of completion order.

use crate::fetcher;
use crate::manifest::SegmentTask;
use crate::progress::SegmentProgress;
use crate::retry::{classify, run_with_retry, FetchError, RetryPolicy};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

/// Default number of concurrent segment downloads.
pub const DEFAULT_WORKERS: usize = 5;

/// Outcome of one segment task: the task identity plus an explicit result.
/// A failed segment is reported, never inferred from file existence.
#[derive(Debug)]
pub struct TaskReport {
    pub index: usize,
    pub url: String,
    pub path: PathBuf,
    /// Final on-disk size on success; the last error once retries are exhausted.
    pub result: Result<u64, FetchError>,
}

impl TaskReport {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Downloads all tasks with at most `workers` concurrent transfers.
///
/// Always returns one report per task, ordered by ascending index. Per-task
/// failures are carried in the reports; the caller decides whether the run
/// may proceed to the merge.
pub fn download_all(
    tasks: Vec<SegmentTask>,
    workers: usize,
    policy: RetryPolicy,
    progress: Option<tokio::sync::mpsc::Sender<SegmentProgress>>,
) -> Vec<TaskReport> {
    let count = tasks.len();
    if count == 0 {
        return Vec::new();
    }

    let work: Arc<Mutex<VecDeque<SegmentTask>>> = Arc::new(Mutex::new(tasks.into_iter().collect()));
    let (tx, rx) = mpsc::channel();
    let num_workers = workers.max(1).min(count);
    let mut handles = Vec::with_capacity(num_workers);
    for _ in 0..num_workers {
        let work = Arc::clone(&work);
        let tx = tx.clone();
        let progress = progress.clone();
        handles.push(std::thread::spawn(move || loop {
            let task = match work.lock().unwrap().pop_front() {
                Some(t) => t,
                None => break,
            };
            let result = run_with_retry(&policy, classify, || {
                fetcher::fetch_segment(&task.url, &task.path, task.index, progress.as_ref())
            });
            if let Err(e) = &result {
                tracing::warn!(index = task.index, "segment download failed: {}", e);
            }
            let _ = tx.send(TaskReport {
                index: task.index,
                url: task.url,
                path: task.path,
                result,
            });
        }));
    }
    drop(tx);

    let mut reports: Vec<TaskReport> = Vec::with_capacity(count);
    for _ in 0..count {
        let report = rx.recv().expect("worker result");
        reports.push(report);
    }
    for h in handles {
        h.join()
            .unwrap_or_else(|e| panic!("worker panicked: {:?}", e));
    }

    reports.sort_by_key(|r| r.index);
    reports
}
