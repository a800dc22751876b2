//! Removal of per-run intermediate files (segments + concat list).

use std::fs;
use std::path::{Path, PathBuf};

/// Deletes every segment file that exists, then the list file if present.
/// A path that never existed is not an error. A filesystem refusal is logged
/// and skipped rather than aborting the run: at this point the merge outcome
/// is already decided and leftover temp files are only clutter.
/// Returns the number of files actually removed.
pub fn remove_run_files(segment_paths: &[PathBuf], list_file: Option<&Path>) -> usize {
    let mut removed = 0usize;
    let all = segment_paths.iter().map(PathBuf::as_path).chain(list_file);
    for path in all {
        match fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("could not remove {}: {}", path.display(), e),
        }
    }
    removed
}
