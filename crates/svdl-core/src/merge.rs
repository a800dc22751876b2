//! Stream-copy concatenation via the external tool (ffmpeg).
//!
//! Writes a run-scoped concat list file, then invokes
//! `<tool> -f concat -safe 0 -i <list> -c copy <output>`. No re-encode path
//! exists: a failing or missing tool is fatal for the run.

use chrono::{DateTime, Local};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

/// How many trailing bytes of tool stderr to keep in an error.
const STDERR_TAIL: usize = 2048;

#[derive(Debug, Error)]
pub enum MergeError {
    /// The tool could not be started at all (missing binary, not executable).
    #[error("cannot run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    /// The tool ran but exited non-zero.
    #[error("{tool} {status}: {stderr}")]
    Failed {
        tool: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    /// Writing the concat list file failed.
    #[error("concat list file: {0}")]
    ListFile(#[from] std::io::Error),
}

/// Checks that the concat tool is present and runnable (`<tool> -version`
/// exits 0). Called before any download work so a missing tool fails the run
/// immediately instead of after gigabytes of transfer.
pub fn preflight(tool: &str) -> Result<(), MergeError> {
    let status = Command::new(tool)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|source| MergeError::Spawn {
            tool: tool.to_string(),
            source,
        })?;
    if !status.success() {
        return Err(MergeError::Failed {
            tool: tool.to_string(),
            status,
            stderr: String::new(),
        });
    }
    Ok(())
}

/// Output path for a run started at `started`:
/// `<out_dir>/output_<YYYYMMDD-HHMMSS>.mp4`. The sortable timestamp keeps
/// repeated runs from overwriting each other.
pub fn output_path(out_dir: &Path, started: DateTime<Local>) -> PathBuf {
    out_dir.join(format!("output_{}.mp4", started.format("%Y%m%d-%H%M%S")))
}

/// Escape a path for ffmpeg's concat demuxer list format: the whole path is
/// single-quoted, and embedded single quotes become `'\''`.
fn escape_concat_path(path: &str) -> String {
    path.replace('\'', r"'\''")
}

/// Writes the ordered segment paths to a uniquely named list file in `dir`
/// (one `file '<path>'` line each) and returns its path.
///
/// Paths are canonicalized first: the concat demuxer resolves relative paths
/// against the list file's directory, not the working directory. The list
/// file is run-scoped, so concurrent runs never clobber each other.
pub fn write_list_file(dir: &Path, segment_paths: &[PathBuf]) -> Result<PathBuf, MergeError> {
    let mut file = tempfile::Builder::new()
        .prefix("filelist_")
        .suffix(".txt")
        .tempfile_in(dir)?;
    for p in segment_paths {
        let abs = std::fs::canonicalize(p)?;
        writeln!(
            file,
            "file '{}'",
            escape_concat_path(&abs.to_string_lossy())
        )?;
    }
    file.flush()?;
    let (_, path) = file.keep().map_err(|e| MergeError::ListFile(e.error))?;
    Ok(path)
}

/// Runs the concat tool over `list_path`, producing `output`.
/// Stream copy only; a non-zero exit is fatal and carries the stderr tail.
pub fn merge(tool: &str, list_path: &Path, output: &Path) -> Result<(), MergeError> {
    tracing::info!("merging into {}", output.display());
    let out = Command::new(tool)
        .args(["-f", "concat", "-safe", "0", "-i"])
        .arg(list_path)
        .args(["-c", "copy"])
        .arg(output)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| MergeError::Spawn {
            tool: tool.to_string(),
            source,
        })?;
    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr).into_owned();
        let tail_start = stderr
            .char_indices()
            .rev()
            .nth(STDERR_TAIL.saturating_sub(1))
            .map(|(i, _)| i)
            .unwrap_or(0);
        return Err(MergeError::Failed {
            tool: tool.to_string(),
            status: out.status,
            stderr: stderr[tail_start..].trim().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn output_path_embeds_sortable_timestamp() {
        let started = Local.with_ymd_and_hms(2024, 3, 7, 16, 5, 9).unwrap();
        let p = output_path(Path::new("out"), started);
        assert_eq!(p, PathBuf::from("out/output_20240307-160509.mp4"));
    }

    #[test]
    fn escape_quotes_for_concat_list() {
        assert_eq!(escape_concat_path("tmp/temp_0.mp4"), "tmp/temp_0.mp4");
        assert_eq!(escape_concat_path("a'b.mp4"), r"a'\''b.mp4");
    }

    #[test]
    fn list_file_holds_one_quoted_absolute_path_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("temp_0.mp4");
        let b = dir.path().join("temp_1.mp4");
        std::fs::write(&a, b"aa").unwrap();
        std::fs::write(&b, b"bb").unwrap();

        let list = write_list_file(dir.path(), &[a.clone(), b.clone()]).unwrap();
        assert!(list.starts_with(dir.path()));
        let content = std::fs::read_to_string(&list).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let abs_a = std::fs::canonicalize(&a).unwrap();
        let abs_b = std::fs::canonicalize(&b).unwrap();
        assert_eq!(lines[0], format!("file '{}'", abs_a.display()));
        assert_eq!(lines[1], format!("file '{}'", abs_b.display()));
    }

    #[test]
    fn list_files_are_run_scoped() {
        let dir = tempfile::tempdir().unwrap();
        let seg = dir.path().join("temp_0.mp4");
        std::fs::write(&seg, b"x").unwrap();
        let l1 = write_list_file(dir.path(), std::slice::from_ref(&seg)).unwrap();
        let l2 = write_list_file(dir.path(), std::slice::from_ref(&seg)).unwrap();
        assert_ne!(l1, l2);
    }

    #[test]
    fn preflight_missing_tool_is_spawn_error() {
        let err = preflight("/nonexistent/definitely-not-ffmpeg").unwrap_err();
        assert!(matches!(err, MergeError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn preflight_accepts_tool_that_exits_zero() {
        // `true` ignores its arguments and exits 0.
        preflight("true").unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn merge_nonzero_exit_is_failed() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("list.txt");
        std::fs::write(&list, "").unwrap();
        let err = merge("false", &list, &dir.path().join("out.mp4")).unwrap_err();
        assert!(matches!(err, MergeError::Failed { .. }));
    }
}
