//! Resumable single-segment download: open-ended Range GET appended to the
//! local file.
//!
//! The resume offset is simply the current size of the local file; no
//! separate checkpoint state is kept. Response chunks are streamed to disk
//! as they arrive, so a segment of any size uses constant memory. Partial
//! data is never deleted between attempts.

use crate::progress::SegmentProgress;
use crate::retry::FetchError;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::str;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Result of a single segment fetch attempt, carrying the final on-disk size.
pub type FetchResult = Result<u64, FetchError>;

/// Bytes already present at `path` (0 if the file does not exist).
/// Used as the starting offset for the range request.
pub fn resume_offset(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Downloads `url` to `path`, resuming from whatever is already on disk.
///
/// Issues `Range: bytes=<offset>-` and appends the body chunk-by-chunk.
/// A 416 answer to a non-zero offset means the file is already complete and
/// is treated as success. A 200 answer to a non-zero offset means the server
/// ignored the range; the transfer is aborted before any byte is appended.
/// Progress events (tagged with `index`) are emitted on `progress` when set;
/// the expected total is offset + Content-Length, or unknown when the server
/// does not report a length.
pub fn fetch_segment(
    url: &str,
    path: &Path,
    index: usize,
    progress: Option<&tokio::sync::mpsc::Sender<SegmentProgress>>,
) -> FetchResult {
    let offset = resume_offset(path);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(FetchError::Storage)?;

    let status = Arc::new(AtomicU32::new(0));
    let content_length: Arc<Mutex<Option<u64>>> = Arc::new(Mutex::new(None));
    let bytes_written = Arc::new(AtomicU64::new(0));
    let range_ignored = Arc::new(AtomicBool::new(false));
    let storage_error: Arc<Mutex<Option<std::io::Error>>> = Arc::new(Mutex::new(None));

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(FetchError::Curl)?;
    easy.follow_location(true).map_err(FetchError::Curl)?;
    easy.max_redirections(10).map_err(FetchError::Curl)?;
    easy.connect_timeout(Duration::from_secs(30))
        .map_err(FetchError::Curl)?;
    // Prefer low-speed timeout: abort if throughput drops below 1 KiB/s for 60s.
    // Keeps large segments on slow links from being killed by a hard wall-clock timeout.
    easy.low_speed_limit(1024).map_err(FetchError::Curl)?;
    easy.low_speed_time(Duration::from_secs(60))
        .map_err(FetchError::Curl)?;
    // Safety net: hard timeout after 1 hour so a completely stuck transfer eventually fails.
    easy.timeout(Duration::from_secs(3600))
        .map_err(FetchError::Curl)?;

    // Open-ended range from the resume offset. Sent even at offset 0 so the
    // server's range support is exercised consistently.
    easy.range(&format!("{}-", offset))
        .map_err(FetchError::Curl)?;

    {
        let status_hdr = Arc::clone(&status);
        let content_length_hdr = Arc::clone(&content_length);
        let status_body = Arc::clone(&status);
        let content_length_body = Arc::clone(&content_length);
        let bytes_written_body = Arc::clone(&bytes_written);
        let range_ignored_body = Arc::clone(&range_ignored);
        let storage_error_body = Arc::clone(&storage_error);
        let progress = progress.cloned();
        let mut file = file;

        let mut transfer = easy.transfer();
        transfer
            .header_function(move |data| {
                if let Ok(line) = str::from_utf8(data) {
                    let line = line.trim();
                    if line.starts_with("HTTP/") {
                        // New status line (possibly after a redirect): any
                        // previously seen length belongs to the old response.
                        let code = line
                            .split_whitespace()
                            .nth(1)
                            .and_then(|s| s.parse::<u32>().ok())
                            .unwrap_or(0);
                        status_hdr.store(code, Ordering::Relaxed);
                        *content_length_hdr.lock().unwrap() = None;
                    } else if let Some((name, value)) = line.split_once(':') {
                        if name.eq_ignore_ascii_case("content-length") {
                            if let Ok(len) = value.trim().parse::<u64>() {
                                *content_length_hdr.lock().unwrap() = Some(len);
                            }
                        }
                    }
                }
                true
            })
            .map_err(FetchError::Curl)?;
        transfer
            .write_function(move |data| {
                let code = status_body.load(Ordering::Relaxed);
                if code == 200 && offset > 0 {
                    // Appending a full-body response after a resume offset
                    // would duplicate bytes; abort before writing anything.
                    range_ignored_body.store(true, Ordering::Relaxed);
                    return Ok(0);
                }
                if !(200..300).contains(&code) {
                    // Error bodies (404 pages, 416 messages) must never reach
                    // the segment file; consume and discard.
                    return Ok(data.len());
                }
                if let Err(e) = file.write_all(data) {
                    let _ = storage_error_body.lock().unwrap().replace(e);
                    return Ok(0);
                }
                let written =
                    bytes_written_body.fetch_add(data.len() as u64, Ordering::Relaxed)
                        + data.len() as u64;
                if let Some(tx) = &progress {
                    let total = content_length_body.lock().unwrap().map(|cl| offset + cl);
                    let _ = tx.try_send(SegmentProgress {
                        index,
                        bytes_done: offset + written,
                        total_bytes: total,
                    });
                }
                Ok(data.len())
            })
            .map_err(FetchError::Curl)?;
        if let Err(e) = transfer.perform() {
            if e.is_write_error() {
                if range_ignored.load(Ordering::Relaxed) {
                    return Err(FetchError::RangeIgnored);
                }
                if let Some(io_err) = storage_error.lock().unwrap().take() {
                    return Err(FetchError::Storage(io_err));
                }
            }
            return Err(FetchError::Curl(e));
        }
    }

    let code = easy.response_code().map_err(FetchError::Curl)?;
    if code == 416 && offset > 0 {
        // Range starts at or past the end: the local file already holds the
        // full content from a previous run.
        tracing::debug!("{}: already complete at {} bytes", path.display(), offset);
        return Ok(offset);
    }
    if code == 200 && offset > 0 {
        return Err(FetchError::RangeIgnored);
    }
    if !(200..300).contains(&code) {
        return Err(FetchError::Http(code));
    }

    Ok(offset + bytes_written.load(Ordering::Relaxed))
}
