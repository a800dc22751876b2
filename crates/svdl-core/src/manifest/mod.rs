//! Manifest resolution: turn a manifest URL into the ordered list of
//! segment download tasks.
//!
//! The manifest lists intermediate URLs; each intermediate document lists
//! server entries with concrete segment URLs. Resolution is sequential and
//! fail-fast: one bad intermediate aborts the whole run (no partial-result
//! policy).

mod fetch;
mod schema;

pub use schema::{IntermediateDoc, Manifest, ServerEntry};

use crate::retry::FetchError;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// One segment to download: index (merge order + filename), remote URL,
/// local path. Indices run across all intermediate documents and are never
/// reset, so local paths are distinct for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentTask {
    pub index: usize,
    pub url: String,
    pub path: PathBuf,
}

/// Error from manifest resolution. Transport and parse failures are kept
/// apart so the caller can tell a dead server from a schema change.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("parse {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Local path for the segment with the given index: `<tmp_dir>/temp_<index>.mp4`.
pub fn segment_path(tmp_dir: &Path, index: usize) -> PathBuf {
    tmp_dir.join(format!("temp_{}.mp4", index))
}

fn fetch_doc<T: serde::de::DeserializeOwned>(url: &str) -> Result<T, ResolveError> {
    Url::parse(url).map_err(|source| ResolveError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;
    let body = fetch::get_body(url).map_err(|source| ResolveError::Fetch {
        url: url.to_string(),
        source,
    })?;
    serde_json::from_slice(&body).map_err(|source| ResolveError::Parse {
        url: url.to_string(),
        source,
    })
}

/// Fetches the manifest at `manifest_url` and expands it into segment tasks.
///
/// Intermediate documents are fetched sequentially in document order; server
/// entries keep document order too. The task index is a running counter
/// across all intermediates, and the local path derives from it.
pub fn resolve(manifest_url: &str, tmp_dir: &Path) -> Result<Vec<SegmentTask>, ResolveError> {
    let manifest: Manifest = fetch_doc(manifest_url)?;
    tracing::debug!(
        "manifest lists {} intermediate URL(s)",
        manifest.data.mp4_play_url.len()
    );

    let mut tasks = Vec::new();
    let mut index = 0usize;
    for intermediate_url in &manifest.data.mp4_play_url {
        let doc: IntermediateDoc = fetch_doc(intermediate_url)?;
        for server in &doc.servers {
            tasks.push(SegmentTask {
                index,
                url: server.url.clone(),
                path: segment_path(tmp_dir, index),
            });
            index += 1;
        }
    }
    Ok(tasks)
}
