//! Wire shapes of the manifest and intermediate documents.
//!
//! These are the only JSON shapes consumed; anything else is a parse error.

use serde::Deserialize;

/// Root manifest: `{"data": {"mp4PlayUrl": [<url>, ...]}}`.
#[derive(Debug, Deserialize)]
pub struct Manifest {
    pub data: ManifestData,
}

#[derive(Debug, Deserialize)]
pub struct ManifestData {
    /// Ordered list of intermediate URLs, each resolving to a server list.
    #[serde(rename = "mp4PlayUrl")]
    pub mp4_play_url: Vec<String>,
}

/// Intermediate document: `{"servers": [{"url": <segment-url>}, ...]}`.
#[derive(Debug, Deserialize)]
pub struct IntermediateDoc {
    pub servers: Vec<ServerEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ServerEntry {
    pub url: String,
}
