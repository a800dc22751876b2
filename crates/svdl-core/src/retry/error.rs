//! Transfer error type shared by the manifest fetcher and the segment fetcher.

use std::fmt;

/// Error from a single HTTP transfer (curl failure, HTTP error status, or
/// local write failure). Kept as an enum so the retry policy can classify it
/// before it is converted to anyhow at the pipeline boundary.
#[derive(Debug)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection, etc.).
    Curl(curl::Error),
    /// HTTP response had a non-2xx status.
    Http(u32),
    /// The server answered a non-zero-offset range request with a plain 200,
    /// so appending the body would duplicate bytes already on disk. Not
    /// retried; the partial file is left untouched.
    RangeIgnored,
    /// Local file write failed (e.g. disk full, permission denied). Not retried.
    Storage(std::io::Error),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Curl(e) => write!(f, "{}", e),
            FetchError::Http(code) => write!(f, "HTTP {}", code),
            FetchError::RangeIgnored => {
                write!(f, "server ignored range request (200 with resume offset)")
            }
            FetchError::Storage(e) => write!(f, "storage: {}", e),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Curl(e) => Some(e),
            FetchError::Storage(e) => Some(e),
            FetchError::Http(_) | FetchError::RangeIgnored => None,
        }
    }
}
