//! Small in-memory GET for JSON documents (manifest and intermediates).
//!
//! Segment bodies stream to disk via the fetcher; these documents are tiny
//! and are buffered whole.

use crate::retry::FetchError;
use std::time::Duration;

/// Fetches `url` and returns the response body. Non-2xx is an error.
pub fn get_body(url: &str) -> Result<Vec<u8>, FetchError> {
    let mut body: Vec<u8> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(FetchError::Curl)?;
    easy.follow_location(true).map_err(FetchError::Curl)?;
    easy.max_redirections(10).map_err(FetchError::Curl)?;
    easy.connect_timeout(Duration::from_secs(15))
        .map_err(FetchError::Curl)?;
    easy.timeout(Duration::from_secs(60))
        .map_err(FetchError::Curl)?;

    {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(FetchError::Curl)?;
        transfer.perform().map_err(FetchError::Curl)?;
    }

    let code = easy.response_code().map_err(FetchError::Curl)?;
    if !(200..300).contains(&code) {
        return Err(FetchError::Http(code));
    }

    Ok(body)
}
