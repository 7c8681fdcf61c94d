// PlantVillage Inference 🌿 AGPL-3.0 License

//! Remote image fetching for URL-based prediction.

use std::io::Read;
use std::time::Duration;

use crate::error::{InferenceError, Result};

/// Connect and read timeout for image downloads, in seconds.
const FETCH_TIMEOUT: u64 = 10;

/// Upper bound on a downloaded image body, in bytes.
const MAX_BODY_BYTES: u64 = 32 * 1024 * 1024;

/// Fetch an image over HTTP(S) with a bounded timeout and body size.
///
/// No retries: a slow or unreachable host fails the request outright.
///
/// # Errors
///
/// Returns [`InferenceError::DownloadError`] on connection failure, timeout,
/// non-success status, or a truncated read.
pub fn fetch_image_bytes(url: &str) -> Result<Vec<u8>> {
    let config = ureq::Agent::config_builder()
        .timeout_connect(Some(Duration::from_secs(FETCH_TIMEOUT)))
        .timeout_recv_body(Some(Duration::from_secs(FETCH_TIMEOUT)))
        .build();
    let agent = ureq::Agent::new_with_config(config);

    let response = agent.get(url).call().map_err(|e| {
        let msg = match &e {
            ureq::Error::Timeout(_) => format!("Connection timed out while fetching {url}"),
            ureq::Error::StatusCode(code) => format!("Server returned HTTP {code} for {url}"),
            ureq::Error::Io(io_err) => format!("Network error fetching {url}: {io_err}"),
            _ => format!("Failed to fetch {url}: {e}"),
        };
        InferenceError::DownloadError(msg)
    })?;

    let mut body = Vec::new();
    response
        .into_body()
        .into_reader()
        .take(MAX_BODY_BYTES)
        .read_to_end(&mut body)
        .map_err(|e| InferenceError::DownloadError(format!("Failed to read body of {url}: {e}")))?;

    Ok(body)
}
