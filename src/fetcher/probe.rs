//! Pre-download size probe.
//!
//! Learns the content length of a resource without fetching its body so
//! oversized documents can be rejected before any bytes hit the download
//! directory. Probe failures are non-fatal; the pipeline proceeds to a
//! real download when the size cannot be determined.

use reqwest::Client;
use reqwest::header::CONTENT_LENGTH;
use tracing::debug;
use url::Url;

/// Remote (or local) content length in bytes, if it can be determined.
pub async fn probe_size(client: &Client, uri: &str) -> Option<u64> {
    let url = Url::parse(uri).ok()?;
    match url.scheme() {
        "file" => {
            let path = url.to_file_path().ok()?;
            std::fs::metadata(path).ok().map(|m| m.len())
        }
        "http" | "https" => {
            let response = match client.head(url).send().await {
                Ok(response) => response,
                Err(err) => {
                    debug!("size probe failed for {uri}: {err}");
                    return None;
                }
            };
            if !response.status().is_success() {
                return None;
            }
            response
                .headers()
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
        }
        _ => None,
    }
}
