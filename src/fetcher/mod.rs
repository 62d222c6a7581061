//! Resource download with multi-strategy fallback.
//!
//! A [`Fetcher`] obtains the bytes behind a URI using one of three
//! strategies: the internal HTTP client, a configured external download
//! tool run as a subprocess, or a plain filesystem copy for `file:` URIs.
//! Redirects are followed explicitly so the record keeps both sides of the
//! rewrite, and the attempt counter bounds every re-dispatch.

pub mod errors;
pub mod probe;

pub use errors::FetchError;

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{Client, ClientBuilder, redirect};
use tokio::process::Command;
use tracing::{debug, warn};
use url::Url;

use crate::config::DownloaderKind;
use crate::record::{DocumentRecord, Downloader};

const USER_AGENT: &str = "gleaner/0.1 (corpus acquisition)";
const TIMEOUT_MS: u64 = 5000;

/// Characters that must stay percent-encoded in a canonical path.
const PATH_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^');

/// Query additionally keeps `'` encoded; `?` and `/` are legal there.
const QUERY_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'\'');

/// Decode and re-encode the path and query of a URI so mixed or partial
/// percent-encodings canonicalize to one spelling. Unparseable input is
/// returned unchanged; the fetcher will reject it later.
pub fn repair_uri(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut url) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };
    if !matches!(url.scheme(), "http" | "https") {
        return url.to_string();
    }

    let decoded_path = percent_decode_str(url.path()).decode_utf8_lossy().into_owned();
    let path = utf8_percent_encode(&decoded_path, PATH_SET).to_string();
    url.set_path(&path);

    if let Some(query) = url.query() {
        let decoded = percent_decode_str(query).decode_utf8_lossy().into_owned();
        let query = utf8_percent_encode(&decoded, QUERY_SET).to_string();
        url.set_query(Some(&query));
    }
    url.to_string()
}

/// File extension for a downloaded payload, derived from its MIME type.
pub fn extension_for(mime: &str) -> &'static str {
    if mime.contains("html") {
        return ".html";
    }
    if mime.contains("xml") {
        return ".xml";
    }
    match mime {
        "application/pdf" => ".pdf",
        "text/plain" => ".txt",
        "application/json" => ".json",
        "text/csv" => ".csv",
        "application/rtf" => ".rtf",
        "application/msword" => ".doc",
        _ => ".bin",
    }
}

enum Step {
    Done,
    Redirect(Url),
}

pub struct Fetcher {
    client: Client,
    permissive: bool,
    max_attempts: u32,
    download_dir: PathBuf,
    strategy: DownloaderKind,
    external_tool: Option<PathBuf>,
}

impl Fetcher {
    pub fn new(
        max_attempts: u32,
        download_dir: PathBuf,
        strategy: DownloaderKind,
        external_tool: Option<PathBuf>,
    ) -> Self {
        Self {
            client: build_client(false),
            permissive: false,
            max_attempts,
            download_dir,
            strategy,
            external_tool,
        }
    }

    /// The strict-TLS client, reused by the size probe.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Download the resource behind `record.uri` into the download
    /// directory, mutating the record's download state in place. Returns
    /// whether bytes were obtained.
    ///
    /// Every dispatch consumes one attempt, including redirect hops and
    /// the post-downgrade TLS retry, so `download_attempts` never exceeds
    /// the configured maximum.
    pub async fn fetch(&mut self, record: &mut DocumentRecord) -> bool {
        loop {
            if record.download_attempts >= self.max_attempts {
                debug!("giving up on {} after {} attempts", record.uri, record.download_attempts);
                return false;
            }
            record.download_attempts += 1;

            let url = match Url::parse(&record.uri) {
                Ok(url) => url,
                Err(err) => {
                    warn!("invalid uri {}: {err}", record.uri);
                    return false;
                }
            };

            let outcome = match url.scheme() {
                "file" => self.fetch_local(record, &url).await,
                "http" | "https" => match self.strategy {
                    DownloaderKind::Internal => self.fetch_http(record, &url).await,
                    DownloaderKind::External => self.fetch_external(record, &url).await,
                },
                other => Err(FetchError::UnsupportedScheme(other.to_string())),
            };

            match outcome {
                Ok(Step::Done) => return true,
                Ok(Step::Redirect(next)) => {
                    debug!("{} redirected to {next}", record.uri);
                    // Keep the original URI across multi-hop chains.
                    if record.redirected_from.is_none() {
                        record.redirected_from = Some(record.uri.clone());
                    }
                    record.uri = next.to_string();
                }
                Err(err) if err.is_tls() && !self.permissive => {
                    warn!(
                        "tls handshake failed for {}, disabling certificate verification \
                         for the rest of the run: {err}",
                        record.uri
                    );
                    self.permissive = true;
                    self.client = build_client(true);
                }
                Err(err) if err.should_retry() => {
                    warn!("attempt {} for {} failed: {err}", record.download_attempts, record.uri);
                }
                Err(err) => {
                    warn!("could not download {}: {err}", record.uri);
                    return false;
                }
            }
        }
    }

    async fn fetch_http(&self, record: &mut DocumentRecord, url: &Url) -> Result<Step, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or(FetchError::MissingLocation)?;
            let next = url.join(location)?;
            return Ok(Step::Redirect(next));
        }
        if !status.is_success() {
            return Err(FetchError::Http {
                status,
                retriable: status.is_server_error(),
            });
        }

        // Undeclared web content is assumed to be HTML.
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_string();
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or("text/html")
            .trim()
            .to_lowercase();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Io(e.to_string()))?;

        let path = self
            .download_dir
            .join(format!("{}{}", record.base_file_name, extension_for(&mime)));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| FetchError::Io(e.to_string()))?;

        record.content_type = Some(content_type);
        record.mime_type = Some(mime);
        record.downloaded_file_size = Some(bytes.len() as u64);
        record.downloaded_file = Some(path);
        record.download_date = Some(Utc::now());
        record.downloader = Some(Downloader::Internal);
        Ok(Step::Done)
    }

    async fn fetch_external(
        &self,
        record: &mut DocumentRecord,
        url: &Url,
    ) -> Result<Step, FetchError> {
        let tool = self
            .external_tool
            .as_ref()
            .ok_or_else(|| FetchError::Subprocess("no external download tool configured".into()))?;

        let path = self
            .download_dir
            .join(format!("{}.bin", record.base_file_name));
        let status = Command::new(tool)
            .arg(url.as_str())
            .arg(&path)
            .status()
            .await
            .map_err(|e| FetchError::Subprocess(e.to_string()))?;
        if !status.success() {
            return Err(FetchError::Subprocess(format!("{status}")));
        }

        let size = tokio::fs::metadata(&path)
            .await
            .map_err(|e| FetchError::Subprocess(e.to_string()))?
            .len();

        // MIME type is sniffed from content later; external tools don't
        // report response headers.
        record.downloaded_file_size = Some(size);
        record.downloaded_file = Some(path);
        record.download_date = Some(Utc::now());
        record.downloader = Some(Downloader::ExternalTool);
        Ok(Step::Done)
    }

    async fn fetch_local(&self, record: &mut DocumentRecord, url: &Url) -> Result<Step, FetchError> {
        let source = url
            .to_file_path()
            .map_err(|_| FetchError::LocalFile("not a local path".into()))?;
        let bytes = tokio::fs::read(&source)
            .await
            .map_err(|e| FetchError::LocalFile(e.to_string()))?;

        let mime = crate::classifier::sniff_mime(&bytes, None, &source);
        let path = self
            .download_dir
            .join(format!("{}{}", record.base_file_name, extension_for(&mime)));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| FetchError::Io(e.to_string()))?;

        record.content_type = Some(mime.clone());
        record.mime_type = Some(mime);
        record.downloaded_file_size = Some(bytes.len() as u64);
        record.downloaded_file = Some(path);
        record.download_date = Some(Utc::now());
        record.downloader = Some(Downloader::LocalCopy);
        Ok(Step::Done)
    }
}

fn build_client(permissive: bool) -> Client {
    let mut builder = ClientBuilder::new()
        .connect_timeout(Duration::from_millis(TIMEOUT_MS))
        .timeout(Duration::from_millis(TIMEOUT_MS))
        .user_agent(USER_AGENT)
        .redirect(redirect::Policy::none());
    if permissive {
        builder = builder.danger_accept_invalid_certs(true);
    }
    builder.build().expect("failed to build HTTP client")
}
