//! Content-type detection and structural metadata for downloaded files.

pub mod language;

pub use language::{CONFIDENT, LanguageClassifier, WhatlangClassifier, lang_to_code};

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use regex::Regex;
use thiserror::Error;

static CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).unwrap());

static META_CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<meta\s+[^>]*?charset\s*=\s*["']?([^"'\s/>]+)"#).unwrap());

static TITLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());

#[derive(Error, Debug)]
pub enum ClassifyError {
    /// The downloaded file could not be opened or read at all.
    #[error("cannot open content: {0}")]
    Unreadable(String),

    /// The bytes were readable but could not be decoded as text in any
    /// candidate encoding.
    #[error("cannot parse content: {0}")]
    Undecodable(String),
}

/// Result of sniffing a downloaded file.
#[derive(Debug)]
pub struct Classification {
    pub mime: String,
    /// Multi-valued metadata map (`Content-Encoding`, `Content-Length`,
    /// `title`, ...), consumed for XML emission and encoding selection.
    pub metadata: BTreeMap<String, Vec<String>>,
    /// UTF-8 decoded body for text-like content; `None` for binary formats
    /// that need their own parser (PDF).
    pub body: Option<String>,
}

/// Detect the MIME type and metadata of a downloaded file.
///
/// `declared` is the MIME type reported by the server, if any; magic bytes
/// win over it, and the file extension is the last resort.
pub fn classify(path: &Path, declared: Option<&str>) -> Result<Classification, ClassifyError> {
    let bytes = std::fs::read(path).map_err(|e| ClassifyError::Unreadable(e.to_string()))?;
    let mime = sniff_mime(&bytes, declared, path);

    let mut metadata: BTreeMap<String, Vec<String>> = BTreeMap::new();
    metadata.insert("Content-Length".into(), vec![bytes.len().to_string()]);

    let body = if mime == "application/pdf" || mime == "application/octet-stream" {
        metadata.insert("Content-Encoding".into(), vec!["binary".into()]);
        None
    } else {
        let encoding = detect_encoding(declared, &bytes);
        metadata.insert("Content-Encoding".into(), vec![encoding.name().to_string()]);
        let (decoded, _, had_errors) = encoding.decode(&bytes);
        if had_errors {
            return Err(ClassifyError::Undecodable(format!(
                "decode failed with encoding {}",
                encoding.name()
            )));
        }
        Some(decoded.into_owned())
    };

    if mime.contains("html")
        && let Some(body) = body.as_deref()
        && let Some(captures) = TITLE_REGEX.captures(body)
        && let Some(title) = captures.get(1)
    {
        let title = crate::textutil::collapse_whitespace(title.as_str());
        if !title.is_empty() {
            metadata.insert("title".into(), vec![title]);
        }
    }

    Ok(Classification { mime, metadata, body })
}

/// Magic bytes first, then the declared Content-Type, then the extension.
pub fn sniff_mime(bytes: &[u8], declared: Option<&str>, path: &Path) -> String {
    if bytes.starts_with(b"%PDF-") {
        return "application/pdf".into();
    }
    let head = &bytes[..bytes.len().min(1024)];
    let head_str = String::from_utf8_lossy(head);
    let head_lower = head_str.trim_start_matches('\u{feff}').trim_start().to_lowercase();
    if head_lower.starts_with("<!doctype html")
        || head_lower.starts_with("<html")
        || head_lower.contains("<head")
        || head_lower.contains("<body")
    {
        return "text/html".into();
    }
    if let Some(declared) = declared {
        let mime = declared.split(';').next().unwrap_or(declared).trim();
        if !mime.is_empty() {
            return mime.to_lowercase();
        }
    }
    if let Some(guess) = mime_guess::from_path(path).first_raw() {
        return guess.to_lowercase();
    }
    if head.iter().any(|&b| b == 0) {
        "application/octet-stream".into()
    } else {
        "text/plain".into()
    }
}

/// Charset from the Content-Type header, a `<meta charset>` tag in the
/// first 4KB, or chardetng's statistical guess, in that order.
fn detect_encoding(declared: Option<&str>, bytes: &[u8]) -> &'static Encoding {
    if let Some(declared) = declared
        && let Some(captures) = CHARSET_REGEX.captures(declared)
        && let Some(label) = captures.get(1)
        && let Some(encoding) = Encoding::for_label(label.as_str().to_lowercase().as_bytes())
    {
        return encoding;
    }

    let head = &bytes[..bytes.len().min(4096)];
    let head_str = String::from_utf8_lossy(head);
    if let Some(captures) = META_CHARSET_REGEX.captures(&head_str)
        && let Some(label) = captures.get(1)
        && let Some(encoding) = Encoding::for_label(label.as_str().to_lowercase().as_bytes())
    {
        return encoding;
    }

    let mut detector = EncodingDetector::new();
    detector.feed(head, false);
    detector.guess(None, true)
}
