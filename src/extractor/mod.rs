//! Conversion of downloaded bytes into clean plain text.

pub mod boilerplate;
pub mod generic;

pub use boilerplate::ExtractionMode;

use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::classifier::Classification;
use crate::record::DocumentRecord;
use crate::textutil::{count_tokens, normalize_newlines, normalize_punctuation};

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("no textual content")]
    Empty,

    #[error("pdf extraction failed: {0}")]
    Pdf(String),

    #[error("no downloaded file to extract from")]
    MissingFile,
}

/// Extract plain text for a downloaded record, updating its extraction
/// state (`html_extraction_mode`, `character_count`, `token_count`).
///
/// HTML goes through the selected boilerplate-removal strategy; PDF pages
/// are parsed and rejoined line-oriented; everything else is read line by
/// line from the decoded body.
pub fn extract(
    record: &mut DocumentRecord,
    classification: &Classification,
    mode: ExtractionMode,
) -> Result<String, ExtractError> {
    let mime = classification.mime.as_str();

    let raw = if mime.contains("html") {
        let body = classification.body.as_deref().ok_or(ExtractError::Empty)?;
        let base_url = Url::parse(&record.uri).ok();
        record.html_extraction_mode = Some(mode);
        boilerplate::extract_html(body, base_url.as_ref(), mode).ok_or(ExtractError::Empty)?
    } else if mime == "application/pdf" {
        let pages = pdf_text(record)?;
        generic::extract_lines(&pages, true)
    } else {
        let body = classification.body.as_deref().ok_or(ExtractError::Empty)?;
        generic::extract_lines(body, false)
    };

    let text = normalize_punctuation(&normalize_newlines(&raw));
    if text.trim().is_empty() {
        return Err(ExtractError::Empty);
    }

    record.character_count = text.chars().count();
    record.token_count = count_tokens(&text);
    debug!(
        "extracted {} chars / {} tokens from {}",
        record.character_count, record.token_count, record.uri
    );
    Ok(text)
}

fn pdf_text(record: &DocumentRecord) -> Result<String, ExtractError> {
    let path = record.downloaded_file.as_deref().ok_or(ExtractError::MissingFile)?;
    let mut document =
        pdf_oxide::document::PdfDocument::open(path).map_err(|e| ExtractError::Pdf(e.to_string()))?;
    let pages = document.page_count().map_err(|e| ExtractError::Pdf(e.to_string()))?;
    let mut out = String::new();
    for index in 0..pages {
        match document.extract_text(index) {
            Ok(text) => {
                out.push_str(&text);
                out.push('\n');
            }
            Err(err) => debug!("skipping unreadable pdf page {index}: {err}"),
        }
    }
    Ok(out)
}
