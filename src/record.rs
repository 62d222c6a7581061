use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::extractor::ExtractionMode;

/// Terminal outcome of processing one URI. Anything other than `Ok` stops
/// the pipeline for that document and leaves no extracted files behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Ok,
    CannotDownload,
    CannotParse,
    CannotDetect,
    CannotExtract,
    CannotDetermineLanguage,
    CannotWriteToFile,
    FileTooLarge,
    DocTooSmall,
    DocTooLarge,
    TooManyBlacklistedWords,
    WrongLanguage,
}

impl DocumentStatus {
    pub fn is_ok(self) -> bool {
        matches!(self, DocumentStatus::Ok)
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DocumentStatus::Ok => "ok",
            DocumentStatus::CannotDownload => "cannot download",
            DocumentStatus::CannotParse => "cannot parse",
            DocumentStatus::CannotDetect => "cannot detect content type",
            DocumentStatus::CannotExtract => "cannot extract text",
            DocumentStatus::CannotDetermineLanguage => "cannot determine language",
            DocumentStatus::CannotWriteToFile => "cannot write to file",
            DocumentStatus::FileTooLarge => "file too large",
            DocumentStatus::DocTooSmall => "document too small",
            DocumentStatus::DocTooLarge => "document too large",
            DocumentStatus::TooManyBlacklistedWords => "too many blacklisted words",
            DocumentStatus::WrongLanguage => "wrong language",
        };
        f.write_str(label)
    }
}

/// Which download strategy ultimately produced the bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Downloader {
    Internal,
    ExternalTool,
    LocalCopy,
}

/// Per-URI processing state. Created by the pipeline when a URI is dequeued
/// and mutated in place by each stage; never shared across stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Current URI; rewritten when the server redirects.
    pub uri: String,
    /// Original URI when `uri` was rewritten by a redirect.
    pub redirected_from: Option<String>,
    pub base_file_name: String,

    pub download_attempts: u32,
    pub downloaded_file: Option<PathBuf>,
    pub downloaded_file_size: Option<u64>,
    pub download_date: Option<DateTime<Utc>>,
    /// Raw Content-Type header (may carry a charset parameter).
    pub content_type: Option<String>,
    pub mime_type: Option<String>,
    pub downloader: Option<Downloader>,

    pub metadata: BTreeMap<String, Vec<String>>,
    pub extracted_file: Option<PathBuf>,
    pub extracted_xml_file: Option<PathBuf>,
    pub character_count: usize,
    pub token_count: usize,
    pub skipped_sentences: usize,
    pub html_extraction_mode: Option<ExtractionMode>,

    /// Ranked (language code, confidence) pairs, best first.
    pub detected_languages: Vec<(String, f64)>,
    /// `None` until the record exits the pipeline.
    pub status: Option<DocumentStatus>,
}

impl DocumentRecord {
    pub fn new(uri: impl Into<String>, base_file_name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            redirected_from: None,
            base_file_name: base_file_name.into(),
            download_attempts: 0,
            downloaded_file: None,
            downloaded_file_size: None,
            download_date: None,
            content_type: None,
            mime_type: None,
            downloader: None,
            metadata: BTreeMap::new(),
            extracted_file: None,
            extracted_xml_file: None,
            character_count: 0,
            token_count: 0,
            skipped_sentences: 0,
            html_extraction_mode: None,
            detected_languages: Vec::new(),
            status: None,
        }
    }

    pub fn mark(&mut self, status: DocumentStatus) {
        self.status = Some(status);
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_some()
    }

    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.entry(key.into()).or_default().push(value.into());
    }
}

/// Width of the zero-padded sequence number for a corpus of `total` URIs.
pub fn sequence_width(total: usize) -> usize {
    if total <= 1 {
        return 1;
    }
    ((total as f64).log10().ceil() as usize).max(1)
}

/// `{corpus}_{NNN}` name shared by the downloaded, plain-text and XML files.
pub fn base_file_name(corpus: &str, index: usize, total: usize) -> String {
    format!("{}_{:0width$}", corpus, index, width = sequence_width(total))
}
