//! Pipeline configuration.
//!
//! The interactive front end and project settings live elsewhere; this
//! module only models what the acquisition pipeline consumes. `from_env`
//! loads the same fields from environment variables with development
//! defaults, the way the worker binaries expect, and `validate` performs
//! the fatal precondition checks that must pass before the loop starts.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::extractor::ExtractionMode;

pub const ENV_CORPUS_NAME: &str = "GLEANER_CORPUS_NAME";
pub const ENV_OUTPUT_ROOT: &str = "GLEANER_OUTPUT_ROOT";
pub const ENV_TARGET_LANGUAGE: &str = "GLEANER_TARGET_LANGUAGE";
pub const ENV_LANGUAGE_FILTER: &str = "GLEANER_LANGUAGE_FILTER";
pub const ENV_MIN_DOC_SIZE: &str = "GLEANER_MIN_DOC_SIZE";
pub const ENV_MAX_DOC_SIZE: &str = "GLEANER_MAX_DOC_SIZE";
pub const ENV_MAX_FILE_SIZE: &str = "GLEANER_MAX_FILE_SIZE";
pub const ENV_DOWNLOAD_DIR: &str = "GLEANER_DOWNLOAD_DIR";
pub const ENV_TEXT_DIR: &str = "GLEANER_TEXT_DIR";
pub const ENV_XML_DIR: &str = "GLEANER_XML_DIR";
pub const ENV_EXTRACTION_MODE: &str = "GLEANER_EXTRACTION_MODE";
pub const ENV_BLACKLIST_FILE: &str = "GLEANER_BLACKLIST_FILE";
pub const ENV_DOWNLOADER: &str = "GLEANER_DOWNLOADER";
pub const ENV_EXTERNAL_TOOL: &str = "GLEANER_EXTERNAL_TOOL";

/// How language filtering is applied. The two granularities are mutually
/// exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LanguageFilterMode {
    #[default]
    None,
    Document,
    Sentence,
}

impl FromStr for LanguageFilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "document" => Ok(Self::Document),
            "sentence" => Ok(Self::Sentence),
            other => Err(format!("unknown language filter mode: {other}")),
        }
    }
}

/// Which download strategy the fetcher dispatches http(s) URIs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloaderKind {
    #[default]
    Internal,
    External,
}

impl FromStr for DownloaderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "internal" => Ok(Self::Internal),
            "external" => Ok(Self::External),
            other => Err(format!("unknown downloader: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub corpus_name: String,
    /// Two-letter target language code; `None` means "unspecified".
    pub target_language: Option<String>,
    pub language_filter: LanguageFilterMode,
    /// Minimum extracted size in characters; 0 disables the gate.
    pub min_doc_size: usize,
    /// Maximum extracted size in characters; 0 disables the gate.
    pub max_doc_size: usize,
    /// Maximum remote file size in bytes for the pre-download probe;
    /// 0 disables the gate.
    pub max_file_size: u64,
    pub download_dir: PathBuf,
    pub text_dir: PathBuf,
    pub xml_dir: PathBuf,
    pub extraction_mode: ExtractionMode,
    pub blacklist: Vec<String>,
    /// Distinct blacklisted terms required to reject.
    pub blacklist_type_threshold: usize,
    /// Summed blacklisted occurrences required to reject.
    pub blacklist_token_threshold: usize,
    /// Extra `<text>` attributes, emitted in insertion order.
    pub extra_xml_attributes: Vec<(String, String)>,
    pub downloader: DownloaderKind,
    pub external_tool: Option<PathBuf>,
    pub max_download_attempts: u32,
    /// Sentences shorter than this many characters are kept unconditionally
    /// by the sentence-level language filter.
    pub min_sentence_length: usize,
}

impl Config {
    /// Configuration for a corpus rooted at `output_root`, with the three
    /// output directories laid out underneath it.
    pub fn new(corpus_name: impl Into<String>, output_root: impl Into<PathBuf>) -> Self {
        let root = output_root.into();
        Self {
            corpus_name: corpus_name.into(),
            target_language: None,
            language_filter: LanguageFilterMode::None,
            min_doc_size: 0,
            max_doc_size: 0,
            max_file_size: 0,
            download_dir: root.join("download"),
            text_dir: root.join("corpus"),
            xml_dir: root.join("xml"),
            extraction_mode: ExtractionMode::Article,
            blacklist: Vec::new(),
            blacklist_type_threshold: 3,
            blacklist_token_threshold: 10,
            extra_xml_attributes: Vec::new(),
            downloader: DownloaderKind::Internal,
            external_tool: None,
            max_download_attempts: 3,
            min_sentence_length: 10,
        }
    }

    /// Load from environment variables, falling back to defaults. The
    /// blacklist is read from the file named by `GLEANER_BLACKLIST_FILE`,
    /// one term per line.
    pub fn from_env() -> Result<Self, ConfigError> {
        let corpus_name = env::var(ENV_CORPUS_NAME).unwrap_or_else(|_| "corpus".to_string());
        let root = env::var(ENV_OUTPUT_ROOT).unwrap_or_else(|_| "gleaner-out".to_string());
        let mut config = Config::new(corpus_name, root);

        if let Ok(dir) = env::var(ENV_DOWNLOAD_DIR) {
            config.download_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = env::var(ENV_TEXT_DIR) {
            config.text_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = env::var(ENV_XML_DIR) {
            config.xml_dir = PathBuf::from(dir);
        }
        if let Ok(lang) = env::var(ENV_TARGET_LANGUAGE)
            && !lang.is_empty()
            && lang != "unspecified"
        {
            config.target_language = Some(lang);
        }
        if let Ok(mode) = env::var(ENV_LANGUAGE_FILTER) {
            config.language_filter = mode
                .parse()
                .map_err(|reason| ConfigError::InvalidValue { field: ENV_LANGUAGE_FILTER, reason })?;
        }
        if let Ok(mode) = env::var(ENV_EXTRACTION_MODE) {
            config.extraction_mode = mode
                .parse()
                .map_err(|reason| ConfigError::InvalidValue { field: ENV_EXTRACTION_MODE, reason })?;
        }
        if let Ok(kind) = env::var(ENV_DOWNLOADER) {
            config.downloader = kind
                .parse()
                .map_err(|reason| ConfigError::InvalidValue { field: ENV_DOWNLOADER, reason })?;
        }
        if let Ok(tool) = env::var(ENV_EXTERNAL_TOOL) {
            config.external_tool = Some(PathBuf::from(tool));
        }
        config.min_doc_size = parse_env(ENV_MIN_DOC_SIZE, config.min_doc_size)?;
        config.max_doc_size = parse_env(ENV_MAX_DOC_SIZE, config.max_doc_size)?;
        config.max_file_size = parse_env(ENV_MAX_FILE_SIZE, config.max_file_size)?;

        if let Ok(path) = env::var(ENV_BLACKLIST_FILE) {
            let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::InvalidValue {
                field: ENV_BLACKLIST_FILE,
                reason: format!("{path}: {e}"),
            })?;
            config.blacklist = contents
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(str::to_string)
                .collect();
        }

        Ok(config)
    }

    /// Fatal precondition checks, run once before the pipeline loop:
    /// output directories must be creatable and writable, and the external
    /// tool must exist when selected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (label, dir) in [
            ("download directory", &self.download_dir),
            ("text corpus directory", &self.text_dir),
            ("xml corpus directory", &self.xml_dir),
        ] {
            std::fs::create_dir_all(dir).map_err(|e| ConfigError::UnusableDirectory {
                label,
                path: dir.clone(),
                reason: e.to_string(),
            })?;
            let probe = dir.join(".gleaner-write-check");
            std::fs::write(&probe, b"").map_err(|e| ConfigError::UnusableDirectory {
                label,
                path: dir.clone(),
                reason: e.to_string(),
            })?;
            std::fs::remove_file(&probe).ok();
        }

        if self.downloader == DownloaderKind::External {
            match &self.external_tool {
                Some(tool) if tool.exists() => {}
                Some(tool) => {
                    return Err(ConfigError::InvalidValue {
                        field: ENV_EXTERNAL_TOOL,
                        reason: format!("{} does not exist", tool.display()),
                    });
                }
                None => {
                    return Err(ConfigError::InvalidValue {
                        field: ENV_EXTERNAL_TOOL,
                        reason: "external downloader selected but no tool configured".into(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn parse_env<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) => value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            field: key,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("{label} {path} is unusable: {reason}")]
    UnusableDirectory {
        label: &'static str,
        path: PathBuf,
        reason: String,
    },
}
