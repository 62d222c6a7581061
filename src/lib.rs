//! gleaner — turns a list of web/document URIs into a filtered plain-text
//! corpus with XML sidecars.
//!
//! The pipeline downloads each resource (with retry, redirect and TLS
//! fallback handling), sniffs its content type, extracts clean text
//! (boilerplate removal for HTML, line-oriented extraction otherwise),
//! then applies blacklist, size and language gates before writing one
//! `.txt` and one `.xml` file per accepted document.

pub mod classifier;
pub mod config;
pub mod extractor;
pub mod fetcher;
pub mod filter;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod textutil;

pub use classifier::{LanguageClassifier, WhatlangClassifier};
pub use config::{Config, DownloaderKind, LanguageFilterMode};
pub use extractor::ExtractionMode;
pub use pipeline::{AcquisitionPipeline, LogSink, PipelineError, ProgressSink};
pub use record::{DocumentRecord, DocumentStatus, Downloader};
