//! The acquisition pipeline: drives fetch, classification, extraction and
//! filtering for every URI in the input list, one document at a time.
//!
//! The pipeline is asynchronous relative to its caller but internally
//! sequential; no record is ever touched by two stages at once. The only
//! state that outlives a record is the fetcher's TLS trust downgrade and
//! the progress sink.

use std::collections::BTreeMap;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::classifier::{self, ClassifyError, LanguageClassifier};
use crate::config::{Config, ConfigError, LanguageFilterMode};
use crate::extractor;
use crate::fetcher::{Fetcher, probe::probe_size, repair_uri};
use crate::filter::{self, BlacklistMatcher};
use crate::output;
use crate::record::{DocumentRecord, DocumentStatus, base_file_name};
use crate::textutil::{count_tokens, split_sentences};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Receives progress updates from the pipeline's worker task. Called from
/// that single task only; implementations need no internal locking.
pub trait ProgressSink: Send {
    /// Advance the bounded counter; called once per processed URI,
    /// whatever the outcome.
    fn advance(&mut self, completed: usize, total: usize);

    /// Human-readable per-URI status line.
    fn message(&mut self, line: &str);
}

/// Default sink that forwards everything to the tracing log.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn advance(&mut self, completed: usize, total: usize) {
        info!("processed {completed}/{total} documents");
    }

    fn message(&mut self, line: &str) {
        info!("{line}");
    }
}

pub struct AcquisitionPipeline {
    config: Config,
    classifier: Box<dyn LanguageClassifier>,
    progress: Box<dyn ProgressSink>,
    cancel: CancellationToken,
}

impl AcquisitionPipeline {
    pub fn new(config: Config, classifier: Box<dyn LanguageClassifier>) -> Self {
        Self {
            config,
            classifier,
            progress: Box::new(LogSink),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Process the whole URI list and return one record per URI, each with
    /// a terminal status. Cancellation is checked between records; a
    /// cancelled run returns the records completed so far.
    pub async fn run(mut self, uris: &[String]) -> Result<Vec<DocumentRecord>, PipelineError> {
        self.config.validate()?;

        let blacklist = BlacklistMatcher::from_config(&self.config);
        let mut fetcher = Fetcher::new(
            self.config.max_download_attempts,
            self.config.download_dir.clone(),
            self.config.downloader,
            self.config.external_tool.clone(),
        );

        let total = uris.len();
        let mut records = Vec::with_capacity(total);

        for (index, raw) in uris.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!("cancelled after {} of {total} documents", records.len());
                break;
            }

            let uri = repair_uri(raw);
            let base = base_file_name(&self.config.corpus_name, index, total);
            let mut record = DocumentRecord::new(uri, base);

            self.progress.message(&format!("downloading {}", record.uri));
            self.process(&mut fetcher, &blacklist, &mut record).await;

            let status = *record.status.get_or_insert(DocumentStatus::Ok);
            self.progress
                .message(&format!("{}: {status}", record.uri));
            self.progress.advance(index + 1, total);
            records.push(record);
        }

        log_tally(&records);
        Ok(records)
    }

    async fn process(
        &mut self,
        fetcher: &mut Fetcher,
        blacklist: &BlacklistMatcher,
        record: &mut DocumentRecord,
    ) {
        // Pre-download size gate: probe failure is non-fatal, an oversized
        // probe result rejects before any bytes are fetched.
        if self.config.max_file_size > 0
            && let Some(size) = probe_size(fetcher.client(), &record.uri).await
            && size > self.config.max_file_size
        {
            record.mark(DocumentStatus::FileTooLarge);
            return;
        }

        if !fetcher.fetch(record).await {
            record.mark(DocumentStatus::CannotDownload);
            return;
        }
        let Some(downloaded) = record.downloaded_file.clone() else {
            record.mark(DocumentStatus::CannotDownload);
            return;
        };

        let classification = match classifier::classify(&downloaded, record.content_type.as_deref())
        {
            Ok(classification) => classification,
            Err(err @ ClassifyError::Unreadable(_)) => {
                warn!("{}: {err}", record.uri);
                record.mark(DocumentStatus::CannotDetect);
                return;
            }
            Err(err @ ClassifyError::Undecodable(_)) => {
                warn!("{}: {err}", record.uri);
                record.mark(DocumentStatus::CannotParse);
                return;
            }
        };
        record.mime_type = Some(classification.mime.clone());
        record.metadata = classification.metadata.clone();

        let text = match extractor::extract(record, &classification, self.config.extraction_mode) {
            Ok(text) => text,
            Err(err) => {
                warn!("could not extract {}: {err}", record.uri);
                record.mark(DocumentStatus::CannotExtract);
                return;
            }
        };

        let sentences = split_sentences(&text);
        if let Err(err) = output::write_outputs(&self.config, record, &text, &sentences) {
            warn!("{err}");
            output::delete_outputs(record);
            record.mark(DocumentStatus::CannotWriteToFile);
            return;
        }

        if let Some(status) = filter::run_gates(&self.config, blacklist, record, &text) {
            output::delete_outputs(record);
            record.mark(status);
            return;
        }

        match self.config.language_filter {
            LanguageFilterMode::None => {
                record.detected_languages = self.classifier.detect(&text);
            }
            LanguageFilterMode::Document => {
                if let Some(status) = filter::document_language_status(
                    self.classifier.as_ref(),
                    record,
                    &text,
                    self.config.target_language.as_deref(),
                ) {
                    output::delete_outputs(record);
                    record.mark(status);
                    return;
                }
            }
            LanguageFilterMode::Sentence => {
                record.detected_languages = self.classifier.detect(&text);
                if let Some(target) = self.config.target_language.clone() {
                    let verdict = filter::filter_sentences(
                        self.classifier.as_ref(),
                        sentences,
                        &target,
                        self.config.min_sentence_length,
                    );
                    record.skipped_sentences = verdict.skipped;
                    if verdict.kept.is_empty() {
                        // Every sentence was confidently in the wrong
                        // language; nothing worth keeping.
                        output::delete_outputs(record);
                        record.mark(DocumentStatus::WrongLanguage);
                        return;
                    }
                    if verdict.skipped > 0 {
                        let kept_text = verdict.kept.join("\n");
                        record.character_count = kept_text.chars().count();
                        record.token_count = count_tokens(&kept_text);
                        if let Err(err) =
                            output::write_outputs(&self.config, record, &kept_text, &verdict.kept)
                        {
                            warn!("{err}");
                            output::delete_outputs(record);
                            record.mark(DocumentStatus::CannotWriteToFile);
                            return;
                        }
                    }
                }
            }
        }

        record.mark(DocumentStatus::Ok);
    }
}

fn log_tally(records: &[DocumentRecord]) {
    let mut tally: BTreeMap<String, usize> = BTreeMap::new();
    for record in records {
        if let Some(status) = record.status {
            *tally.entry(status.to_string()).or_default() += 1;
        }
    }
    for (status, count) in &tally {
        info!("{status}: {count}");
    }
    info!("finished: {} documents processed", records.len());
}
