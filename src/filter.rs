//! Accept/reject gating for extracted documents.
//!
//! The rejection cascade is an explicit ordered list of gate functions;
//! the pipeline runs them in sequence and stops at the first hit. Gates
//! only decide — deleting the already-written output files of a rejected
//! record is the pipeline's job.

use regex::Regex;
use tracing::debug;

use crate::classifier::{CONFIDENT, LanguageClassifier};
use crate::config::Config;
use crate::record::{DocumentRecord, DocumentStatus};

/// Whole-word, case-insensitive blacklist matching with precompiled
/// patterns.
pub struct BlacklistMatcher {
    patterns: Vec<Regex>,
    type_threshold: usize,
    token_threshold: usize,
}

impl BlacklistMatcher {
    pub fn new(terms: &[String], type_threshold: usize, token_threshold: usize) -> Self {
        let patterns = terms
            .iter()
            .filter_map(|term| {
                let term = term.trim();
                if term.is_empty() {
                    return None;
                }
                Regex::new(&format!(r"(?i)\b{}\b", regex::escape(term))).ok()
            })
            .collect();
        Self {
            patterns,
            type_threshold,
            token_threshold,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.blacklist,
            config.blacklist_type_threshold,
            config.blacklist_token_threshold,
        )
    }

    /// Rejects only when BOTH thresholds are met: enough *distinct*
    /// blacklisted terms occur (`type_count`) and enough total occurrences
    /// accumulate across all terms (`token_count`).
    pub fn status(&self, text: &str) -> Option<DocumentStatus> {
        if self.patterns.is_empty() {
            return None;
        }
        let mut type_count = 0usize;
        let mut token_count = 0usize;
        for pattern in &self.patterns {
            let hits = pattern.find_iter(text).count();
            if hits > 0 {
                type_count += 1;
                token_count += hits;
            }
        }
        if type_count >= self.type_threshold && token_count >= self.token_threshold {
            debug!("blacklist hit: {type_count} types, {token_count} tokens");
            Some(DocumentStatus::TooManyBlacklistedWords)
        } else {
            None
        }
    }
}

/// Run the ordered gate cascade (blacklist, minimum size, maximum size)
/// over an extracted document. First hit wins.
pub fn run_gates(
    config: &Config,
    blacklist: &BlacklistMatcher,
    record: &DocumentRecord,
    text: &str,
) -> Option<DocumentStatus> {
    let gates: [&dyn Fn() -> Option<DocumentStatus>; 3] = [
        &|| blacklist.status(text),
        &|| {
            (config.min_doc_size > 0 && record.character_count < config.min_doc_size)
                .then_some(DocumentStatus::DocTooSmall)
        },
        &|| {
            (config.max_doc_size > 0 && record.character_count > config.max_doc_size)
                .then_some(DocumentStatus::DocTooLarge)
        },
    ];
    gates.iter().find_map(|gate| gate())
}

/// Document-level language gate. Stores the ranked classification on the
/// record; rejects when a target language is set and the classifier either
/// found nothing or is not confidently right.
pub fn document_language_status(
    classifier: &dyn LanguageClassifier,
    record: &mut DocumentRecord,
    text: &str,
    target: Option<&str>,
) -> Option<DocumentStatus> {
    record.detected_languages = classifier.detect(text);
    let target = target?;
    match record.detected_languages.first() {
        None => Some(DocumentStatus::CannotDetermineLanguage),
        Some((code, confidence)) if code != target || *confidence < CONFIDENT => {
            Some(DocumentStatus::WrongLanguage)
        }
        Some(_) => None,
    }
}

/// Result of sentence-level language filtering.
pub struct SentenceVerdict {
    pub kept: Vec<String>,
    pub skipped: usize,
}

/// Classify each sentence independently and keep the benefit of the doubt:
/// a sentence is dropped only when the classifier is confident (at or
/// above the 0.90 threshold) that it is in the wrong language. Short
/// sentences carry too little signal and are kept unconditionally.
pub fn filter_sentences(
    classifier: &dyn LanguageClassifier,
    sentences: Vec<String>,
    target: &str,
    min_length: usize,
) -> SentenceVerdict {
    let mut kept = Vec::with_capacity(sentences.len());
    let mut skipped = 0usize;
    for sentence in sentences {
        if sentence.trim().is_empty() {
            continue;
        }
        if sentence.chars().count() < min_length {
            kept.push(sentence);
            continue;
        }
        match classifier.detect(&sentence).into_iter().next() {
            None => kept.push(sentence),
            Some((code, confidence)) => {
                if code == target || confidence < CONFIDENT {
                    kept.push(sentence);
                } else {
                    skipped += 1;
                }
            }
        }
    }
    SentenceVerdict { kept, skipped }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stub classifier with a fixed answer, for exercising the gates.
    struct Fixed(Option<(&'static str, f64)>);

    impl LanguageClassifier for Fixed {
        fn detect(&self, _text: &str) -> Vec<(String, f64)> {
            self.0.iter().map(|(code, conf)| (code.to_string(), *conf)).collect()
        }
    }

    fn config() -> Config {
        Config::new("c", "/tmp/gleaner-filter-test")
    }

    #[test]
    fn blacklist_requires_both_thresholds() {
        let terms = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
        let matcher = BlacklistMatcher::new(&terms, 3, 10);

        // Two distinct terms, 20 occurrences: token threshold met, type
        // threshold not — document passes.
        let two_types = "alpha beta ".repeat(10);
        assert_eq!(matcher.status(&two_types), None);

        // Three distinct terms but only 3 occurrences: type threshold met,
        // token threshold not — document passes.
        assert_eq!(matcher.status("alpha beta gamma"), None);

        // Both thresholds met.
        let dense = "alpha beta gamma alpha beta gamma alpha beta gamma alpha";
        assert_eq!(matcher.status(dense), Some(DocumentStatus::TooManyBlacklistedWords));
    }

    #[test]
    fn blacklist_matches_whole_words_case_insensitively() {
        let terms = vec!["spam".to_string()];
        let matcher = BlacklistMatcher::new(&terms, 1, 2);
        assert_eq!(matcher.status("SPAM and more Spam"), Some(DocumentStatus::TooManyBlacklistedWords));
        // "spammer" is not a whole-word match.
        assert_eq!(matcher.status("spammer spammer spammer"), None);
    }

    #[test]
    fn size_gates_respect_zero_as_disabled() {
        let mut cfg = config();
        let matcher = BlacklistMatcher::from_config(&cfg);
        let mut record = DocumentRecord::new("http://example.test", "c_0");
        record.character_count = 5;

        assert_eq!(run_gates(&cfg, &matcher, &record, "hello"), None);

        cfg.min_doc_size = 10;
        assert_eq!(
            run_gates(&cfg, &matcher, &record, "hello"),
            Some(DocumentStatus::DocTooSmall)
        );

        cfg.min_doc_size = 0;
        cfg.max_doc_size = 4;
        assert_eq!(
            run_gates(&cfg, &matcher, &record, "hello"),
            Some(DocumentStatus::DocTooLarge)
        );
    }

    #[test]
    fn gate_order_is_blacklist_first() {
        let mut cfg = config();
        cfg.blacklist = vec!["junk".to_string()];
        cfg.blacklist_type_threshold = 1;
        cfg.blacklist_token_threshold = 1;
        cfg.min_doc_size = 1000;
        let matcher = BlacklistMatcher::from_config(&cfg);
        let mut record = DocumentRecord::new("http://example.test", "c_0");
        record.character_count = 4;

        assert_eq!(
            run_gates(&cfg, &matcher, &record, "junk"),
            Some(DocumentStatus::TooManyBlacklistedWords)
        );
    }

    #[test]
    fn document_gate_needs_confident_match() {
        let mut record = DocumentRecord::new("http://example.test", "c_0");

        let status = document_language_status(&Fixed(Some(("en", 0.99))), &mut record, "x", Some("en"));
        assert_eq!(status, None);
        assert_eq!(record.detected_languages, vec![("en".to_string(), 0.99)]);

        let status = document_language_status(&Fixed(Some(("en", 0.5))), &mut record, "x", Some("en"));
        assert_eq!(status, Some(DocumentStatus::WrongLanguage));

        let status = document_language_status(&Fixed(Some(("fr", 0.99))), &mut record, "x", Some("en"));
        assert_eq!(status, Some(DocumentStatus::WrongLanguage));

        let status = document_language_status(&Fixed(None), &mut record, "x", Some("en"));
        assert_eq!(status, Some(DocumentStatus::CannotDetermineLanguage));

        // No target language requested: ranking is stored, nothing rejected.
        let status = document_language_status(&Fixed(Some(("fr", 0.99))), &mut record, "x", None);
        assert_eq!(status, None);
    }

    #[test]
    fn short_sentences_survive_a_confidently_wrong_classifier() {
        let sentences = vec!["Tiny.".to_string()];
        let verdict = filter_sentences(&Fixed(Some(("fr", 0.99))), sentences, "en", 10);
        assert_eq!(verdict.kept, vec!["Tiny.".to_string()]);
        assert_eq!(verdict.skipped, 0);
    }

    #[test]
    fn sentences_drop_only_on_confident_mismatch() {
        let sentences = vec![
            "This sentence is long enough to be judged.".to_string(),
            "Une phrase assez longue pour le classifieur.".to_string(),
        ];

        // Confidently wrong on everything: both dropped.
        let verdict = filter_sentences(&Fixed(Some(("fr", 0.95))), sentences.clone(), "en", 0);
        assert_eq!(verdict.kept.len(), 0);
        assert_eq!(verdict.skipped, 2);

        // Wrong but unsure: benefit of the doubt.
        let verdict = filter_sentences(&Fixed(Some(("fr", 0.5))), sentences.clone(), "en", 0);
        assert_eq!(verdict.kept.len(), 2);
        assert_eq!(verdict.skipped, 0);

        // Nothing detected: kept.
        let verdict = filter_sentences(&Fixed(None), sentences, "en", 0);
        assert_eq!(verdict.kept.len(), 2);
    }
}
