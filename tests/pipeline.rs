use std::sync::{Arc, Mutex};

use gleaner::classifier::LanguageClassifier;
use gleaner::config::{Config, LanguageFilterMode};
use gleaner::extractor::ExtractionMode;
use gleaner::pipeline::{AcquisitionPipeline, ProgressSink};
use gleaner::record::DocumentStatus;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Deterministic classifier: anything containing "Bonjour" is confidently
/// French, everything else confidently English.
struct KeywordClassifier;

impl LanguageClassifier for KeywordClassifier {
    fn detect(&self, text: &str) -> Vec<(String, f64)> {
        if text.contains("Bonjour") {
            vec![("fr".to_string(), 0.99)]
        } else {
            vec![("en".to_string(), 0.99)]
        }
    }
}

/// Classifier that never answers, for the benefit-of-the-doubt paths.
struct Silent;

impl LanguageClassifier for Silent {
    fn detect(&self, _text: &str) -> Vec<(String, f64)> {
        Vec::new()
    }
}

#[derive(Clone, Default)]
struct CountingSink {
    advances: Arc<Mutex<Vec<(usize, usize)>>>,
    messages: Arc<Mutex<Vec<String>>>,
}

impl ProgressSink for CountingSink {
    fn advance(&mut self, completed: usize, total: usize) {
        self.advances.lock().unwrap().push((completed, total));
    }

    fn message(&mut self, line: &str) {
        self.messages.lock().unwrap().push(line.to_string());
    }
}

fn test_config(root: &std::path::Path) -> Config {
    let mut config = Config::new("corpus", root);
    config.extraction_mode = ExtractionMode::Default;
    config
}

async fn mount_page(server: &MockServer, route: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(html.as_bytes().to_vec())
                .insert_header("Content-Type", "text/html"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn sentence_filter_drops_confidently_foreign_sentences() {
    let root = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/a.html",
        "<html><body><p>Hello world. Bonjour le monde.</p></body></html>",
    )
    .await;

    let mut config = test_config(root.path());
    config.language_filter = LanguageFilterMode::Sentence;
    config.target_language = Some("en".to_string());
    config.min_sentence_length = 0;

    let pipeline = AcquisitionPipeline::new(config.clone(), Box::new(KeywordClassifier));
    let records = pipeline
        .run(&[format!("{}/a.html", server.uri())])
        .await
        .unwrap();

    let record = &records[0];
    assert_eq!(record.status, Some(DocumentStatus::Ok));
    assert_eq!(record.skipped_sentences, 1);

    let text = std::fs::read_to_string(record.extracted_file.as_ref().unwrap()).unwrap();
    assert_eq!(text, "Hello world.\n");

    let xml = std::fs::read_to_string(record.extracted_xml_file.as_ref().unwrap()).unwrap();
    assert!(xml.contains("<s>Hello world.</s>"));
    assert!(!xml.contains("<s>Bonjour le monde.</s>"));
}

#[tokio::test]
async fn redirect_scenario_keeps_both_uris_on_the_record() {
    let root = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/b"))
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/b",
        "<html><body><p>This page moved but still has readable content in it.</p></body></html>",
    )
    .await;

    let config = test_config(root.path());
    let pipeline = AcquisitionPipeline::new(config, Box::new(Silent));
    let uri_a = format!("{}/a", server.uri());
    let records = pipeline.run(&[uri_a.clone()]).await.unwrap();

    let record = &records[0];
    assert_eq!(record.status, Some(DocumentStatus::Ok));
    assert_eq!(record.redirected_from.as_deref(), Some(uri_a.as_str()));
    assert_eq!(record.uri, format!("{}/b", server.uri()));
    assert_eq!(record.downloader, Some(gleaner::record::Downloader::Internal));
}

#[tokio::test]
async fn oversized_file_is_rejected_before_download() {
    let root = tempfile::tempdir().unwrap();
    let source_dir = tempfile::tempdir().unwrap();
    let big = source_dir.path().join("big.txt");
    std::fs::write(&big, "x".repeat(4096)).unwrap();

    let mut config = test_config(root.path());
    config.max_file_size = 1024;
    let download_dir = config.download_dir.clone();

    let uri = url::Url::from_file_path(&big).unwrap().to_string();
    let pipeline = AcquisitionPipeline::new(config, Box::new(Silent));
    let records = pipeline.run(&[uri]).await.unwrap();

    let record = &records[0];
    assert_eq!(record.status, Some(DocumentStatus::FileTooLarge));
    assert_eq!(record.download_attempts, 0);

    // No bytes ever hit the download directory.
    let entries: Vec<_> = std::fs::read_dir(&download_dir).unwrap().collect();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn rejected_documents_leave_no_output_files() {
    let root = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/small.html",
        "<html><body><p>Too short.</p></body></html>",
    )
    .await;

    let mut config = test_config(root.path());
    config.min_doc_size = 10_000;
    let text_dir = config.text_dir.clone();
    let xml_dir = config.xml_dir.clone();

    let pipeline = AcquisitionPipeline::new(config, Box::new(Silent));
    let records = pipeline
        .run(&[format!("{}/small.html", server.uri())])
        .await
        .unwrap();

    let record = &records[0];
    assert_eq!(record.status, Some(DocumentStatus::DocTooSmall));
    assert!(record.extracted_file.is_none());
    assert!(record.extracted_xml_file.is_none());
    assert!(std::fs::read_dir(&text_dir).unwrap().next().is_none());
    assert!(std::fs::read_dir(&xml_dir).unwrap().next().is_none());
}

#[tokio::test]
async fn document_filter_rejects_confidently_wrong_language() {
    let root = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/fr.html",
        "<html><body><p>Bonjour le monde, ceci est un long paragraphe en francais.</p></body></html>",
    )
    .await;

    let mut config = test_config(root.path());
    config.language_filter = LanguageFilterMode::Document;
    config.target_language = Some("en".to_string());
    let text_dir = config.text_dir.clone();

    let pipeline = AcquisitionPipeline::new(config, Box::new(KeywordClassifier));
    let records = pipeline
        .run(&[format!("{}/fr.html", server.uri())])
        .await
        .unwrap();

    let record = &records[0];
    assert_eq!(record.status, Some(DocumentStatus::WrongLanguage));
    assert_eq!(record.detected_languages, vec![("fr".to_string(), 0.99)]);
    assert!(std::fs::read_dir(&text_dir).unwrap().next().is_none());
}

#[tokio::test]
async fn blacklist_gate_applies_end_to_end() {
    let root = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/spam.html",
        "<html><body><p>casino poker jackpot casino poker jackpot casino poker jackpot casino</p></body></html>",
    )
    .await;

    let mut config = test_config(root.path());
    config.blacklist = vec!["casino".into(), "poker".into(), "jackpot".into()];

    let pipeline = AcquisitionPipeline::new(config, Box::new(Silent));
    let records = pipeline
        .run(&[format!("{}/spam.html", server.uri())])
        .await
        .unwrap();
    assert_eq!(records[0].status, Some(DocumentStatus::TooManyBlacklistedWords));
}

#[tokio::test]
async fn progress_advances_once_per_uri_whatever_the_outcome() {
    let root = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/good.html",
        "<html><body><p>A perfectly fine document with enough words in it to pass.</p></body></html>",
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/bad"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = test_config(root.path());
    let sink = CountingSink::default();
    let advances = sink.advances.clone();

    let pipeline =
        AcquisitionPipeline::new(config, Box::new(Silent)).with_progress(Box::new(sink));
    let records = pipeline
        .run(&[
            format!("{}/good.html", server.uri()),
            format!("{}/bad", server.uri()),
            "::not-a-uri::".to_string(),
        ])
        .await
        .unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].status, Some(DocumentStatus::Ok));
    assert_eq!(records[1].status, Some(DocumentStatus::CannotDownload));
    assert_eq!(records[2].status, Some(DocumentStatus::CannotDownload));
    assert_eq!(*advances.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);

    // Sequence numbers are zero-padded to the corpus width.
    assert_eq!(records[0].base_file_name, "corpus_0");
    assert_eq!(records[2].base_file_name, "corpus_2");
}
