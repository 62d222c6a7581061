//! Corpus output files: a plain-text file per accepted document and an
//! XML sidecar wrapping the same text in sentence-segmented `<s>` elements.

use std::path::PathBuf;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::record::DocumentRecord;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("cannot write {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("xml serialization failed: {0}")]
    Xml(String),
}

/// Write (or overwrite) the plain-text file and the XML sidecar for a
/// record, updating `extracted_file`/`extracted_xml_file`.
///
/// `text` is the paragraph-per-line extracted text; `sentences` is the
/// segmented version of the same text used for the `<s>` elements.
pub fn write_outputs(
    config: &Config,
    record: &mut DocumentRecord,
    text: &str,
    sentences: &[String],
) -> Result<(), OutputError> {
    let text_path = config.text_dir.join(format!("{}.txt", record.base_file_name));
    let mut contents = text.to_string();
    if !contents.ends_with('\n') {
        contents.push('\n');
    }
    std::fs::write(&text_path, contents).map_err(|e| OutputError::Io {
        path: text_path.clone(),
        reason: e.to_string(),
    })?;

    let xml_path = config.xml_dir.join(format!("{}.xml", record.base_file_name));
    let written = render_xml(config, record, sentences).and_then(|xml| {
        std::fs::write(&xml_path, xml).map_err(|e| OutputError::Io {
            path: xml_path.clone(),
            reason: e.to_string(),
        })
    });
    if let Err(err) = written {
        // Don't leave a half-pair behind.
        std::fs::remove_file(&text_path).ok();
        return Err(err);
    }

    debug!("wrote {} and {}", text_path.display(), xml_path.display());
    record.extracted_file = Some(text_path);
    record.extracted_xml_file = Some(xml_path);
    Ok(())
}

fn render_xml(
    config: &Config,
    record: &DocumentRecord,
    sentences: &[String],
) -> Result<Vec<u8>, OutputError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    let file_name = format!("{}.txt", record.base_file_name);
    let content_type = record.mime_type.as_deref().unwrap_or("text/html");

    let mut root = BytesStart::new("text");
    root.push_attribute(("id", record.base_file_name.as_str()));
    root.push_attribute(("filename", file_name.as_str()));
    root.push_attribute(("uri", record.uri.as_str()));
    root.push_attribute(("content_type", content_type));
    // User-configured attributes keep their insertion order.
    for (name, value) in &config.extra_xml_attributes {
        root.push_attribute((name.as_str(), value.as_str()));
    }

    writer
        .write_event(Event::Start(root))
        .map_err(|e| OutputError::Xml(e.to_string()))?;
    for sentence in sentences {
        if sentence.trim().is_empty() {
            continue;
        }
        writer
            .write_event(Event::Start(BytesStart::new("s")))
            .map_err(|e| OutputError::Xml(e.to_string()))?;
        writer
            .write_event(Event::Text(BytesText::new(sentence)))
            .map_err(|e| OutputError::Xml(e.to_string()))?;
        writer
            .write_event(Event::End(BytesEnd::new("s")))
            .map_err(|e| OutputError::Xml(e.to_string()))?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("text")))
        .map_err(|e| OutputError::Xml(e.to_string()))?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

/// Delete a rejected record's output files, if any were written. The
/// invariant is that extracted files exist on disk if and only if the
/// record ends up `Ok`.
pub fn delete_outputs(record: &mut DocumentRecord) {
    for path in [record.extracted_file.take(), record.extracted_xml_file.take()]
        .into_iter()
        .flatten()
    {
        if let Err(err) = std::fs::remove_file(&path) {
            debug!("could not remove {}: {err}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, Config, DocumentRecord) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new("c", dir.path());
        config.validate().unwrap();
        let mut record = DocumentRecord::new("http://example.test/a.html", "c_0");
        record.mime_type = Some("text/html".into());
        (dir, config, record)
    }

    #[test]
    fn writes_text_and_xml_pair() {
        let (_dir, config, mut record) = setup();
        let sentences = vec!["Hello world.".to_string(), "Second one.".to_string()];
        write_outputs(&config, &mut record, "Hello world. Second one.", &sentences).unwrap();

        let text_path = record.extracted_file.clone().unwrap();
        let xml_path = record.extracted_xml_file.clone().unwrap();
        assert_eq!(std::fs::read_to_string(text_path).unwrap(), "Hello world. Second one.\n");

        let xml = std::fs::read_to_string(xml_path).unwrap();
        assert!(xml.contains("<text id=\"c_0\" filename=\"c_0.txt\" uri=\"http://example.test/a.html\" content_type=\"text/html\">"));
        assert!(xml.contains("<s>Hello world.</s>"));
        assert!(xml.contains("<s>Second one.</s>"));
        assert!(xml.trim_end().ends_with("</text>"));
    }

    #[test]
    fn extra_attributes_keep_insertion_order() {
        let (_dir, mut config, mut record) = setup();
        config.extra_xml_attributes = vec![
            ("project".to_string(), "demo".to_string()),
            ("batch".to_string(), "7".to_string()),
        ];
        write_outputs(&config, &mut record, "x", &["x".to_string()]).unwrap();

        let xml = std::fs::read_to_string(record.extracted_xml_file.clone().unwrap()).unwrap();
        let project = xml.find("project=\"demo\"").unwrap();
        let batch = xml.find("batch=\"7\"").unwrap();
        assert!(project < batch);
    }

    #[test]
    fn xml_escapes_markup_in_sentences() {
        let (_dir, config, mut record) = setup();
        let sentences = vec!["a < b & c.".to_string()];
        write_outputs(&config, &mut record, "a < b & c.", &sentences).unwrap();
        let xml = std::fs::read_to_string(record.extracted_xml_file.clone().unwrap()).unwrap();
        assert!(xml.contains("<s>a &lt; b &amp; c.</s>"));
    }

    #[test]
    fn delete_outputs_removes_both_files() {
        let (_dir, config, mut record) = setup();
        write_outputs(&config, &mut record, "x", &["x".to_string()]).unwrap();
        let text_path = record.extracted_file.clone().unwrap();
        let xml_path = record.extracted_xml_file.clone().unwrap();

        delete_outputs(&mut record);
        assert!(!text_path.exists());
        assert!(!xml_path.exists());
        assert!(record.extracted_file.is_none());
        assert!(record.extracted_xml_file.is_none());

        // Idempotent on a record with nothing written.
        delete_outputs(&mut record);
    }
}
