//! Line-oriented extraction for non-HTML content.

use crate::textutil::collapse_whitespace;

/// Read already-parsed content line by line, dropping blank lines.
///
/// PDF text arrives hard-wrapped: whitespace inside a line is collapsed
/// aggressively and a line break is only inserted where a line does not
/// end in a hyphen, which rejoins hyphenated word-wrap. All other content
/// keeps one output line per source line.
pub fn extract_lines(body: &str, pdf: bool) -> String {
    let mut out = String::new();
    for line in body.lines() {
        let line = if pdf { collapse_whitespace(line) } else { line.trim().to_string() };
        if line.is_empty() {
            continue;
        }
        if pdf && line.ends_with('-') {
            out.push_str(&line);
        } else {
            out.push_str(&line);
            out.push('\n');
        }
    }
    out.trim_end().to_string()
}
