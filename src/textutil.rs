//! Stateless text-cleanup utilities shared by the extractor and the filters.

use std::sync::LazyLock;

use regex::Regex;

static SPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());

/// Collapse runs of spaces/tabs into a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    SPACE_RUN.replace_all(text.trim(), " ").into_owned()
}

/// CRLF/CR to LF, trailing whitespace stripped per line, leading and
/// trailing blank lines removed.
pub fn normalize_newlines(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<&str> = unified
        .lines()
        .map(|l| l.trim_end().trim_start_matches('\u{feff}'))
        .collect();
    while lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// Replace typographic punctuation with ASCII equivalents.
pub fn normalize_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2039}' | '\u{203A}' => {
                out.push('\'')
            }
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{00AB}' | '\u{00BB}' => out.push('"'),
            '\u{2026}' => out.push_str("..."),
            '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2015}' => {
                out.push('-')
            }
            '\u{00A0}' | '\u{2009}' | '\u{200A}' | '\u{202F}' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

/// Whitespace-delimited tokens that carry at least one alphanumeric
/// character; bare punctuation does not count.
pub fn count_tokens(text: &str) -> usize {
    text.split_whitespace()
        .filter(|t| t.chars().any(char::is_alphanumeric))
        .count()
}

// Common abbreviations that end in a period without closing a sentence.
// English-tuned, like the boundary heuristic itself.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "rev", "sr", "jr", "st", "vs", "etc", "fig", "no", "vol",
    "dept", "univ", "inc", "ltd", "co", "approx",
];

fn is_abbreviation(word: &str) -> bool {
    let w = word.trim_start_matches(|c: char| !c.is_alphanumeric());
    if w.chars().count() == 1 && w.chars().all(char::is_alphabetic) {
        // Single-letter initials ("J. Smith").
        return true;
    }
    let lower = w.to_lowercase();
    ABBREVIATIONS.contains(&lower.as_str())
}

fn opens_sentence(c: char) -> bool {
    c.is_uppercase() || c.is_numeric() || matches!(c, '"' | '\'' | '(' | '[' | '\u{00BF}' | '\u{00A1}')
}

/// Split text into sentences on `.`/`!`/`?` boundaries followed by
/// whitespace and a plausible sentence opener. Blank sentences are dropped.
///
/// This is a deterministic, language-agnostic heuristic tuned on English
/// punctuation conventions; it is not a trained boundary model, but it is
/// stable, which matters more here since sentence-level filtering rewrites
/// output files.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        // Swallow terminator runs ("?!", "...") and closing quotes/brackets.
        while let Some(&next) = chars.peek() {
            if matches!(next, '.' | '!' | '?' | '"' | '\'' | ')' | ']') {
                current.push(next);
                chars.next();
            } else {
                break;
            }
        }
        let Some(&next) = chars.peek() else { break };
        if !next.is_whitespace() {
            continue;
        }
        if c == '.' {
            let last_word = current
                .trim_end_matches(|ch: char| !ch.is_alphanumeric())
                .rsplit(|ch: char| ch.is_whitespace())
                .next()
                .unwrap_or("");
            if is_abbreviation(last_word) {
                continue;
            }
        }
        // Look past the whitespace run for the next sentence opener.
        let mut rest = chars.clone();
        while rest.peek().is_some_and(|ch| ch.is_whitespace()) {
            rest.next();
        }
        match rest.peek() {
            Some(&opener) if opens_sentence(opener) => {
                let sentence = current.trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
                current.clear();
            }
            _ => {}
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}
