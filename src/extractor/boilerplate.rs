//! Boilerplate-removal strategies for HTML content.
//!
//! Four selectable algorithms, chosen once at pipeline construction:
//! `Article` (readability, tuned for news-like single-column pages, the
//! default), `Default` (generic container heuristic), `KeepEverything`
//! (no filtering, diagnostic) and `LargestContentBlock` (keep only the
//! single largest text block).

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    Article,
    Default,
    KeepEverything,
    LargestContentBlock,
}

impl std::str::FromStr for ExtractionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "article" => Ok(Self::Article),
            "default" => Ok(Self::Default),
            "keepeverything" => Ok(Self::KeepEverything),
            "largestcontentblock" | "largestblock" => Ok(Self::LargestContentBlock),
            other => Err(format!("unknown extraction mode: {other}")),
        }
    }
}

static CONTAINER_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("article, main, [role='main'], .content, .post, .article, #content, #main, .entry-content")
        .unwrap()
});

static PARAGRAPH_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p, h1, h2, h3, h4, h5, h6, li, blockquote, pre").unwrap());

static BLOCK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p, div, article, section, td, li, blockquote").unwrap());

static BODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

/// Run the selected strategy over an HTML document. Returns `None` when no
/// textual content survives.
pub fn extract_html(html: &str, base_url: Option<&Url>, mode: ExtractionMode) -> Option<String> {
    let text = match mode {
        ExtractionMode::Article => article(html, base_url)?,
        ExtractionMode::Default => default_heuristic(html)?,
        ExtractionMode::KeepEverything => keep_everything(html)?,
        ExtractionMode::LargestContentBlock => largest_content_block(html)?,
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Readability-style main-content extraction, with the generic heuristic
/// as a fallback when readability finds nothing usable.
fn article(html: &str, base_url: Option<&Url>) -> Option<String> {
    let fallback_url = Url::parse("http://localhost/").ok()?;
    let url = base_url.cloned().unwrap_or(fallback_url);
    if let Ok(product) = readability::extractor::extract(&mut html.as_bytes(), &url) {
        let text = product.text.trim().to_string();
        if !text.is_empty() {
            return Some(text);
        }
    }
    default_heuristic(html)
}

/// Generic heuristic: paragraph text inside a recognized content
/// container, falling back to every paragraph-level element on the page.
fn default_heuristic(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    for container in document.select(&CONTAINER_SELECTOR) {
        let text = paragraph_text(container);
        if text.chars().count() > 100 {
            return Some(text);
        }
    }

    let mut out = String::new();
    for paragraph in document.select(&PARAGRAPH_SELECTOR) {
        push_block(&mut out, &element_text(paragraph));
    }
    if out.trim().is_empty() {
        // Pages without any block markup still count for KeepEverything-ish
        // recovery: fall back to the whole body.
        let body = document.select(&BODY_SELECTOR).next()?;
        out = element_text(body);
    }
    non_empty(out)
}

/// No filtering at all: every text node except script/style noise.
fn keep_everything(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let body = document.select(&BODY_SELECTOR).next()?;
    let mut out = String::new();
    collect_text(body, &mut out);
    // Source indentation arrives as literal text nodes; tidy line by line.
    let cleaned = out
        .lines()
        .map(crate::textutil::collapse_whitespace)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    non_empty(cleaned)
}

/// Keep only the single block element carrying the most own text.
fn largest_content_block(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let mut best: Option<String> = None;
    let mut best_len = 0usize;
    for block in document.select(&BLOCK_SELECTOR) {
        let text = own_text(block);
        let len = text.chars().count();
        if len > best_len {
            best_len = len;
            best = Some(text);
        }
    }
    best
}

fn paragraph_text(container: ElementRef<'_>) -> String {
    let mut out = String::new();
    for paragraph in container.select(&PARAGRAPH_SELECTOR) {
        push_block(&mut out, &element_text(paragraph));
    }
    if out.trim().is_empty() {
        out = element_text(container);
    }
    out
}

/// All descendant text of an element, whitespace-collapsed.
fn element_text(element: ElementRef<'_>) -> String {
    crate::textutil::collapse_whitespace(&element.text().collect::<String>())
}

/// Only the text nodes that are direct children of the element.
fn own_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
    crate::textutil::collapse_whitespace(&out)
}

/// Recursive text collection skipping non-content elements, one line per
/// block element.
fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            let name = child_el.value().name();
            if matches!(name, "script" | "style" | "noscript" | "template" | "iframe") {
                continue;
            }
            collect_text(child_el, out);
            if is_block_element(name) {
                out.push('\n');
            }
        }
    }
}

fn is_block_element(name: &str) -> bool {
    matches!(
        name,
        "p" | "div"
            | "br"
            | "li"
            | "ul"
            | "ol"
            | "table"
            | "tr"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "section"
            | "article"
            | "header"
            | "footer"
            | "blockquote"
            | "pre"
    )
}

fn push_block(out: &mut String, text: &str) {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return;
    }
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(trimmed);
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() { None } else { Some(text) }
}
