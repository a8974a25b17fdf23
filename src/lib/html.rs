//! Lightweight HTML and XML text extraction for status pages, changelogs and sitemaps.
//!
//! Monitored pages are compared by their visible text only, so a tag-aware
//! scan is enough: scripts and styles are dropped, block elements become line
//! breaks, and the remaining markup is stripped.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};

use regex::Regex;

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("built-in pattern must compile"))
}

fn hidden_blocks() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(
        &CELL,
        r"(?is)<!--.*?-->|<(script|style|noscript|template)\b[^>]*>.*?</(script|style|noscript|template)\s*>",
    )
}

fn body_element() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"(?is)<body\b[^>]*>(.*?)(?:</body\s*>|$)")
}

fn block_boundary() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(
        &CELL,
        r"(?i)<(?:br|/?(?:p|div|li|ul|ol|tr|td|th|h[1-6]|section|article|header|footer|main|nav|table|dt|dd|pre|blockquote))\b[^>]*>",
    )
}

fn any_tag() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"(?s)<[^>]*>")
}

fn whitespace_run() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"\s+")
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_space(text: &str) -> String {
    whitespace_run().replace_all(text, " ").trim().to_string()
}

/// Decode the character entities that commonly appear in page text.
pub fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Visible text of the document body (or the whole document without one), one line per block.
pub fn body_text_lines(html: &str) -> Vec<String> {
    let visible = hidden_blocks().replace_all(html, "");
    let body = body_element()
        .captures(&visible)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| visible.to_string());
    let broken = block_boundary().replace_all(&body, "\n");
    let stripped = any_tag().replace_all(&broken, "");
    decode_entities(&stripped)
        .lines()
        .map(normalize_space)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Visible body text with whitespace collapsed to single spaces.
pub fn body_text(html: &str) -> String {
    normalize_space(&body_text_lines(html).join("\n"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TagPattern {
    /// `<tag ...>inner</tag>`
    Element,
    /// `<tag ...>inner</tag>` with an optional `ns:` prefix on both tags.
    XmlElement,
    XmlOpen,
    XmlClose,
}

/// Per-tag patterns are compiled once and shared across calls.
fn tag_regex(kind: TagPattern, tag: &str) -> Option<Regex> {
    static CACHE: OnceLock<Mutex<HashMap<(TagPattern, String), Regex>>> = OnceLock::new();
    let mut cache = CACHE
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    let key = (kind, tag.to_string());
    if let Some(re) = cache.get(&key) {
        return Some(re.clone());
    }

    let tag = regex::escape(tag);
    let pattern = match kind {
        TagPattern::Element => format!(r"(?is)<{tag}\b[^>]*>(.*?)</{tag}\s*>"),
        TagPattern::XmlElement => {
            format!(r"(?is)<(?:[\w-]+:)?{tag}\b[^>]*>(.*?)</(?:[\w-]+:)?{tag}\s*>")
        }
        TagPattern::XmlOpen => format!(r"(?i)<(?:[\w-]+:)?{tag}\b[^>]*>"),
        TagPattern::XmlClose => format!(r"(?i)</(?:[\w-]+:)?{tag}\s*>"),
    };
    let re = Regex::new(&pattern).ok()?;
    cache.insert(key, re.clone());
    Some(re)
}

/// Text content of the first `<tag>` element, stripped of markup.
pub fn first_element_text(html: &str, tag: &str) -> Option<String> {
    let re = tag_regex(TagPattern::Element, tag)?;
    let inner = re.captures(html)?.get(1)?.as_str();
    let text = normalize_space(&decode_entities(&any_tag().replace_all(inner, " ")));
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Inner text of every `<tag>` element, namespace prefixes allowed (`<ns:tag>`).
pub fn xml_elements<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    match tag_regex(TagPattern::XmlElement, tag) {
        Some(re) => re
            .captures_iter(xml)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect(),
        None => Vec::new(),
    }
}

/// Number of opening and closing `<tag>` tags, namespace prefixes allowed.
pub fn xml_tag_counts(xml: &str, tag: &str) -> (usize, usize) {
    let count = |kind| tag_regex(kind, tag).map_or(0, |re| re.find_iter(xml).count());
    (count(TagPattern::XmlOpen), count(TagPattern::XmlClose))
}

/// Unwrap CDATA sections and decode entities in an XML text node.
pub fn xml_text(raw: &str) -> String {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix("<![CDATA[")
        .and_then(|rest| rest.strip_suffix("]]>"))
        .unwrap_or(trimmed);
    decode_entities(inner).trim().to_string()
}
