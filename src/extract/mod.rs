//! SEO field extraction from loaded pages
//!
//! This module turns a loaded [`PageState`] into an [`ExtractionRecord`].
//! Extraction is synchronous and does no I/O; every field is resolved
//! independently through a priority cascade:
//!
//! | Field | Sources, in evaluation order |
//! |-------|------------------------------|
//! | title | `<title>` → `og:title` → `og:title` tagged with the locale |
//! | description | `meta[name=description]` → `og:description` → description tagged with the locale |
//! | heading | first `<h1>` → `<h1>` tagged with the locale |
//! | intro | first non-empty `<p>` → `<p>` tagged with the locale |
//!
//! A later source replaces the current value only when it is non-empty.
//! A source that cannot be evaluated leaves the field as it was.

mod record;

pub use record::{ExtractionRecord, Locale, LocalizedField};

use crate::session::PageState;
use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use thiserror::Error;

/// Maximum number of characters kept for intro text
pub const INTRO_MAX_CHARS: usize = 300;

/// A field-level lookup fault
///
/// Faults are absorbed inside extraction: the affected source is skipped and
/// the rest of the record is still populated.
#[derive(Debug, Error)]
pub enum ExtractionFault {
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

/// Where a candidate value is read from
#[derive(Debug, Clone, Copy)]
enum Source {
    /// Collapsed text of the first matching element with non-empty text
    Text(&'static str),
    /// Attribute of the first matching element
    Attr(&'static str, &'static str),
}

impl Source {
    fn pattern(&self) -> &'static str {
        match self {
            Self::Text(pattern) | Self::Attr(pattern, _) => *pattern,
        }
    }
}

const TITLE_SOURCES: &[Source] = &[
    Source::Text("title"),
    Source::Attr(r#"meta[property="og:title"]"#, "content"),
    Source::Attr(r#"meta[property="og:title"][lang="{lang}"]"#, "content"),
];

const DESCRIPTION_SOURCES: &[Source] = &[
    Source::Attr(r#"meta[name="description"]"#, "content"),
    Source::Attr(r#"meta[property="og:description"]"#, "content"),
    Source::Attr(r#"meta[name="description"][lang="{lang}"]"#, "content"),
];

const HEADING_SOURCES: &[Source] = &[
    Source::Text("h1"),
    Source::Text(r#"h1[lang="{lang}"]"#),
];

const INTRO_SOURCES: &[Source] = &[
    Source::Text("p"),
    Source::Text(r#"p[lang="{lang}"]"#),
];

const STRUCTURED_DATA_SELECTOR: &str = r#"script[type="application/ld+json"]"#;

/// Extracts SEO fields from a loaded page, stamped with the current time
///
/// # Example
///
/// ```
/// use seo_sweep::extract::extract;
/// use seo_sweep::session::PageState;
///
/// let html = r#"<html><head><title>Home</title></head><body><h1>Welcome</h1></body></html>"#;
/// let page = PageState::new("https://example.com/", "https://example.com/", html, "");
/// let record = extract(&page);
/// assert_eq!(record.title.en, "Home");
/// assert_eq!(record.heading.en, "Welcome");
/// assert_eq!(record.title.ar, "");
/// ```
pub fn extract(page: &PageState) -> ExtractionRecord {
    extract_at(page, Utc::now())
}

/// Extracts SEO fields from a loaded page with an explicit capture time
///
/// Given the same page state and timestamp, the result is always identical.
pub fn extract_at(page: &PageState, captured_at: DateTime<Utc>) -> ExtractionRecord {
    let mut title = LocalizedField::default();
    let mut description = LocalizedField::default();
    let mut heading = LocalizedField::default();
    let mut intro = LocalizedField::default();
    let mut structured_data = None;

    for locale in Locale::ALL {
        let document = Html::parse_document(page.html(locale));

        title.set(locale, resolve_field(&document, TITLE_SOURCES, locale));
        description.set(locale, resolve_field(&document, DESCRIPTION_SOURCES, locale));
        heading.set(locale, resolve_field(&document, HEADING_SOURCES, locale));
        intro.set(
            locale,
            truncate_chars(
                resolve_field(&document, INTRO_SOURCES, locale),
                INTRO_MAX_CHARS,
            ),
        );

        if locale == Locale::En {
            structured_data = extract_structured_data(&document, &page.location);
        }
    }

    ExtractionRecord {
        location: page.location.clone(),
        title,
        description,
        heading,
        intro,
        structured_data,
        captured_at,
    }
}

/// Runs a priority cascade for one field in one locale
fn resolve_field(document: &Html, sources: &[Source], locale: Locale) -> String {
    let mut value = String::new();

    for source in sources {
        match lookup(document, source, locale) {
            Ok(candidate) if !candidate.is_empty() => value = candidate,
            Ok(_) => {}
            Err(fault) => {
                tracing::debug!("Skipping {} source for locale {}: {}", source.pattern(), locale, fault);
            }
        }
    }

    value
}

/// Reads a single source, returning an empty string when nothing matches
fn lookup(document: &Html, source: &Source, locale: Locale) -> Result<String, ExtractionFault> {
    let pattern = source.pattern().replace("{lang}", locale.code());
    let selector = Selector::parse(&pattern).map_err(|e| ExtractionFault::InvalidSelector {
        selector: pattern.clone(),
        message: format!("{:?}", e),
    })?;

    let value = match source {
        Source::Text(_) => document
            .select(&selector)
            .map(|element| collapse_whitespace(&element.text().collect::<String>()))
            .find(|text| !text.is_empty()),
        Source::Attr(_, attr) => document
            .select(&selector)
            .next()
            .and_then(|element| element.value().attr(attr))
            .map(collapse_whitespace),
    };

    Ok(value.unwrap_or_default())
}

/// Parses every JSON-LD block in the document
///
/// Blocks that fail to parse are skipped. One valid block is returned as-is,
/// several are returned as an array, none yields `None`.
fn extract_structured_data(document: &Html, location: &str) -> Option<serde_json::Value> {
    let selector = Selector::parse(STRUCTURED_DATA_SELECTOR).ok()?;

    let mut payloads: Vec<serde_json::Value> = document
        .select(&selector)
        .filter_map(|element| {
            let raw = element.text().collect::<String>();
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            match serde_json::from_str(raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!("Ignoring malformed JSON-LD on {}: {}", location, e);
                    None
                }
            }
        })
        .collect();

    match payloads.len() {
        0 => None,
        1 => payloads.pop(),
        _ => Some(serde_json::Value::Array(payloads)),
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => text[..cut].trim_end().to_string(),
        None => text,
    }
}
