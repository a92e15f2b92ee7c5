//! Extraction record types
//!
//! These are the values a successful fetch produces and the aggregator owns
//! afterward. All of them serialize so the persistence layer can write them
//! out unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two locales every page is read in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// Default locale
    En,
    /// Alternate locale
    Ar,
}

impl Locale {
    /// Both locales, default first
    pub const ALL: [Locale; 2] = [Locale::En, Locale::Ar];

    /// Language code used in `lang` attributes
    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ar => "ar",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One extracted attribute, one string per locale
///
/// Either member may be empty when the page has no value for that locale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedField {
    pub en: String,
    pub ar: String,
}

impl LocalizedField {
    pub fn new(en: impl Into<String>, ar: impl Into<String>) -> Self {
        Self {
            en: en.into(),
            ar: ar.into(),
        }
    }

    pub fn get(&self, locale: Locale) -> &str {
        match locale {
            Locale::En => &self.en,
            Locale::Ar => &self.ar,
        }
    }

    pub fn set(&mut self, locale: Locale, value: String) {
        match locale {
            Locale::En => self.en = value,
            Locale::Ar => self.ar = value,
        }
    }

    /// True when neither locale has a value
    pub fn is_blank(&self) -> bool {
        self.en.is_empty() && self.ar.is_empty()
    }
}

/// SEO fields extracted from one successfully loaded page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    /// The location that was requested
    pub location: String,

    /// Page title (`<title>` with `og:title` override)
    pub title: LocalizedField,

    /// Meta description (with `og:description` override)
    pub description: LocalizedField,

    /// First top-level heading
    pub heading: LocalizedField,

    /// First paragraph of body text
    pub intro: LocalizedField,

    /// JSON-LD payload, absent when missing or unparseable
    pub structured_data: Option<serde_json::Value>,

    /// When the page was captured
    pub captured_at: DateTime<Utc>,
}
