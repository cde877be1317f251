//! Identifier sanitization
//!
//! Dictionary names may contain characters that are illegal in table or
//! property names, and some collide with SQL reserved words.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static RESERVED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(database|cell|order|partition|group)$").expect("reserved word pattern")
});

static PUNCTUATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-/%\[]").expect("punctuation pattern"));

/// Prefix applied to reserved or digit-leading names
pub const RESERVED_PREFIX: &str = "the_";

/// Converts dictionary names into target identifiers
pub trait NameConverter: Send + Sync + fmt::Debug {
    fn convert(&self, name: &str) -> String;
}

fn replace_punctuation(name: &str) -> String {
    PUNCTUATION_RE.replace_all(name, "_").replace(']', "")
}

/// Reserved-word aware converter used for relational targets
#[derive(Debug, Clone, Default)]
pub struct DefaultNameConverter {
    extra_reserved: Vec<String>,
}

impl DefaultNameConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also prefix these names (case-insensitive)
    pub fn with_reserved_words(words: &[String]) -> Self {
        Self {
            extra_reserved: words.iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    fn needs_prefix(&self, name: &str) -> bool {
        if RESERVED_RE.is_match(name) {
            return true;
        }
        if name.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            return true;
        }
        let lower = name.to_lowercase();
        self.extra_reserved.iter().any(|w| *w == lower)
    }
}

impl NameConverter for DefaultNameConverter {
    fn convert(&self, name: &str) -> String {
        if self.needs_prefix(name) {
            replace_punctuation(&format!("{}{}", RESERVED_PREFIX, name))
        } else {
            replace_punctuation(name)
        }
    }
}

/// Punctuation-only converter used for generic and document targets
#[derive(Debug, Clone, Copy, Default)]
pub struct PunctuationNameConverter;

impl NameConverter for PunctuationNameConverter {
    fn convert(&self, name: &str) -> String {
        replace_punctuation(name)
    }
}
