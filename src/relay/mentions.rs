//! @mention extraction.
//!
//! Splits message text on whitespace and yields the handle of every token
//! that starts with `@`. Trailing punctuation is not part of a handle, so
//! `@bob,` yields `bob`; a bare `@` yields an empty handle, which simply
//! fails lookup later. Only the first `@` is stripped, so `@@bob` yields
//! `@bob`.

use fancy_regex::Regex;
use tracing::warn;

/// Extracts candidate handles from message text.
#[derive(Debug, Clone)]
pub struct MentionExtractor {
    /// Anchored pattern capturing the handle characters after `@`.
    handle_pattern: Regex,
}

impl Default for MentionExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MentionExtractor {
    pub fn new() -> Self {
        Self {
            handle_pattern: Regex::new(r"^@(@?\w*)").unwrap(),
        }
    }

    /// Candidate handles in `text`, left to right, duplicates kept.
    pub fn extract<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        text.split_whitespace()
            .filter(|token| token.starts_with('@'))
            .map(move |token| self.handle_of(token))
    }

    fn handle_of<'a>(&self, token: &'a str) -> &'a str {
        match self.handle_pattern.captures(token) {
            Ok(Some(caps)) => caps.get(1).map_or("", |m| m.as_str()),
            Ok(None) => "",
            Err(e) => {
                warn!("Mention match error for token '{}': {}", token, e);
                ""
            }
        }
    }
}
