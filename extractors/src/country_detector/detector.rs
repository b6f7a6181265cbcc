use super::{builtin_aliases, STOPLIST};
use regex::Regex;
use std::collections::BTreeSet;

#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("Alias table is empty after applying the stoplist")]
    EmptyAliasTable,

    #[error("Failed to compile country pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Finds country references in free text by word-bounded alias matching.
///
/// The alias table and the compiled matcher are built once and never change.
/// Matching is literal: no entity resolution and no canonicalization.
pub struct CountryDetector {
    aliases: BTreeSet<String>,
    pattern: Regex,
}

impl CountryDetector {
    /// Detector over the built-in ISO names and colloquial aliases
    pub fn new() -> Result<Self, DetectorError> {
        Self::from_aliases(builtin_aliases())
    }

    /// Detector over a caller-supplied alias source. The stoplist still applies.
    pub fn from_aliases<I, S>(aliases: I) -> Result<Self, DetectorError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let aliases: BTreeSet<String> = aliases
            .into_iter()
            .map(|alias| alias.as_ref().trim().to_lowercase())
            .filter(|alias| !alias.is_empty())
            .filter(|alias| !STOPLIST.contains(&alias.as_str()))
            .collect();

        if aliases.is_empty() {
            return Err(DetectorError::EmptyAliasTable);
        }

        let pattern = Regex::new(&build_pattern(&aliases))?;
        tracing::debug!(alias_count = aliases.len(), "Country detector ready");

        Ok(Self { aliases, pattern })
    }

    /// Every alias found in `text`, lowercased, in order of appearance.
    /// The same alias is reported once per occurrence.
    pub fn detect(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let matches: Vec<String> = self
            .pattern
            .find_iter(&lowered)
            .map(|m| m.as_str().to_string())
            .collect();

        if !matches.is_empty() {
            tracing::debug!(countries = ?matches, "Found countries in message");
        }

        matches
    }

    /// Keep only messages with at least one country reference, paired with their matches.
    pub fn filter<M, I>(&self, messages: I) -> Vec<(M, Vec<String>)>
    where
        I: IntoIterator<Item = M>,
        M: AsRef<str>,
    {
        let mut total = 0usize;
        let mut filtered = Vec::new();

        for message in messages {
            total += 1;
            let countries = self.detect(message.as_ref());
            if !countries.is_empty() {
                filtered.push((message, countries));
            }
        }

        tracing::info!(
            "Filtered {} messages with country references from {} total",
            filtered.len(),
            total
        );

        filtered
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.aliases.contains(&alias.to_lowercase())
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.aliases.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Longest aliases first, so "united states of america" beats "united states"
/// when both start at the same position.
fn build_pattern(aliases: &BTreeSet<String>) -> String {
    let mut ordered: Vec<&String> = aliases.iter().collect();
    ordered.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));

    let alternatives: Vec<String> = ordered.into_iter().map(|a| bounded(a)).collect();
    alternatives.join("|")
}

/// `\b` only makes sense next to a word character; names like
/// "virgin islands, u.s." end in punctuation and get no trailing boundary.
fn bounded(alias: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let starts_word = alias.chars().next().is_some_and(is_word);
    let ends_word = alias.chars().last().is_some_and(is_word);

    format!(
        "{}{}{}",
        if starts_word { r"\b" } else { "" },
        regex::escape(alias),
        if ends_word { r"\b" } else { "" },
    )
}
