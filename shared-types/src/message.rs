use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single chat message as delivered by a message source.
///
/// Only `text` takes part in extraction. `sent_at` is kept for display and for
/// window filtering inside sources that know it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    pub sent_at: Option<DateTime<Utc>>,
}

impl ChatMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sent_at: None,
        }
    }

    pub fn with_timestamp(text: impl Into<String>, sent_at: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            sent_at: Some(sent_at),
        }
    }

    /// First `max_chars` characters, for log lines.
    pub fn preview(&self, max_chars: usize) -> String {
        truncate_chars(&self.text, max_chars)
    }
}

impl AsRef<str> for ChatMessage {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl From<&str> for ChatMessage {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for ChatMessage {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// Truncate on a char boundary, appending "..." when anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
