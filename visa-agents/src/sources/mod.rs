pub mod telegram_export;

pub use telegram_export::{ChatSummary, TelegramExportSource};

use async_trait::async_trait;
use shared_types::ChatMessage;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to read chat export: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse chat export: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Chat {0:?} not found in export")]
    ChatNotFound(String),

    #[error("Export contains {0} chats; set a chat id to pick one")]
    ChatNotSelected(usize),
}

/// Where chat messages come from.
///
/// Sources own their failure handling: a fetch that fails is logged and
/// yields no messages instead of an error.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Messages from the last `window_days` days, oldest first.
    async fn fetch_recent_messages(&self, window_days: u32) -> Vec<ChatMessage>;
}
