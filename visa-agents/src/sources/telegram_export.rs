use super::{MessageSource, SourceError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::ChatMessage;
use std::path::{Path, PathBuf};

/// Reads messages from a Telegram Desktop JSON export (`result.json`).
///
/// Both export flavours are supported: a single-chat export, and a full
/// account export where chats live under `chats.list` and one is picked by id
/// or name.
pub struct TelegramExportSource {
    path: PathBuf,
    chat_id: Option<String>,
}

/// One chat in an export, for `list-chats`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatSummary {
    pub name: String,
    pub id: Option<i64>,
    pub chat_type: String,
    pub message_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExportFile {
    Full { chats: ChatList },
    Single(ExportedChat),
}

#[derive(Debug, Deserialize)]
struct ChatList {
    #[serde(default)]
    list: Vec<ExportedChat>,
}

#[derive(Debug, Deserialize)]
struct ExportedChat {
    name: Option<String>,
    #[serde(rename = "type")]
    chat_type: Option<String>,
    id: Option<i64>,
    #[serde(default)]
    messages: Vec<ExportedMessage>,
}

#[derive(Debug, Deserialize)]
struct ExportedMessage {
    #[serde(rename = "type", default)]
    kind: String,
    date: Option<String>,
    date_unixtime: Option<String>,
    #[serde(default)]
    text: MessageText,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessageText {
    Plain(String),
    Rich(Vec<TextPart>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextPart {
    Plain(String),
    Entity { text: String },
}

impl Default for MessageText {
    fn default() -> Self {
        MessageText::Plain(String::new())
    }
}

impl MessageText {
    fn flatten(&self) -> String {
        match self {
            MessageText::Plain(text) => text.clone(),
            MessageText::Rich(parts) => parts
                .iter()
                .map(|part| match part {
                    TextPart::Plain(text) => text.as_str(),
                    TextPart::Entity { text } => text.as_str(),
                })
                .collect(),
        }
    }
}

impl ExportedMessage {
    fn sent_at(&self) -> Option<DateTime<Utc>> {
        if let Some(ts) = self
            .date_unixtime
            .as_deref()
            .and_then(|s| s.parse::<i64>().ok())
        {
            return DateTime::from_timestamp(ts, 0);
        }

        let date = self.date.as_deref()?;
        NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

impl TelegramExportSource {
    /// The export file must exist; anything else is checked at fetch time.
    pub fn open(path: impl Into<PathBuf>, chat_id: Option<String>) -> Result<Self, SourceError> {
        let path = path.into();
        if !path.is_file() {
            return Err(SourceError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a file", path.display()),
            )));
        }

        Ok(Self { path, chat_id })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn list_chats(&self) -> Result<Vec<ChatSummary>, SourceError> {
        let chats = match self.read_export().await? {
            ExportFile::Full { chats } => chats.list,
            ExportFile::Single(chat) => vec![chat],
        };

        Ok(chats
            .iter()
            .map(|chat| ChatSummary {
                name: chat.name.clone().unwrap_or_default(),
                id: chat.id,
                chat_type: chat.chat_type.clone().unwrap_or_default(),
                message_count: chat.messages.len(),
            })
            .collect())
    }

    /// Text messages sent at or after `cutoff`, oldest first.
    pub async fn fetch_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<ChatMessage>, SourceError> {
        let chat = self.select_chat(self.read_export().await?)?;
        tracing::info!(
            chat = chat.name.as_deref().unwrap_or("<unnamed>"),
            "Fetching messages from chat"
        );

        let mut messages: Vec<ChatMessage> = chat
            .messages
            .iter()
            .filter(|message| message.kind == "message")
            .filter_map(|message| {
                let sent_at = message.sent_at()?;
                let text = message.text.flatten();
                (sent_at >= cutoff && !text.trim().is_empty())
                    .then(|| ChatMessage::with_timestamp(text, sent_at))
            })
            .collect();
        messages.sort_by_key(|message| message.sent_at);

        for message in &messages {
            tracing::debug!(preview = %message.preview(50), "Found message");
        }
        tracing::info!("Fetched {} messages", messages.len());

        Ok(messages)
    }

    async fn read_export(&self) -> Result<ExportFile, SourceError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn select_chat(&self, export: ExportFile) -> Result<ExportedChat, SourceError> {
        let mut chats = match export {
            ExportFile::Single(chat) => vec![chat],
            ExportFile::Full { chats } => chats.list,
        };

        let Some(wanted) = self.chat_id.as_deref().map(str::trim) else {
            return match <[ExportedChat; 1]>::try_from(chats) {
                Ok([chat]) => Ok(chat),
                Err(chats) => Err(SourceError::ChatNotSelected(chats.len())),
            };
        };

        // Exports store bare ids; only the wanted id may carry a peer prefix.
        let wanted_id = normalize_chat_id(wanted);
        let wanted_name = wanted.trim_start_matches('@').to_lowercase();
        let has_id =
            |chat: &ExportedChat, id: &str| chat.id.is_some_and(|own| own.to_string() == id);

        let position = chats
            .iter()
            .position(|chat| {
                has_id(chat, wanted)
                    || chat
                        .name
                        .as_deref()
                        .is_some_and(|name| name.to_lowercase() == wanted_name)
            })
            .or_else(|| chats.iter().position(|chat| has_id(chat, wanted_id.as_str())));

        match position {
            Some(index) => Ok(chats.swap_remove(index)),
            None => Err(SourceError::ChatNotFound(wanted.to_string())),
        }
    }
}

/// Oldest send time still inside a window of `window_days` ending at `now`.
///
/// Windows reaching past the representable range cover the whole export.
pub fn window_cutoff(now: DateTime<Utc>, window_days: u32) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::days(i64::from(window_days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[async_trait]
impl MessageSource for TelegramExportSource {
    async fn fetch_recent_messages(&self, window_days: u32) -> Vec<ChatMessage> {
        match self.fetch_since(window_cutoff(Utc::now(), window_days)).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::error!(path = %self.path.display(), "Error fetching messages: {}", e);
                Vec::new()
            }
        }
    }
}

/// Bot-API style ids carry a `-100` prefix for supergroups and channels;
/// exports store the bare id.
pub fn normalize_chat_id(chat_id: &str) -> String {
    let trimmed = chat_id.trim();
    let bare = trimmed
        .strip_prefix("-100")
        .or_else(|| trimmed.strip_prefix("100"))
        .unwrap_or(trimmed);
    bare.trim_start_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SINGLE_CHAT: &str = r#"{
        "name": "RTD Travelers",
        "type": "private_supergroup",
        "id": 1234567890,
        "messages": [
            {"id": 1, "type": "service", "date": "2026-10-01T09:00:00", "action": "create_group", "text": ""},
            {"id": 2, "type": "message", "date": "2026-10-10T10:00:00", "date_unixtime": "1791626400", "text": "Just entered Germany with RTD"},
            {"id": 3, "type": "message", "date": "2026-10-12T11:30:00", "text": ["UK requires visa through ", {"type": "bold", "text": "VFS"}]},
            {"id": 4, "type": "message", "date": "2026-10-13T08:00:00", "text": ""},
            {"id": 5, "type": "message", "date": "2026-09-01T08:00:00", "text": "Old news about Japan"}
        ]
    }"#;

    fn export_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn cutoff() -> DateTime<Utc> {
        NaiveDateTime::parse_from_str("2026-10-05T00:00:00", "%Y-%m-%dT%H:%M:%S")
            .unwrap()
            .and_utc()
    }

    #[tokio::test]
    async fn test_single_chat_export_window_and_text() {
        let file = export_file(SINGLE_CHAT);
        let source = TelegramExportSource::open(file.path(), None).unwrap();

        let messages = source.fetch_since(cutoff()).await.unwrap();
        let texts: Vec<&str> = messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Just entered Germany with RTD", "UK requires visa through VFS"]
        );
        assert!(messages.iter().all(|m| m.sent_at.is_some()));
    }

    #[tokio::test]
    async fn test_full_export_selects_chat_by_prefixed_id() {
        let full = format!(
            r#"{{"about": "export", "chats": {{"about": "", "list": [
                {{"name": "Family", "type": "personal_chat", "id": 42, "messages": []}},
                {}
            ]}}}}"#,
            SINGLE_CHAT
        );
        let file = export_file(&full);

        let source =
            TelegramExportSource::open(file.path(), Some("-1001234567890".to_string())).unwrap();
        let messages = source.fetch_since(cutoff()).await.unwrap();
        assert_eq!(messages.len(), 2);

        let chats = source.list_chats().await.unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[1].name, "RTD Travelers");
        assert_eq!(chats[1].message_count, 5);
    }

    #[tokio::test]
    async fn test_full_export_requires_selection() {
        let file = export_file(
            r#"{"chats": {"list": [
                {"name": "A", "id": 1, "messages": []},
                {"name": "B", "id": 2, "messages": []}
            ]}}"#,
        );
        let source = TelegramExportSource::open(file.path(), None).unwrap();
        assert!(matches!(
            source.fetch_since(cutoff()).await,
            Err(SourceError::ChatNotSelected(2))
        ));

        let source = TelegramExportSource::open(file.path(), Some("@b".to_string())).unwrap();
        assert!(source.fetch_since(cutoff()).await.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_failure_yields_empty() {
        let file = export_file("not json at all");
        let source = TelegramExportSource::open(file.path(), None).unwrap();
        assert!(source.fetch_recent_messages(7).await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_chat() {
        let file = export_file(SINGLE_CHAT);
        let source = TelegramExportSource::open(file.path(), Some("999".to_string())).unwrap();
        assert!(matches!(
            source.fetch_since(cutoff()).await,
            Err(SourceError::ChatNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_window_bounds() {
        let file = export_file(SINGLE_CHAT);
        let source = TelegramExportSource::open(file.path(), None).unwrap();

        assert!(source.fetch_recent_messages(0).await.is_empty());
        assert_eq!(source.fetch_recent_messages(u32::MAX).await.len(), 3);
    }

    #[test]
    fn test_window_cutoff() {
        let now = cutoff();
        assert_eq!(window_cutoff(now, 0), now);
        assert_eq!(
            window_cutoff(now, 4),
            NaiveDateTime::parse_from_str("2026-10-01T00:00:00", "%Y-%m-%dT%H:%M:%S")
                .unwrap()
                .and_utc()
        );
        assert_eq!(window_cutoff(now, u32::MAX), DateTime::<Utc>::MIN_UTC);
    }

    #[tokio::test]
    async fn test_chat_ids_sharing_a_suffix_do_not_collide() {
        let file = export_file(
            r#"{"chats": {"list": [
                {"name": "Long", "id": 1007, "messages": [
                    {"type": "message", "date": "2026-10-10T10:00:00", "text": "from 1007"}
                ]},
                {"name": "Short", "id": 7, "messages": [
                    {"type": "message", "date": "2026-10-10T10:00:00", "text": "from 7"}
                ]}
            ]}}"#,
        );
        let first_text = |chat_id: &str| {
            let source =
                TelegramExportSource::open(file.path(), Some(chat_id.to_string())).unwrap();
            async move { source.fetch_since(cutoff()).await.unwrap()[0].text.clone() }
        };

        assert_eq!(first_text("7").await, "from 7");
        assert_eq!(first_text("1007").await, "from 1007");
        assert_eq!(first_text("-1001007").await, "from 1007");
        assert_eq!(first_text("-1007").await, "from 7");
    }

    #[test]
    fn test_open_missing_file() {
        assert!(TelegramExportSource::open("/nonexistent/result.json", None).is_err());
    }

    #[test]
    fn test_normalize_chat_id() {
        assert_eq!(normalize_chat_id("-1001234567890"), "1234567890");
        assert_eq!(normalize_chat_id("1001234567890"), "1234567890");
        assert_eq!(normalize_chat_id("1234567890"), "1234567890");
        assert_eq!(normalize_chat_id(" -42 "), "42");
    }
}
