use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// Optional details attached to a message by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context_tags: Vec<String>,
    /// Follow-up prompts offered with an assistant reply
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl MessageMetadata {
    pub fn is_empty(&self) -> bool {
        self.model.is_none()
            && self.tokens.is_none()
            && self.context_tags.is_empty()
            && self.suggestions.is_empty()
    }
}

/// A single chat message. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        role: MessageRole,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            timestamp,
            metadata: None,
        }
    }

    /// Attach metadata, dropping it when there is nothing in it
    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = (!metadata.is_empty()).then_some(metadata);
        self
    }
}

/// A conversation as listed by the backend
///
/// The messages of the active session are held by the session store,
/// not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_count: Option<usize>,
}

impl Session {
    /// Placeholder used when the backend names a session we could not fetch
    pub fn placeholder(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            created_at: now,
            updated_at: now,
            user_id: None,
            message_count: None,
        }
    }

    /// Get a summary for display
    pub fn summary(&self) -> String {
        let count = self
            .message_count
            .map(|n| format!(" | {} messages", n))
            .unwrap_or_default();
        format!(
            "{} | {}{}",
            self.updated_at.format("%Y-%m-%d %H:%M"),
            self.title,
            count
        )
    }
}
