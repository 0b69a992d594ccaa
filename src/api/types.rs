use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::context::ChatContext;
use crate::session::{Message, MessageMetadata, MessageRole};
use crate::utils::{CounselError, Result};

/// Envelope wrapping every backend response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    // No serde(default) here: it would add a `T: Default` bound
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
        }
    }

    /// Best human-readable reason for a failed response
    pub fn reason(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "Request failed".to_string())
    }

    /// Unwrap the payload, turning `success: false` or a missing body into an error
    pub fn into_data(self) -> Result<T> {
        if !self.success {
            return Err(CounselError::ApiError(self.reason()));
        }
        self.data
            .ok_or_else(|| CounselError::ApiError("Response carried no data".to_string()))
    }

    /// Check success without requiring a payload
    pub fn into_ack(self) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            Err(CounselError::ApiError(self.reason()))
        }
    }
}

/// Body of `POST /chat/message`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ChatContext>,
}

/// Assistant reply to a sent message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub id: String,
    pub content: String,
    pub role: MessageRole,
    #[serde(default)]
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub metadata: Option<MessageMetadata>,
}

impl ChatReply {
    /// Turn the reply into the message shown in the conversation
    ///
    /// Replies are always rendered as assistant messages.
    pub fn into_message(self) -> Message {
        let mut metadata = self.metadata.unwrap_or_default();
        if metadata.suggestions.is_empty() {
            metadata.suggestions = self.suggestions;
        }
        Message::new(self.id, MessageRole::Assistant, self.content, self.created_at)
            .with_metadata(metadata)
    }
}

/// Message as returned by the history endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    pub id: String,
    pub content: String,
    pub role: MessageRole,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Option<MessageMetadata>,
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        let message = Message::new(wire.id, wire.role, wire.content, wire.created_at);
        match wire.metadata {
            Some(metadata) => message.with_metadata(metadata),
            None => message,
        }
    }
}

/// Body of `POST /chat/sessions`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateSessionRequest {
    pub title: String,
}

/// Body of `PATCH /chat/sessions/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateSessionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}
