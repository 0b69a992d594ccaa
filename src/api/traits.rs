use async_trait::async_trait;

use super::types::{
    ApiResponse, ChatReply, CreateSessionRequest, SendMessageRequest, UpdateSessionRequest,
    WireMessage,
};
use crate::session::Session;
use crate::utils::Result;

/// REST surface of the counseling backend
///
/// `Err` means the request never produced a readable envelope (transport
/// failure, undecodable body). Backend-reported failures come back as
/// `Ok` with `success: false`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// `POST /chat/message`
    async fn send_message(&self, request: &SendMessageRequest) -> Result<ApiResponse<ChatReply>>;

    /// `GET /chat/sessions`
    async fn list_sessions(&self) -> Result<ApiResponse<Vec<Session>>>;

    /// `GET /chat/sessions/{id}`
    async fn get_session(&self, id: &str) -> Result<ApiResponse<Session>>;

    /// `GET /chat/sessions/{id}/messages`
    async fn get_session_messages(&self, id: &str) -> Result<ApiResponse<Vec<WireMessage>>>;

    /// `POST /chat/sessions`
    async fn create_session(&self, request: &CreateSessionRequest)
        -> Result<ApiResponse<Session>>;

    /// `PATCH /chat/sessions/{id}`
    async fn update_session(
        &self,
        id: &str,
        request: &UpdateSessionRequest,
    ) -> Result<ApiResponse<Session>>;

    /// `DELETE /chat/sessions/{id}`
    async fn delete_session(&self, id: &str) -> Result<ApiResponse<serde_json::Value>>;
}
