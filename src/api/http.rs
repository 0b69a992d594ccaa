use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::traits::ChatApi;
use super::types::{
    ApiResponse, ChatReply, CreateSessionRequest, SendMessageRequest, UpdateSessionRequest,
    WireMessage,
};
use crate::app::ClientConfig;
use crate::constants::{CHAT_MESSAGE_PATH, CHAT_SESSIONS_PATH};
use crate::session::Session;
use crate::utils::{CounselError, Result};

/// [`ChatApi`] over HTTP
pub struct HttpChatApi {
    client: Client,
    config: ClientConfig,
}

impl HttpChatApi {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut request = self.client.request(method, self.url(path));
        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token);
        }
        request
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<ApiResponse<T>> {
        let response = request.send().await.map_err(|e| {
            CounselError::NetworkError(format!(
                "Failed to reach backend at {}: {}",
                self.config.base_url, e
            ))
        })?;
        let status = response.status();
        let body = response.text().await?;
        debug!("Backend responded {} ({} bytes)", status, body.len());
        decode_envelope(status, &body)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>> {
        self.execute(self.request(Method::GET, path)).await
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>> {
        self.execute(self.request(method, path).json(body)).await
    }
}

/// Interpret a response body as an envelope
///
/// Error statuses that still carry an envelope are passed through so the
/// caller sees the backend's own reason. Anything else on an error status
/// becomes a failed envelope built from the status line.
pub(crate) fn decode_envelope<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
) -> Result<ApiResponse<T>> {
    match serde_json::from_str::<ApiResponse<T>>(body) {
        Ok(envelope) => Ok(envelope),
        Err(_) if !status.is_success() => {
            let reason = status
                .canonical_reason()
                .map(|r| format!("{} {}", status.as_u16(), r))
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            Ok(ApiResponse::failure(reason))
        }
        Err(e) => Err(CounselError::SerializationError(e)),
    }
}

fn session_path(id: &str) -> String {
    format!("{}/{}", CHAT_SESSIONS_PATH, id)
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn send_message(&self, request: &SendMessageRequest) -> Result<ApiResponse<ChatReply>> {
        self.send_json(Method::POST, CHAT_MESSAGE_PATH, request).await
    }

    async fn list_sessions(&self) -> Result<ApiResponse<Vec<Session>>> {
        self.get(CHAT_SESSIONS_PATH).await
    }

    async fn get_session(&self, id: &str) -> Result<ApiResponse<Session>> {
        self.get(&session_path(id)).await
    }

    async fn get_session_messages(&self, id: &str) -> Result<ApiResponse<Vec<WireMessage>>> {
        self.get(&format!("{}/messages", session_path(id))).await
    }

    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<ApiResponse<Session>> {
        self.send_json(Method::POST, CHAT_SESSIONS_PATH, request).await
    }

    async fn update_session(
        &self,
        id: &str,
        request: &UpdateSessionRequest,
    ) -> Result<ApiResponse<Session>> {
        self.send_json(Method::PATCH, &session_path(id), request).await
    }

    async fn delete_session(&self, id: &str) -> Result<ApiResponse<serde_json::Value>> {
        self.execute(self.request(Method::DELETE, &session_path(id))).await
    }
}
