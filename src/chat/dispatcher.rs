use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::controller::Chat;
use super::retry::RetryContext;
use crate::api::{ApiResponse, ChatContext, ChatReply, SendMessageRequest};
use crate::constants::{
    APOLOGY_MESSAGE, DEFAULT_SESSION_TITLE, ERROR_MESSAGE_PREFIX, LOCAL_MESSAGE_PREFIX,
    SEND_FAILED_ERROR,
};
use crate::session::{Message, MessageRole, Session};
use crate::utils::{CounselError, Result};

/// What happened to a send
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Empty content or another send in flight; nothing changed
    Rejected,
    /// The assistant reply was appended
    Delivered(Message),
    /// The apology was appended and the error flag set
    Failed(String),
    /// The session changed underneath the send; the reply was dropped
    Cancelled,
    /// The reply reused an id already in the conversation and was not appended
    Discarded(String),
}

impl SendOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SendOutcome::Delivered(_))
    }
}

/// Resets the in-flight state when a send ends, however it ends
struct InFlightGuard<'a>(&'a Chat);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.0.state.lock();
        state.loading = false;
        state.in_flight = None;
    }
}

impl Chat {
    /// Send a user message and append the assistant's reply
    ///
    /// The user's message is shown immediately and stays visible even if
    /// the send fails.
    pub async fn send_message(&self, content: &str, context: Option<ChatContext>) -> SendOutcome {
        let (request, token) = {
            let mut state = self.state.lock();
            if content.trim().is_empty() || state.loading {
                return SendOutcome::Rejected;
            }

            state.loading = true;
            state.error = None;
            state.retry = Some(RetryContext {
                content: content.to_string(),
                context: context.clone(),
            });

            let message = Message::new(
                self.next_message_id(LOCAL_MESSAGE_PREFIX),
                MessageRole::User,
                content,
                Utc::now(),
            );
            state.store.append(message);

            let token = CancellationToken::new();
            state.in_flight = Some(token.clone());

            let context = context
                .unwrap_or_default()
                .or_page(state.current_page.as_deref());
            let request = SendMessageRequest {
                message: content.to_string(),
                session_id: state.directory.active_id().map(str::to_string),
                context: Some(context),
            };
            (request, token)
        };
        // Clears the loading flag even if this future is dropped mid-send
        let _in_flight = InFlightGuard(self);

        debug!(
            "Sending message ({} chars) to session {:?}",
            request.message.len(),
            request.session_id
        );

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = self.api.send_message(&request) => Some(result),
        };

        let outcome = match result {
            Some(result) => {
                self.reconcile(result, &token, request.session_id.is_none())
                    .await
            }
            None => SendOutcome::Cancelled,
        };
        if outcome == SendOutcome::Cancelled {
            info!("Dropped reply for a message sent before the session changed");
        }
        outcome
    }

    async fn reconcile(
        &self,
        result: Result<ApiResponse<ChatReply>>,
        token: &CancellationToken,
        adopt_session: bool,
    ) -> SendOutcome {
        let reply = match result.and_then(ApiResponse::into_data) {
            Ok(reply) => reply,
            Err(e) => return self.fail_send(e, token),
        };

        let session_id = reply.session_id.clone();
        let message = reply.into_message();
        {
            let mut state = self.state.lock();
            if token.is_cancelled() {
                return SendOutcome::Cancelled;
            }
            if !state.store.append(message.clone()) {
                warn!("Reply {} repeats an existing message id", message.id);
                return SendOutcome::Discarded(message.id);
            }
            state.suggestions = message
                .metadata
                .as_ref()
                .map(|m| m.suggestions.clone())
                .unwrap_or_default();
        }

        // The backend opens a session for the first message of a conversation
        if let Some(id) = session_id.filter(|_| adopt_session) {
            self.adopt_session(&id, token).await;
        }

        SendOutcome::Delivered(message)
    }

    fn fail_send(&self, error: CounselError, token: &CancellationToken) -> SendOutcome {
        let mut state = self.state.lock();
        if token.is_cancelled() {
            return SendOutcome::Cancelled;
        }

        warn!("Failed to send message: {}", error);
        let apology = Message::new(
            self.next_message_id(ERROR_MESSAGE_PREFIX),
            MessageRole::Assistant,
            APOLOGY_MESSAGE,
            Utc::now(),
        );
        state.store.append(apology);
        state.error = Some(SEND_FAILED_ERROR.to_string());
        SendOutcome::Failed(error.to_string())
    }

    async fn adopt_session(&self, id: &str, token: &CancellationToken) {
        let session = match self.api.get_session(id).await.and_then(ApiResponse::into_data) {
            Ok(session) => session,
            Err(e) => {
                warn!("Failed to fetch new session {}: {}", id, e);
                Session::placeholder(id, DEFAULT_SESSION_TITLE)
            }
        };

        {
            let mut state = self.state.lock();
            if token.is_cancelled() || state.directory.active().is_some() {
                return;
            }
            info!("Adopted session {}", session.id);
            state.directory.set_active(session);
        }

        // Listing failures are already logged
        let _ = self.refresh_sessions().await;
    }
}
