use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::retry::RetryContext;
use crate::api::{ApiResponse, ChatApi, CreateSessionRequest, UpdateSessionRequest};
use crate::constants::{DEFAULT_SESSION_TITLE, LOAD_SESSION_ERROR};
use crate::session::{Message, Session, SessionDirectory, SessionStore};
use crate::utils::Result;

/// Everything the chat view reads, behind one lock
///
/// The lock is never held across an `.await`.
pub(super) struct ChatState {
    pub(super) store: SessionStore,
    pub(super) directory: SessionDirectory,
    pub(super) loading: bool,
    pub(super) error: Option<String>,
    pub(super) retry: Option<RetryContext>,
    pub(super) in_flight: Option<CancellationToken>,
    pub(super) suggestions: Vec<String>,
    pub(super) current_page: Option<String>,
}

impl ChatState {
    /// Abort the pending send, if any, so its reply lands nowhere
    pub(super) fn cancel_in_flight(&mut self) {
        if let Some(token) = &self.in_flight {
            debug!("Cancelling in-flight message");
            token.cancel();
        }
    }
}

/// Chat session controller
///
/// Owns the active conversation, the session listing and the send/retry
/// machinery. Share it behind an `Arc` to drive it from several tasks.
pub struct Chat {
    pub(super) api: Arc<dyn ChatApi>,
    pub(super) state: Mutex<ChatState>,
    next_local_id: AtomicU64,
}

impl Chat {
    pub fn new(api: Arc<dyn ChatApi>, store: SessionStore) -> Self {
        Self {
            api,
            state: Mutex::new(ChatState {
                store,
                directory: SessionDirectory::new(),
                loading: false,
                error: None,
                retry: None,
                in_flight: None,
                suggestions: Vec::new(),
                current_page: None,
            }),
            next_local_id: AtomicU64::new(0),
        }
    }

    /// Navigation path reported with every message
    pub fn with_current_page(self, page: impl Into<String>) -> Self {
        self.set_current_page(page);
        self
    }

    pub fn set_current_page(&self, page: impl Into<String>) {
        self.state.lock().current_page = Some(page.into());
    }

    /// Time-based id for messages created on this side
    pub(super) fn next_message_id(&self, prefix: &str) -> String {
        let seq = self.next_local_id.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}-{}", prefix, Utc::now().timestamp_millis(), seq)
    }

    // ---- read side ----

    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().store.messages().to_vec()
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.state.lock().directory.sessions().to_vec()
    }

    pub fn active_session(&self) -> Option<Session> {
        self.state.lock().directory.active().cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    /// Follow-up prompts offered with the latest reply
    pub fn suggestions(&self) -> Vec<String> {
        self.state.lock().suggestions.clone()
    }

    /// Empty the visible conversation and its cache
    pub fn clear_messages(&self) {
        let mut state = self.state.lock();
        state.cancel_in_flight();
        state.store.clear();
        state.suggestions.clear();
        state.error = None;
    }

    // ---- session directory ----

    /// Reload the session listing
    ///
    /// On failure the previous listing is kept and the error returned.
    pub async fn refresh_sessions(&self) -> Result<()> {
        match self.api.list_sessions().await.and_then(ApiResponse::into_data) {
            Ok(sessions) => {
                debug!("Loaded {} sessions", sessions.len());
                self.state.lock().directory.replace_all(sessions);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to refresh sessions: {}", e);
                Err(e)
            }
        }
    }

    /// Start a new conversation and make it active
    pub async fn create_session(&self, title: Option<&str>) -> Result<Session> {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_SESSION_TITLE);
        let request = CreateSessionRequest {
            title: title.to_string(),
        };

        let session = self
            .api
            .create_session(&request)
            .await
            .and_then(ApiResponse::into_data)
            .inspect_err(|e| warn!("Failed to create session: {}", e))?;

        info!("Created session {}", session.id);
        let mut state = self.state.lock();
        state.cancel_in_flight();
        state.directory.insert_active(session.clone());
        state.store.replace(Vec::new());
        state.suggestions.clear();
        Ok(session)
    }

    /// Open an existing conversation with its full history
    ///
    /// On failure the current session stays active and the error flag is set.
    pub async fn switch_session(&self, id: &str) -> Result<()> {
        let (session, messages) = tokio::join!(
            self.api.get_session(id),
            self.api.get_session_messages(id)
        );
        let loaded = session
            .and_then(ApiResponse::into_data)
            .and_then(|s| messages.and_then(ApiResponse::into_data).map(|m| (s, m)));

        match loaded {
            Ok((session, messages)) => {
                info!("Switched to session {} ({} messages)", session.id, messages.len());
                let mut state = self.state.lock();
                state.cancel_in_flight();
                state.directory.set_active(session);
                state
                    .store
                    .replace(messages.into_iter().map(Message::from).collect());
                state.suggestions.clear();
                state.error = None;
                Ok(())
            }
            Err(e) => {
                warn!("Failed to load session {}: {}", id, e);
                self.state.lock().error = Some(LOAD_SESSION_ERROR.to_string());
                Err(e)
            }
        }
    }

    /// Delete a conversation; closes it if it was open
    pub async fn delete_session(&self, id: &str) -> Result<()> {
        self.api
            .delete_session(id)
            .await
            .and_then(ApiResponse::into_ack)
            .inspect_err(|e| warn!("Failed to delete session {}: {}", id, e))?;

        info!("Deleted session {}", id);
        let mut state = self.state.lock();
        if state.directory.remove(id) {
            state.cancel_in_flight();
            state.store.clear();
            state.suggestions.clear();
        }
        Ok(())
    }

    /// Change a conversation's title
    pub async fn rename_session(&self, id: &str, title: &str) -> Result<Session> {
        let request = UpdateSessionRequest {
            title: Some(title.to_string()),
        };
        let session = self
            .api
            .update_session(id, &request)
            .await
            .and_then(ApiResponse::into_data)
            .inspect_err(|e| warn!("Failed to rename session {}: {}", id, e))?;

        self.state.lock().directory.update(session.clone());
        Ok(session)
    }
}
