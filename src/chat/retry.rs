use tracing::debug;

use super::controller::Chat;
use super::dispatcher::SendOutcome;
use crate::api::ChatContext;

/// The last send attempt, kept so it can be resubmitted as-is
///
/// Not cleared after a successful send: retry always means "send the
/// last message again".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryContext {
    pub content: String,
    pub context: Option<ChatContext>,
}

impl Chat {
    pub fn retry_context(&self) -> Option<RetryContext> {
        self.state.lock().retry.clone()
    }

    /// Resend the last attempted message with its original context
    ///
    /// With nothing recorded this sends empty content, which is rejected.
    pub async fn retry(&self) -> SendOutcome {
        let last = self.retry_context().unwrap_or_default();
        debug!("Retrying last message ({} chars)", last.content.len());
        self.send_message(&last.content, last.context).await
    }
}
