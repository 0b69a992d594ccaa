use tracing::{debug, warn};

use super::cache::MessageCache;
use super::message::Message;

/// Messages of the active conversation, mirrored to a [`MessageCache`]
pub struct SessionStore {
    messages: Vec<Message>,
    cache: Box<dyn MessageCache>,
    auto_save: bool,
}

impl SessionStore {
    /// Build a store from whatever the cache currently holds
    ///
    /// An unreadable or malformed cache yields an empty conversation.
    pub fn load(cache: Box<dyn MessageCache>, auto_save: bool) -> Self {
        let messages = match cache.read() {
            Ok(Some(payload)) => match serde_json::from_str::<Vec<Message>>(&payload) {
                Ok(messages) => {
                    debug!("Restored {} cached messages", messages.len());
                    messages
                }
                Err(e) => {
                    warn!("Discarding malformed message cache: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read message cache: {}", e);
                Vec::new()
            }
        };

        Self {
            messages,
            cache,
            auto_save,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }

    /// Append a message and persist. Returns false if the id is already present.
    pub fn append(&mut self, message: Message) -> bool {
        if self.contains(&message.id) {
            warn!("Ignoring message with duplicate id {}", message.id);
            return false;
        }
        self.messages.push(message);
        self.persist();
        true
    }

    /// Replace the whole conversation and persist
    pub fn replace(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.persist();
    }

    /// Write the current list through to the cache
    ///
    /// Failures are logged only; the backend holds the real history.
    pub fn persist(&self) {
        if !self.auto_save {
            return;
        }

        let payload = match serde_json::to_string(&self.messages) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to serialize messages for cache: {}", e);
                return;
            }
        };

        if let Err(e) = self.cache.write(&payload) {
            warn!("Failed to write message cache: {}", e);
        }
    }

    /// Empty the conversation and drop the cache entry
    pub fn clear(&mut self) {
        self.messages.clear();
        if let Err(e) = self.cache.remove() {
            warn!("Failed to clear message cache: {}", e);
        }
    }
}
