/// Session management module - Gateway

mod cache;
mod directory;
mod message;
mod store;

pub use cache::{FileMessageCache, MemoryMessageCache, MessageCache};
pub use directory::SessionDirectory;
pub use message::{Message, MessageMetadata, MessageRole, Session};
pub use store::SessionStore;
