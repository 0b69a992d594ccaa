pub mod api;
pub mod app;
pub mod chat;
pub mod cli;
pub mod constants;
pub mod runtime;
pub mod session;
pub mod utils;

pub use api::{ChatApi, ChatContext, HttpChatApi};
pub use app::{load_config, ClientConfig, Config};
pub use chat::{Chat, RetryContext, SendOutcome};
pub use session::{Message, MessageRole, Session, SessionStore};
pub use utils::CounselError;
