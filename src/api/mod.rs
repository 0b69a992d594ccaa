// Gateway module for the backend API - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod context;
mod http;
mod traits;
mod types;

// Public re-exports - the ONLY way to access API functionality
pub use context::{AssessmentResults, ChatContext, Preferences, UserProfile};
pub use http::HttpChatApi;
pub use traits::ChatApi;
#[cfg(test)]
pub use traits::MockChatApi;
pub use types::{
    ApiResponse, ChatReply, CreateSessionRequest, SendMessageRequest, UpdateSessionRequest,
    WireMessage,
};
