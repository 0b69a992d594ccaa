/// Constants module to avoid magic strings in the codebase

// Network Configuration
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001/api";
pub const DEFAULT_AUTH_TOKEN_ENV: &str = "COUNSEL_API_TOKEN";

// Timeouts
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 120; // model replies can be slow

// REST endpoints (relative to the base URL)
pub const CHAT_MESSAGE_PATH: &str = "/chat/message";
pub const CHAT_SESSIONS_PATH: &str = "/chat/sessions";

// Local cache
pub const MESSAGE_CACHE_FILE: &str = "chat_messages.json";
pub const LOCAL_CONFIG_DIR: &str = ".counsel";

// Session defaults
pub const DEFAULT_SESSION_TITLE: &str = "New Conversation";

// User-facing text
pub const APOLOGY_MESSAGE: &str =
    "I'm sorry, I encountered an error while processing your message. Please try again.";
pub const SEND_FAILED_ERROR: &str = "Failed to send message. Please try again.";
pub const LOAD_SESSION_ERROR: &str = "Failed to load session";

// Message id prefixes
pub const LOCAL_MESSAGE_PREFIX: &str = "local";
pub const ERROR_MESSAGE_PREFIX: &str = "error";
