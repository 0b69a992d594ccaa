use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_AUTH_TOKEN_ENV, HTTP_REQUEST_TIMEOUT_SECS, LOCAL_CONFIG_DIR,
    MESSAGE_CACHE_FILE,
};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend connection settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Chat session behaviour
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST API, without trailing slash
    pub base_url: String,
    /// Bearer token, takes priority over `auth_token_env`
    pub auth_token: Option<String>,
    /// Environment variable holding the bearer token
    pub auth_token_env: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_token: None,
            auth_token_env: DEFAULT_AUTH_TOKEN_ENV.to_string(),
            timeout_secs: HTTP_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Chat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Mirror the active conversation to the local cache after every change
    pub auto_save: bool,
    /// Override for the message cache location
    pub cache_file: Option<PathBuf>,
    /// Navigation path reported to the backend with each message
    pub current_page: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            auto_save: true,
            cache_file: None,
            current_page: Some("/chat".to_string()),
        }
    }
}

/// Connection settings handed to the API client
///
/// Built once from [`Config`] and passed in explicitly; nothing in the
/// client reads credentials from ambient state.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub auth_token: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token: None,
            timeout: Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve connection settings from configuration
    /// Priority for the token: explicit config value > environment variable > none
    pub fn from_config(config: &Config) -> Self {
        let token = config
            .api
            .auth_token
            .clone()
            .or_else(|| std::env::var(&config.api.auth_token_env).ok())
            .filter(|t| !t.trim().is_empty());

        let client = Self::new(&config.api.base_url)
            .with_timeout(Duration::from_secs(config.api.timeout_secs));
        match token {
            Some(token) => client.with_auth_token(token),
            None => client,
        }
    }
}

/// Load configuration from multiple sources
pub fn load_config() -> Result<Config> {
    let config_dir = get_config_dir()?;
    let global_config = config_dir.join("config.toml");
    let local_config = PathBuf::from(LOCAL_CONFIG_DIR).join("config.toml");

    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if global_config.exists() {
        figment = figment.merge(Toml::file(&global_config));
    }

    if local_config.exists() {
        figment = figment.merge(Toml::file(&local_config));
    }

    // COUNSEL_API__BASE_URL -> api.base_url
    figment = figment.merge(Env::prefixed("COUNSEL_").split("__"));

    figment.extract().context("Failed to load configuration")
}

/// Load configuration from an explicit file, still honouring the environment
pub fn load_config_from(path: &std::path::Path) -> Result<Config> {
    Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("COUNSEL_").split("__"))
        .extract()
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "counsel") {
        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;
        Ok(config_dir.to_path_buf())
    } else {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Could not determine home directory")?;
        let config_dir = PathBuf::from(home).join(".config").join("counsel");
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }
}

/// Resolve where the active conversation is cached
pub fn cache_file_path(config: &Config) -> Result<PathBuf> {
    if let Some(path) = &config.chat.cache_file {
        return Ok(path.clone());
    }

    let data_dir = match ProjectDirs::from("", "", "counsel") {
        Some(dirs) => dirs.data_dir().to_path_buf(),
        None => get_config_dir()?,
    };
    Ok(data_dir.join(MESSAGE_CACHE_FILE))
}

/// Save configuration to file
pub fn save_config(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let path = if let Some(p) = path {
        p
    } else {
        get_config_dir()?.join("config.toml")
    };

    let toml_string = toml::to_string_pretty(config)?;
    std::fs::write(&path, toml_string)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

/// Create a default configuration file if it doesn't exist
pub fn init_config() -> Result<PathBuf> {
    let config_file = get_config_dir()?.join("config.toml");

    if !config_file.exists() {
        save_config(&Config::default(), Some(config_file.clone()))?;
    }

    Ok(config_file)
}
