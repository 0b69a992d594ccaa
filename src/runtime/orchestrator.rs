use anyhow::Result;

use super::interactive::run_interactive;
use crate::{
    app::{load_config, load_config_from, Config},
    cli::{build_chat, init, list_sessions, send_once, Cli, Commands},
};

/// Main runtime orchestrator
pub struct Orchestrator {
    cli: Cli,
    config: Config,
}

impl Orchestrator {
    /// Create a new orchestrator from CLI args
    pub fn new(cli: Cli) -> Result<Self> {
        let mut config = if let Some(config_path) = &cli.config {
            load_config_from(config_path)?
        } else {
            match load_config() {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!("Failed to load config: {}. Using defaults.", e);
                    Config::default()
                }
            }
        };

        // CLI flags override everything else
        if let Some(url) = &cli.api_url {
            config.api.base_url = url.clone();
        }
        if let Some(page) = &cli.page {
            config.chat.current_page = Some(page.clone());
        }

        Ok(Self { cli, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the orchestrator
    pub async fn run(self) -> Result<()> {
        let command = self.cli.command.unwrap_or(Commands::Chat { session: None });

        match command {
            Commands::Init => init(),
            Commands::Sessions => list_sessions(&build_chat(&self.config)?).await,
            Commands::Send {
                message,
                session,
                prompt,
            } => {
                let chat = build_chat(&self.config)?;
                send_once(&chat, &message, session.as_deref(), prompt).await
            }
            Commands::Chat { session } => {
                let chat = build_chat(&self.config)?;
                run_interactive(&chat, session.as_deref()).await
            }
        }
    }
}
