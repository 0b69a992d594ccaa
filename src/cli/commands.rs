use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::Arc;

use crate::{
    api::{ChatContext, HttpChatApi},
    app::{cache_file_path, init_config, ClientConfig, Config},
    chat::{Chat, SendOutcome},
    session::{FileMessageCache, Message, MessageRole, SessionStore},
};

/// Wire a chat controller to the configured backend and cache
pub fn build_chat(config: &Config) -> Result<Chat> {
    let api = HttpChatApi::new(ClientConfig::from_config(config))
        .context("Failed to build HTTP client")?;
    let cache = FileMessageCache::new(cache_file_path(config)?);
    let store = SessionStore::load(Box::new(cache), config.chat.auto_save);

    let chat = Chat::new(Arc::new(api), store);
    if let Some(page) = &config.chat.current_page {
        chat.set_current_page(page.clone());
    }
    Ok(chat)
}

/// Create the default configuration file
pub fn init() -> Result<()> {
    let path = init_config()?;
    println!("Configuration at: {}", path.display());
    Ok(())
}

/// Print the user's sessions
pub async fn list_sessions(chat: &Chat) -> Result<()> {
    chat.refresh_sessions()
        .await
        .context("Failed to load sessions")?;

    let sessions = chat.sessions();
    if sessions.is_empty() {
        println!("No sessions yet.");
        return Ok(());
    }

    let active = chat.active_session().map(|s| s.id);
    for session in sessions {
        let marker = if active.as_deref() == Some(session.id.as_str()) {
            "*".green().to_string()
        } else {
            " ".to_string()
        };
        println!("{} {}  {}", marker, session.id.cyan(), session.summary());
    }
    Ok(())
}

/// Send one message, print the reply, and exit
pub async fn send_once(
    chat: &Chat,
    message: &str,
    session: Option<&str>,
    prompt: Option<String>,
) -> Result<()> {
    if let Some(id) = session {
        chat.switch_session(id)
            .await
            .with_context(|| format!("Failed to open session {}", id))?;
    }

    let context = prompt.map(|p| ChatContext::default().with_prompt(p));
    match chat.send_message(message, context).await {
        SendOutcome::Delivered(reply) => {
            print_message(&reply);
            if let Some(active) = chat.active_session() {
                println!("{}", format!("session: {}", active.id).dimmed());
            }
            Ok(())
        }
        SendOutcome::Failed(reason) => anyhow::bail!("{}", reason),
        SendOutcome::Rejected => anyhow::bail!("Nothing to send"),
        SendOutcome::Cancelled => anyhow::bail!("Send was cancelled"),
        SendOutcome::Discarded(id) => anyhow::bail!("Backend repeated message id {}", id),
    }
}

/// Render a message for the terminal
pub fn print_message(message: &Message) {
    let label = match message.role {
        MessageRole::User => "you".blue().bold(),
        MessageRole::Assistant => "counselor".green().bold(),
        MessageRole::System => "system".yellow().bold(),
    };
    println!("{} {}", label, message.timestamp.format("%H:%M").to_string().dimmed());
    println!("{}\n", message.content);

    if let Some(meta) = &message.metadata {
        for suggestion in &meta.suggestions {
            println!("  {} {}", "->".dimmed(), suggestion.italic());
        }
    }
}
