use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "counsel")]
#[command(version)]
#[command(about = "Career-counseling chat client", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Backend base URL (overrides configuration)
    #[arg(long, env = "COUNSEL_API_URL")]
    pub api_url: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Page path reported to the counselor with each message
    #[arg(long)]
    pub page: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize configuration
    Init,
    /// List your chat sessions
    Sessions,
    /// Send a single message and print the reply
    Send {
        /// Message text
        message: String,
        /// Session to send into (a new one is created by the backend if omitted)
        #[arg(short, long)]
        session: Option<String>,
        /// Extra instructions for the counselor
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Start an interactive chat (default)
    Chat {
        /// Open this session instead of the cached conversation
        #[arg(short, long)]
        session: Option<String>,
    },
}
