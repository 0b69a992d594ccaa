use anyhow::Result;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    chat::{Chat, SendOutcome},
    cli::{list_sessions, print_message},
};

/// One line of user input in the chat loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    Send(String),
    New(Option<String>),
    Sessions,
    Switch(String),
    Rename(String, String),
    Delete(String),
    Retry,
    Clear,
    Help,
    Quit,
    Unknown(String),
}

/// Parse a line typed at the prompt
pub fn parse_input(line: &str) -> InputCommand {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return InputCommand::Send(line.to_string());
    };

    let (cmd, arg) = match rest.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (rest, ""),
    };
    let arg_opt = (!arg.is_empty()).then(|| arg.to_string());

    match (cmd, arg_opt) {
        ("new", title) => InputCommand::New(title),
        ("sessions" | "ls", _) => InputCommand::Sessions,
        ("switch" | "open", Some(id)) => InputCommand::Switch(id),
        ("rename", Some(arg)) => match arg.split_once(char::is_whitespace) {
            Some((id, title)) => InputCommand::Rename(id.to_string(), title.trim().to_string()),
            None => InputCommand::Unknown(line.to_string()),
        },
        ("delete" | "rm", Some(id)) => InputCommand::Delete(id),
        ("retry", _) => InputCommand::Retry,
        ("clear", _) => InputCommand::Clear,
        ("help" | "?", _) => InputCommand::Help,
        ("quit" | "exit" | "q", _) => InputCommand::Quit,
        _ => InputCommand::Unknown(line.to_string()),
    }
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  /new [title]          start a new session");
    println!("  /sessions             list sessions");
    println!("  /switch <id>          open a session");
    println!("  /rename <id> <title>  rename a session");
    println!("  /delete <id>          delete a session");
    println!("  /retry                resend the last message");
    println!("  /clear                clear the conversation");
    println!("  /quit                 exit");
    println!();
}

fn print_outcome(chat: &Chat, outcome: SendOutcome) {
    match outcome {
        SendOutcome::Delivered(reply) => print_message(&reply),
        SendOutcome::Failed(_) => {
            if let Some(last) = chat.messages().last() {
                print_message(last);
            }
            if let Some(error) = chat.error() {
                eprintln!("{} {}", "error:".red().bold(), error);
                eprintln!("{}", "type /retry to send it again".dimmed());
            }
        }
        SendOutcome::Rejected => {}
        SendOutcome::Cancelled => eprintln!("{}", "message cancelled".dimmed()),
        SendOutcome::Discarded(id) => {
            eprintln!("{} reply {} was already shown", "warning:".yellow().bold(), id)
        }
    }
}

/// Interactive chat loop on stdin/stdout
pub async fn run_interactive(chat: &Chat, session: Option<&str>) -> Result<()> {
    if let Some(id) = session {
        if let Err(e) = chat.switch_session(id).await {
            eprintln!("{} {}", "error:".red().bold(), e);
        }
    }

    // Sessions listing is best-effort at startup
    let _ = chat.refresh_sessions().await;

    println!("{}", "Career counselor chat. Type /help for commands.".cyan());
    for message in chat.messages() {
        print_message(&message);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_input(&line) {
            InputCommand::Send(text) => {
                if text.is_empty() {
                    continue;
                }
                let outcome = chat.send_message(&text, None).await;
                print_outcome(chat, outcome);
            }
            InputCommand::Retry => {
                let outcome = chat.retry().await;
                print_outcome(chat, outcome);
            }
            InputCommand::New(title) => match chat.create_session(title.as_deref()).await {
                Ok(session) => println!("Started session {}", session.id.cyan()),
                Err(e) => eprintln!("{} {}", "error:".red().bold(), e),
            },
            InputCommand::Sessions => {
                if let Err(e) = list_sessions(chat).await {
                    eprintln!("{} {}", "error:".red().bold(), e);
                }
            }
            InputCommand::Switch(id) => match chat.switch_session(&id).await {
                Ok(()) => {
                    for message in chat.messages() {
                        print_message(&message);
                    }
                }
                Err(_) => {
                    let reason = chat.error().unwrap_or_default();
                    eprintln!("{} {}", "error:".red().bold(), reason);
                }
            },
            InputCommand::Rename(id, title) => match chat.rename_session(&id, &title).await {
                Ok(session) => println!("Renamed to {}", session.title.cyan()),
                Err(e) => eprintln!("{} {}", "error:".red().bold(), e),
            },
            InputCommand::Delete(id) => match chat.delete_session(&id).await {
                Ok(()) => println!("Deleted {}", id),
                Err(e) => eprintln!("{} {}", "error:".red().bold(), e),
            },
            InputCommand::Clear => {
                chat.clear_messages();
                println!("Conversation cleared.");
            }
            InputCommand::Help => print_help(),
            InputCommand::Quit => break,
            InputCommand::Unknown(input) => {
                eprintln!("Unknown command: {} (try /help)", input);
            }
        }
    }

    Ok(())
}
