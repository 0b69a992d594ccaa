/// Runtime orchestration module - Gateway
mod interactive;
mod orchestrator;

pub use interactive::{parse_input, run_interactive, InputCommand};
pub use orchestrator::Orchestrator;
