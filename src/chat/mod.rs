/// Chat session controller - Gateway

mod controller;
mod dispatcher;
mod retry;

#[cfg(test)]
mod tests;

pub use controller::Chat;
pub use dispatcher::SendOutcome;
pub use retry::RetryContext;
