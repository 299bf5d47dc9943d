//! Admin command handling.
//!
//! Processes operator commands typed on the bot console.
//! Commands use the `/ads` prefix by default.

mod handler;
mod types;

pub use handler::CommandHandler;
pub use types::{BotCommand, CommandResult};
