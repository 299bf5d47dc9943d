//! Configuration module for the ad bot.
//!
//! Handles loading and validation of the exported category sheets and the
//! runtime settings.

mod settings;
mod sheets;

pub use settings::{BotSettings, ConfigError};
pub use sheets::{SheetBook, SheetError, SheetSummary};
