//! Command handler implementation.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use super::types::{BotCommand, CommandResult};
use crate::ads::{AdCatalog, parse_ads};
use crate::config::SheetBook;
use crate::inline::UserSessions;

/// Handles admin commands against the running bot.
pub struct CommandHandler {
    /// Command prefix (e.g., "`/ads`").
    prefix: String,

    /// Category catalog served to queries.
    catalog: Arc<AdCatalog>,

    /// Open user sessions.
    sessions: Arc<UserSessions>,

    /// Path to the sheets file (for reloading).
    sheets_path: PathBuf,

    /// Threshold applied to reloaded indexes.
    match_threshold: f64,
}

impl CommandHandler {
    /// Creates a new command handler.
    #[must_use]
    pub fn new(
        prefix: String,
        catalog: Arc<AdCatalog>,
        sessions: Arc<UserSessions>,
        sheets_path: PathBuf,
        match_threshold: f64,
    ) -> Self {
        Self {
            prefix,
            catalog,
            sessions,
            sheets_path,
            match_threshold,
        }
    }

    /// Tries to parse and execute a command from an input line.
    ///
    /// Returns `None` if the line is not a command.
    pub async fn try_handle(&self, line: &str) -> Option<CommandResult> {
        let command = BotCommand::parse(line, &self.prefix)?;

        debug!("Handling command: {}", command);
        let result = self.execute(command).await;
        info!("Command result: success={}", result.success);

        Some(result)
    }

    /// Checks if a line is addressed to this handler.
    #[must_use]
    pub fn is_command(&self, line: &str) -> bool {
        line.trim_start().starts_with(&self.prefix)
    }

    /// Executes a parsed command.
    async fn execute(&self, command: BotCommand) -> CommandResult {
        match command {
            BotCommand::Categories => self.handle_categories().await,
            BotCommand::Match(text) => self.handle_match(&text).await,
            BotCommand::Reload => self.handle_reload().await,
            BotCommand::Sessions => self.handle_sessions(),
            BotCommand::End(user_id) => self.handle_end(user_id),
            BotCommand::Help => self.handle_help(),
            BotCommand::Info => self.handle_info().await,
        }
    }

    async fn handle_categories(&self) -> CommandResult {
        let index = self.catalog.snapshot().await;

        if index.is_empty() {
            return CommandResult::error("No categories loaded.");
        }

        let mut lines = vec!["Categories:".to_owned()];
        for title in index.titles() {
            let detail = match index.get(title).map(|sheet| parse_ads(&sheet.records)) {
                Some(Ok(parsed)) if parsed.skipped.is_empty() => format!("{} ads", parsed.ads.len()),
                Some(Ok(parsed)) => format!(
                    "{} ads, {} skipped",
                    parsed.ads.len(),
                    parsed.skipped.len()
                ),
                Some(Err(e)) => format!("✗ {e}"),
                None => "missing".to_owned(),
            };
            lines.push(format!("  {title} ({detail})"));
        }

        CommandResult::success(lines.join("\n"))
    }

    async fn handle_match(&self, text: &str) -> CommandResult {
        let index = self.catalog.snapshot().await;

        if index.is_empty() {
            return CommandResult::error("No categories loaded.");
        }

        let threshold = index.min_ratio();
        let mut lines = vec![format!("Scores for \"{text}\" (threshold {threshold:.2}):")];

        for (position, candidate) in index.rank(text).iter().enumerate() {
            let marker = if position == 0 && candidate.score > threshold {
                "→ "
            } else {
                "  "
            };
            lines.push(format!("{marker}{:.3} {}", candidate.score, candidate.title));
        }

        CommandResult::success(lines.join("\n"))
    }

    async fn handle_reload(&self) -> CommandResult {
        match SheetBook::load_from_file(&self.sheets_path) {
            Ok(book) => {
                if let Err(e) = book.validate() {
                    return CommandResult::error(format!("Validation failed: {e}"));
                }

                let new_len = book.len();
                let old_len = self
                    .catalog
                    .reload(book.to_index(self.match_threshold))
                    .await;

                CommandResult::success(format!(
                    "✓ Reloaded sheets. {old_len} → {new_len} categories."
                ))
            }
            Err(e) => CommandResult::error(format!("Failed to reload: {e}")),
        }
    }

    fn handle_sessions(&self) -> CommandResult {
        CommandResult::success(format!(
            "Sessions: {} open, {} pending",
            self.sessions.len(),
            self.sessions.pending()
        ))
    }

    fn handle_end(&self, user_id: i64) -> CommandResult {
        if self.sessions.end_session(user_id) {
            CommandResult::success(format!("✓ Ended session for user {user_id}."))
        } else {
            CommandResult::error(format!("No session for user {user_id}."))
        }
    }

    fn handle_help(&self) -> CommandResult {
        let mut lines = vec![
            format!("Ad Bot Commands (prefix: {})", self.prefix),
            String::new(),
        ];

        for (cmd, aliases, desc) in BotCommand::all_commands() {
            let alias_str = if aliases.is_empty() {
                String::new()
            } else {
                format!(" {aliases}")
            };
            lines.push(format!("  {cmd}{alias_str} - {desc}"));
        }

        lines.push(String::new());
        lines.push("Queries: <user_id> <text>".to_owned());

        CommandResult::success(lines.join("\n"))
    }

    async fn handle_info(&self) -> CommandResult {
        let categories = self.catalog.snapshot().await.len();

        CommandResult::success(format!(
            "{} v{}\n\
             Categories: {categories}\n\
             Sheets file: {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            self.sheets_path.display()
        ))
    }
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler")
            .field("prefix", &self.prefix)
            .field("sheets_path", &self.sheets_path)
            .finish_non_exhaustive()
    }
}
