//! Command types and definitions.

use std::fmt;

/// Available admin commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// List the known categories with their ad counts.
    Categories,

    /// Score every category against a text.
    Match(String),

    /// Reload the category sheets from file.
    Reload,

    /// Show the open user sessions.
    Sessions,

    /// End a user's session.
    End(i64),

    /// Show help information.
    Help,

    /// Show information about the bot.
    Info,
}

impl BotCommand {
    /// Parses a command from an input line.
    ///
    /// Returns `None` if the line is not a valid command.
    #[must_use]
    pub fn parse(text: &str, prefix: &str) -> Option<Self> {
        let text = text.trim();

        let after_prefix = text.strip_prefix(prefix)?.trim_start();

        let (cmd, args) = match after_prefix.split_once(char::is_whitespace) {
            Some((cmd, args)) => (cmd.to_lowercase(), Some(args.trim())),
            None => (after_prefix.to_lowercase(), None),
        };

        match cmd.as_str() {
            "categories" | "cats" | "ls" => Some(Self::Categories),
            "match" | "score" | "m" => args
                .filter(|a| !a.is_empty())
                .map(|a| Self::Match(a.to_owned())),
            "reload" | "refresh" => Some(Self::Reload),
            "sessions" | "status" | "s" => Some(Self::Sessions),
            "end" | "kick" => args.and_then(|a| a.parse().ok()).map(Self::End),
            "help" | "h" | "?" => Some(Self::Help),
            "info" | "about" | "version" => Some(Self::Info),
            _ => None,
        }
    }

    /// Returns the command name as it appears in help.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Match(_) => "match",
            Self::Reload => "reload",
            Self::Sessions => "sessions",
            Self::End(_) => "end",
            Self::Help => "help",
            Self::Info => "info",
        }
    }

    /// Returns all available commands with their descriptions.
    #[must_use]
    pub fn all_commands() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("categories", "(ls)", "List categories and their ad counts"),
            ("match <text>", "(score)", "Score every category against a text"),
            ("reload", "", "Reload category sheets from file"),
            ("sessions", "(s)", "Show open user sessions"),
            ("end <user_id>", "", "End a user's session"),
            ("info", "", "Show bot information"),
            ("help", "(h, ?)", "Show this help message"),
        ]
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Match(text) => write!(f, "match {text}"),
            Self::End(user_id) => write!(f, "end {user_id}"),
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// Result of command execution.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Whether the command was successful.
    pub success: bool,

    /// Response message to show the operator.
    pub message: String,
}

impl CommandResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// Creates an error result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
