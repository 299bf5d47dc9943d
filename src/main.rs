//! Ad Inline Bot - Main Entry Point
//!
//! Runs the ad bot behind a line-based console transport: each
//! `<user_id> <query>` line on stdin is an inline query, answers are
//! printed to stdout as JSON lines, and lines starting with the command
//! prefix are admin commands.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use ad_inline_bot::ads::AdCatalog;
use ad_inline_bot::commands::CommandHandler;
use ad_inline_bot::config::{BotSettings, SheetBook};
use ad_inline_bot::heartbeat::{Heartbeat, HeartbeatMessage, ListenerRegistry};
use ad_inline_bot::inline::{InlineAnswer, InlineQuery, QueryResolver, UserSessions};

/// Inline ad bot answering category queries from a sheet export.
#[derive(Parser, Debug)]
#[command(name = "ad_bot")]
#[command(about = "Answer category queries with pre-authored ads")]
#[command(version)]
struct Args {
    /// Path to the sheets JSON export (overrides SHEETS_PATH).
    #[arg(short, long)]
    sheets: Option<PathBuf>,

    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Generate an example sheets file and exit.
    #[arg(long)]
    generate_sheets: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    if args.generate_sheets {
        return generate_example_sheets();
    }

    // Load environment variables
    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let mut settings = BotSettings::from_env_with_defaults();
    if let Some(path) = args.sheets {
        settings.sheets_path = path;
    }
    settings.validate().context("Invalid bot settings")?;

    let book = SheetBook::load_from_file(&settings.sheets_path).with_context(|| {
        format!("Failed to load sheets from {}", settings.sheets_path.display())
    })?;
    book.validate().context("Sheet validation failed")?;

    for result in book.validate_all() {
        if let Err(e) = result {
            warn!("{}", e);
        }
    }

    info!(
        "Loaded {} categories (threshold: {}, debounce: {} ticks)",
        book.len(),
        settings.match_threshold,
        settings.debounce_ticks
    );

    let catalog = Arc::new(AdCatalog::new(book.to_index(settings.match_threshold)));
    let registry = Arc::new(ListenerRegistry::new());

    // Spawn heartbeat task
    let (heartbeat_tx, heartbeat_rx) = mpsc::channel::<HeartbeatMessage>(8);
    let heartbeat = Heartbeat::new(Arc::clone(&registry)).with_interval(settings.tick_interval());
    let heartbeat_handle = tokio::spawn(async move {
        heartbeat.run(heartbeat_rx).await;
    });

    // Spawn resolver and answer printer
    let (sessions, settled_rx) = UserSessions::new(
        Arc::clone(&registry),
        settings.debounce_ticks,
        settings.session_idle_ticks,
    );
    let sessions = Arc::new(sessions);
    sessions.watch_idle().context("Failed to start session eviction")?;
    let (answer_tx, answer_rx) = mpsc::channel::<InlineAnswer>(32);

    let resolver = QueryResolver::new(Arc::clone(&catalog)).with_cache_time(settings.cache_time_secs);
    let resolver_handle = tokio::spawn(resolver.run(settled_rx, answer_tx));
    let printer_handle = tokio::spawn(print_answers(answer_rx));

    let handler = CommandHandler::new(
        settings.command_prefix.clone(),
        Arc::clone(&catalog),
        Arc::clone(&sessions),
        settings.sheets_path.clone(),
        settings.match_threshold,
    );

    info!("Bot is running. Type '{} help' for commands, Ctrl+C to stop.", settings.command_prefix);

    let console_lines = spawn_line_reader(io::BufReader::new(io::stdin()));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        result = read_console(&handler, &sessions, console_lines) => {
            match result {
                Ok(()) => wait_for_pending(&sessions, &settings).await,
                Err(e) => error!("Console input failed: {}", e),
            }
        }
    }

    // Cleanup
    info!("Shutting down...");
    let _ = heartbeat_tx.send(HeartbeatMessage::Shutdown).await;
    let _ = heartbeat_handle.await;

    // Dropping the sessions closes the settled-query channel.
    drop(handler);
    drop(sessions);
    let _ = resolver_handle.await;
    let _ = printer_handle.await;

    Ok(())
}

/// Initializes the logging subsystem. Logs go to stderr so stdout only
/// carries answers.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Generates an example sheets file.
fn generate_example_sheets() -> Result<()> {
    let example = SheetBook::example();
    example.save_to_file("sheets.example.json")?;

    println!("✓ Example sheets written to: sheets.example.json");
    println!("\nTo use this bot:");
    println!("1. Export your ad spreadsheet to sheets.json in the same layout");
    println!("2. One sheet per category, upper-case titles, MESSAGE and MEDIA columns");
    println!("3. Run: ad_bot");
    println!("4. Type queries as: <user_id> <text>");

    Ok(())
}

/// Reads lines on a dedicated thread and forwards them to the returned
/// channel until EOF.
///
/// A blocked read is not owned by the runtime, so shutting down on Ctrl+C
/// never waits for the next line.
fn spawn_line_reader<R>(reader: R) -> mpsc::Receiver<io::Result<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(64);

    let spawned = std::thread::Builder::new()
        .name("console-input".to_owned())
        .spawn(move || {
            for line in reader.lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
        });

    if let Err(e) = spawned {
        error!("Failed to spawn console reader: {}", e);
    }

    rx
}

/// Reads console lines until EOF, dispatching queries and commands.
async fn read_console(
    handler: &CommandHandler,
    sessions: &UserSessions,
    mut lines: mpsc::Receiver<io::Result<String>>,
) -> Result<()> {
    let mut next_query_id: u64 = 0;

    while let Some(line) = lines.recv().await {
        let line = line.context("Failed to read stdin")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if handler.is_command(line) {
            match handler.try_handle(line).await {
                Some(result) if result.success => eprintln!("{}", result.message),
                Some(result) => eprintln!("✗ {}", result.message),
                None => eprintln!("✗ Unknown command: {line}"),
            }
            continue;
        }

        let Some((user_id, text)) = parse_query_line(line) else {
            warn!("Expected '<user_id> <query>', got '{}'", line);
            continue;
        };

        next_query_id += 1;
        let query = InlineQuery::new(next_query_id.to_string(), user_id, text);
        if let Err(e) = sessions.submit(query) {
            error!("Failed to buffer query: {}", e);
        }
    }

    info!("Console input closed");
    Ok(())
}

/// Lets queries typed just before EOF finish their quiet period.
async fn wait_for_pending(sessions: &UserSessions, settings: &BotSettings) {
    let max_waits = settings.debounce_ticks.max(1) + 1;

    for _ in 0..max_waits {
        if sessions.pending() == 0 {
            return;
        }
        tokio::time::sleep(settings.tick_interval()).await;
    }
}

/// Prints answers as JSON lines.
async fn print_answers(mut rx: mpsc::Receiver<InlineAnswer>) {
    while let Some(answer) = rx.recv().await {
        match serde_json::to_string(&answer) {
            Ok(json) => println!("{json}"),
            Err(e) => error!("Failed to serialize answer {}: {}", answer.query_id, e),
        }
    }
}

/// Splits `<user_id> <query>`.
fn parse_query_line(line: &str) -> Option<(i64, &str)> {
    let (user_id, text) = line.split_once(char::is_whitespace)?;
    Some((user_id.parse().ok()?, text.trim()))
}
