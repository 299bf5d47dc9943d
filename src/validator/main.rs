//! Standalone validator for exported category sheets.
//!
//! Checks sheet titles and row layout, reports how many ads each category
//! yields, and can dry-run a query against the categories.

use std::process::ExitCode;

use clap::Parser;

use ad_inline_bot::ads::{AdLookup, MIN_MATCH_RATIO};
use ad_inline_bot::config::SheetBook;

/// Category sheet validator.
#[derive(Parser, Debug)]
#[command(name = "validate_sheets")]
#[command(about = "Validates category sheet exports for the ad bot")]
#[command(version)]
struct Args {
    /// Path to the sheets JSON file to validate.
    #[arg(short, long, default_value = "sheets.json")]
    file: String,

    /// Similarity threshold used for the query dry-run.
    #[arg(short, long, default_value_t = MIN_MATCH_RATIO)]
    threshold: f64,

    /// Resolve this query against the sheets after validating.
    #[arg(short, long)]
    query: Option<String>,

    /// Generate an example sheets file at the specified path.
    #[arg(long)]
    generate_example: Option<String>,

    /// Show skipped rows for each sheet.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Handle example generation
    if let Some(output_path) = args.generate_example {
        return generate_example(&output_path);
    }

    let Some(book) = load_and_validate(&args.file, args.verbose) else {
        return ExitCode::FAILURE;
    };

    if let Some(query) = args.query {
        dry_run(&book, &query, args.threshold);
    }

    ExitCode::SUCCESS
}

fn generate_example(output_path: &str) -> ExitCode {
    let example = SheetBook::example();

    match example.save_to_file(output_path) {
        Ok(()) => {
            println!("✓ Example sheets written to: {output_path}");
            println!("\nThe file contains {} example categories.", example.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Failed to write example file: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_and_validate(path: &str, verbose: bool) -> Option<SheetBook> {
    println!("Validating: {path}\n");

    let book = match SheetBook::load_from_file(path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("✗ Failed to load sheets: {e}");
            return None;
        }
    };

    let mut errors = 0;
    let mut total_ads = 0;

    for result in book.validate_all() {
        match result {
            Ok(summary) => {
                total_ads += summary.ads;
                if summary.skipped.is_empty() {
                    println!("[{}] ✓ {} ads", summary.title, summary.ads);
                } else {
                    println!(
                        "[{}] ⚠ {} ads, {} row(s) skipped for empty {}",
                        summary.title,
                        summary.ads,
                        summary.skipped.len(),
                        ad_inline_bot::ads::MESSAGE_FIELD
                    );
                    if verbose {
                        for index in &summary.skipped {
                            println!("  skipped record #{}", index + 1);
                        }
                    }
                }
            }
            Err(e) => {
                errors += 1;
                println!("  ✗ Error: {e}");
            }
        }
    }

    println!();

    let total = book.len();
    if errors == 0 {
        println!("✓ All {total} sheets are valid ({total_ads} ads).");
        Some(book)
    } else {
        println!("✗ Validation failed: {errors} error(s) in {total} sheets");
        None
    }
}

fn dry_run(book: &SheetBook, query: &str, threshold: f64) {
    let index = book.to_index(threshold);

    println!("\nQuery: \"{query}\"");
    for candidate in index.rank(query).iter().take(5) {
        println!("  {:.3} {}", candidate.score, candidate.title);
    }

    match index.lookup(query) {
        AdLookup::Ads { category, ads } => {
            println!("→ {category}: {} ad(s)", ads.len());
            for ad in &ads {
                match ad.media() {
                    Some(url) => println!("  • {} [{url}]", truncate(ad.message(), 40)),
                    None => println!("  • {}", truncate(ad.message(), 40)),
                }
            }
        }
        AdLookup::NoAdsAvailable => println!("→ No category above {threshold:.2}"),
        AdLookup::Misconfigured { category, error } => println!("→ {category} is malformed: {error}"),
    }
}

/// Truncates a string for display.
fn truncate(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_owned()
    } else {
        format!("{}...", chars[..max_len].iter().collect::<String>())
    }
}
