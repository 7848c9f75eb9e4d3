//! Main entry point for the Markdown translator CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use md_translator::cli::commands::{handle_translate, TranslateArgs};

/// File collecting warnings and errors of every run
const ERROR_LOG_FILE: &str = "translate-errors.log";

/// Translate Markdown files while keeping code blocks and frontmatter intact
#[derive(Parser, Debug)]
#[command(name = "md-translator", version, about, long_about = None)]
struct Args {
    /// API key (optional, defaults to DEEPL_AUTH_KEY env var)
    #[arg(long)]
    api_key: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(flatten)]
    translate: TranslateArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    // Override config with CLI args if provided
    if let Some(api_key) = &args.api_key {
        std::env::set_var("DEEPL_AUTH_KEY", api_key);
    }

    let debug = args.verbose || std::env::var("TRANSLATE_DEBUG").map(|v| v == "1").unwrap_or(false);
    init_logging(&args.translate.project_root(), debug)?;

    handle_translate(args.translate).await
}

/// Log to stderr and append warnings and errors to the project's error log
fn init_logging(project_root: &Path, debug: bool) -> anyhow::Result<()> {
    let log_level = if debug { "debug" } else { "info" };

    let log_path = project_root.join(ERROR_LOG_FILE);
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| anyhow::anyhow!("Failed to open log file {}: {}", log_path.display(), e))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}={}", env!("CARGO_CRATE_NAME"), log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(log_file))
                .with_ansi(false)
                .with_filter(LevelFilter::WARN),
        )
        .init();

    Ok(())
}
