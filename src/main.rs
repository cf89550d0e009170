//! # AI News Digest
//!
//! Asks a search-grounded Gemini model for a single-page HTML dashboard of the
//! last 24 hours of AI news and writes it to a static file, ready to be served
//! as-is. Meant to be run on a schedule by something like cron or a CI job.
//!
//! ## Usage
//!
//! ```sh
//! GEMINI_API_KEY=... ai_news_digest
//! GEMINI_API_KEY=... ai_news_digest -o public/index.html --config digest.yaml
//! ```
//!
//! ## Architecture
//!
//! 1. **Config**: merge defaults, YAML and flags; read the key from the environment
//! 2. **Resolve**: try candidate models in order until one loads
//! 3. **Generate**: one `generateContent` call with web search enabled
//! 4. **Sanitize**: strip markdown fences from the response
//! 5. **Write**: overwrite the output file, with a fallback page on failure

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod models;
mod outputs;
mod pipeline;
mod prompt;
mod report;
mod resolver;
mod tools;
mod utils;

use api::{GeminiClient, RetryGenerate};
use cli::Cli;
use config::{FileConfig, Settings};
use prompt::beijing_timestamp;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("ai_news_digest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // --- Settings: fail fast before any network call ---
    let file = match &args.config {
        Some(path) => FileConfig::load(path).inspect_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to load config file");
        })?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(&args, file, |var| std::env::var(var).ok())
        .inspect_err(|e| error!(error = %e, "Invalid configuration"))?;
    info!(
        candidates = ?settings.candidates,
        output = %settings.output.display(),
        "Configuration loaded"
    );

    let client = GeminiClient::new(&settings)?;
    let backend = RetryGenerate::new(client, settings.max_retries, settings.retry_base_delay);

    let timestamp = beijing_timestamp(Utc::now());
    info!(%timestamp, "Generating daily report");

    let summary = pipeline::run(&backend, &settings, &timestamp)
        .await
        .inspect_err(|e| error!(error = %e, "Failed to write report"))?;

    if summary.degraded {
        warn!(
            path = %summary.path.display(),
            model = ?summary.model,
            "Wrote fallback page instead of a report"
        );
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        path = %summary.path.display(),
        bytes = summary.bytes,
        model = ?summary.model,
        stages = ?summary.stages,
        "Execution complete"
    );

    Ok(())
}
