//! Command-line interface definitions for the AI news digest.
//!
//! Every option is optional. Running the binary with no arguments reads the
//! API key from `GEMINI_API_KEY` and writes `index.html` in the working
//! directory, which is what a scheduled job is expected to do.

use crate::tools::SearchToolDialect;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the digest generator.
///
/// Values given here override the YAML config file, which in turn overrides
/// the built-in defaults.
///
/// # Examples
///
/// ```sh
/// # Defaults: gemini-2.0-flash first, output to ./index.html
/// ai_news_digest
///
/// # Custom output and candidate list
/// ai_news_digest -o public/index.html -m gemini-2.5-flash,gemini-2.0-flash
///
/// # Load settings from a file
/// ai_news_digest --config digest.yaml
/// ```
#[derive(Parser, Debug, Default)]
#[command(author, version, about)]
pub struct Cli {
    /// Path of the HTML file to write
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Optional path to a YAML config file
    #[arg(short, long, env = "DIGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Candidate model, tried in order (repeat or separate with commas)
    #[arg(short = 'm', long = "model", value_delimiter = ',')]
    pub models: Vec<String>,

    /// How to declare the web search tool
    #[arg(long, value_enum)]
    pub search_tool: Option<SearchToolDialect>,

    /// HTTP timeout for each request, in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Retries for transient generation failures
    #[arg(long)]
    pub max_retries: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_no_arguments() {
        let cli = Cli::parse_from(["ai_news_digest"]);

        // `config` is left out: it may come from DIGEST_CONFIG in the environment.
        assert!(cli.output.is_none());
        assert!(cli.models.is_empty());
        assert!(cli.search_tool.is_none());
        assert!(cli.max_retries.is_none());
        assert!(cli.timeout_secs.is_none());
    }

    #[test]
    fn test_cli_models_comma_and_repeat() {
        let cli = Cli::parse_from([
            "ai_news_digest",
            "-m",
            "gemini-2.5-flash,gemini-2.0-flash",
            "--model",
            "gemini-1.5-flash",
        ]);

        assert_eq!(
            cli.models,
            vec!["gemini-2.5-flash", "gemini-2.0-flash", "gemini-1.5-flash"]
        );
    }

    #[test]
    fn test_cli_search_tool_and_output() {
        let cli = Cli::parse_from([
            "ai_news_digest",
            "--output",
            "/tmp/site/index.html",
            "--search-tool",
            "google-search-retrieval",
            "--timeout-secs",
            "30",
        ]);

        assert_eq!(cli.output, Some(PathBuf::from("/tmp/site/index.html")));
        assert_eq!(
            cli.search_tool,
            Some(SearchToolDialect::GoogleSearchRetrieval)
        );
        assert_eq!(cli.timeout_secs, Some(30));
    }
}
