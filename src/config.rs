//! Runtime settings, assembled once at startup and passed down explicitly.
//!
//! Layering, lowest to highest priority:
//! 1. Built-in defaults
//! 2. The optional YAML file (`--config`)
//! 3. Command-line flags
//!
//! The API key only ever comes from the environment, through a lookup
//! function so tests can supply it without touching process state.

use crate::cli::Cli;
use crate::error::ConfigError;
use crate::models::GenerationConfig;
use crate::tools::SearchToolDialect;
use itertools::Itertools;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Environment variable holding the Gemini API key.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

pub const DEFAULT_MODELS: &[&str] = &["gemini-2.0-flash", "gemini-2.5-flash", "gemini-1.5-flash"];
pub const DEFAULT_OUTPUT: &str = "index.html";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_API_VERSION: &str = "v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_RETRIES: usize = 1;
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 2_000;

/// Contents of the optional YAML config file. Every key may be omitted.
///
/// ```yaml
/// models: [gemini-2.5-flash, gemini-2.0-flash]
/// search_tool: auto
/// output: public/index.html
/// generation:
///   temperature: 0.5
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub models: Option<Vec<String>>,
    pub generation: Option<GenerationConfig>,
    pub search_tool: Option<SearchToolDialect>,
    pub output: Option<PathBuf>,
    pub api_base: Option<String>,
    pub api_version: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<usize>,
    pub retry_base_delay_ms: Option<u64>,
}

impl FileConfig {
    /// Read and parse a YAML config file.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file deserializes to null, not to an empty mapping.
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }
}

/// Fully resolved settings for one run.
#[derive(Clone)]
pub struct Settings {
    pub api_key: String,
    /// Ordered, de-duplicated, never empty.
    pub candidates: Vec<String>,
    pub generation: GenerationConfig,
    pub search_tool: SearchToolDialect,
    pub output: PathBuf,
    pub api_base: Url,
    pub api_version: String,
    pub timeout: Duration,
    pub max_retries: usize,
    pub retry_base_delay: Duration,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"<redacted>")
            .field("candidates", &self.candidates)
            .field("generation", &self.generation)
            .field("search_tool", &self.search_tool)
            .field("output", &self.output)
            .field("api_base", &self.api_base.as_str())
            .field("api_version", &self.api_version)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay", &self.retry_base_delay)
            .finish()
    }
}

impl Settings {
    /// Merge defaults, the config file and CLI flags, then read the credential.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingCredential`] if `lookup(API_KEY_VAR)` is absent or blank
    /// - [`ConfigError::NoCandidates`] if the merged model list is empty
    /// - [`ConfigError::BadBaseUrl`] if `api_base` does not parse
    pub fn resolve<F>(cli: &Cli, file: FileConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ConfigError::MissingCredential {
                var: API_KEY_VAR.to_string(),
            })?;

        let models = if !cli.models.is_empty() {
            cli.models.clone()
        } else if let Some(models) = file.models {
            models
        } else {
            DEFAULT_MODELS.iter().map(|m| m.to_string()).collect()
        };
        let candidates = normalize_candidates(models);
        if candidates.is_empty() {
            return Err(ConfigError::NoCandidates);
        }

        let raw_base = file.api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let api_base = Url::parse(&raw_base).map_err(|source| ConfigError::BadBaseUrl {
            url: raw_base.clone(),
            source,
        })?;

        let settings = Self {
            api_key,
            candidates,
            generation: file.generation.unwrap_or_default(),
            search_tool: cli.search_tool.or(file.search_tool).unwrap_or_default(),
            output: cli
                .output
                .clone()
                .or(file.output)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            api_base,
            api_version: file
                .api_version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            timeout: Duration::from_secs(
                cli.timeout_secs
                    .or(file.timeout_secs)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            max_retries: cli
                .max_retries
                .or(file.max_retries)
                .unwrap_or(DEFAULT_MAX_RETRIES),
            retry_base_delay: Duration::from_millis(
                file.retry_base_delay_ms
                    .unwrap_or(DEFAULT_RETRY_BASE_DELAY_MS),
            ),
        };
        debug!(?settings, "Resolved settings");
        Ok(settings)
    }
}

/// Trim, drop a leading `models/`, remove blanks and duplicates, keep order.
fn normalize_candidates(models: Vec<String>) -> Vec<String> {
    models
        .into_iter()
        .map(|m| {
            let m = m.trim();
            m.strip_prefix("models/").unwrap_or(m).to_string()
        })
        .filter(|m| !m.is_empty())
        .unique()
        .collect()
}
