//! Error types for each stage of the digest pipeline.
//!
//! Only [`ConfigError`] and [`WriteError`] ever reach `main`. A
//! [`GenerationError`] is always caught at the report boundary and rendered
//! into the fallback page instead of aborting the run.

use std::path::PathBuf;

/// Problems found while assembling [`crate::config::Settings`].
///
/// All of these are raised before any network call is made.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {var} is not set; export a Gemini API key before running")]
    MissingCredential { var: String },

    #[error("candidate model list is empty")]
    NoCandidates,

    #[error("could not read config file `{}`", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file `{}`", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid API base url `{url}`")]
    BadBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to initialise the HTTP client")]
    HttpClient(#[source] reqwest::Error),
}

/// Failure of a single call to the remote text-generation capability.
///
/// Messages never carry the API key: the key travels in a request header and
/// URLs are stripped from transport errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("quota exceeded: {0}")]
    Quota(String),

    #[error("API request failed with {status}: {message}")]
    Api { status: u16, message: String },

    #[error("model `{model}` does not support generateContent")]
    UnsupportedModel { model: String },

    #[error("prompt blocked by the provider: {0}")]
    Blocked(String),

    #[error("response contained no text")]
    EmptyResponse,

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl GenerationError {
    /// Whether a bounded retry has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            GenerationError::Timeout(_)
            | GenerationError::Transport(_)
            | GenerationError::Quota(_) => true,
            GenerationError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        let e = e.without_url();
        if e.is_timeout() {
            GenerationError::Timeout(e.to_string())
        } else if e.is_decode() {
            GenerationError::Decode(e.to_string())
        } else {
            GenerationError::Transport(e.to_string())
        }
    }
}

/// The output document could not be persisted.
#[derive(Debug, thiserror::Error)]
#[error("failed to write report to `{}`", path.display())]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}
