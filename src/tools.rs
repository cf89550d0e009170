//! Web search tool declarations.
//!
//! The Gemini API has changed how a request asks for search grounding.
//! Gemini 1.5 expects a `google_search_retrieval` object with a dynamic
//! retrieval config, while Gemini 2.x and later only accept an empty
//! `google_search` object. Each revision is one implementation of
//! [`DeclareSearch`]; [`SearchToolDialect`] selects between them, either
//! explicitly or by looking at the model identifier.

use clap::ValueEnum;
use serde::Deserialize;
use serde_json::{Value, json};

/// Something that can express "enable web search" on the wire.
pub trait DeclareSearch {
    /// Short name of the API revision this declaration targets.
    fn revision(&self) -> &'static str;

    /// The JSON object placed into the request's `tools` array.
    fn declaration(&self) -> Value;
}

/// `{"google_search": {}}`, accepted by Gemini 2.x and later.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoogleSearch;

impl DeclareSearch for GoogleSearch {
    fn revision(&self) -> &'static str {
        "google_search"
    }

    fn declaration(&self) -> Value {
        json!({ "google_search": {} })
    }
}

/// Legacy Gemini 1.5 grounding with a dynamic retrieval threshold.
#[derive(Debug, Clone, Copy)]
pub struct GoogleSearchRetrieval {
    pub dynamic_threshold: f32,
}

impl Default for GoogleSearchRetrieval {
    fn default() -> Self {
        Self {
            dynamic_threshold: 0.3,
        }
    }
}

impl DeclareSearch for GoogleSearchRetrieval {
    fn revision(&self) -> &'static str {
        "google_search_retrieval"
    }

    fn declaration(&self) -> Value {
        json!({
            "google_search_retrieval": {
                "dynamic_retrieval_config": {
                    "mode": "MODE_DYNAMIC",
                    "dynamic_threshold": self.dynamic_threshold,
                }
            }
        })
    }
}

/// Which declaration to send, as chosen in config or on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SearchToolDialect {
    /// Pick from the model identifier.
    #[default]
    Auto,
    GoogleSearch,
    GoogleSearchRetrieval,
}

/// A concrete declaration picked for one model.
#[derive(Debug, Clone, Copy)]
pub enum SearchTool {
    GoogleSearch(GoogleSearch),
    Retrieval(GoogleSearchRetrieval),
}

impl SearchTool {
    /// Resolve `dialect` against the model that will receive the request.
    pub fn select(dialect: SearchToolDialect, model: &str) -> Self {
        match dialect {
            SearchToolDialect::GoogleSearch => SearchTool::GoogleSearch(GoogleSearch),
            SearchToolDialect::GoogleSearchRetrieval => {
                SearchTool::Retrieval(GoogleSearchRetrieval::default())
            }
            SearchToolDialect::Auto if is_legacy_model(model) => {
                SearchTool::Retrieval(GoogleSearchRetrieval::default())
            }
            SearchToolDialect::Auto => SearchTool::GoogleSearch(GoogleSearch),
        }
    }
}

impl DeclareSearch for SearchTool {
    fn revision(&self) -> &'static str {
        match self {
            SearchTool::GoogleSearch(t) => t.revision(),
            SearchTool::Retrieval(t) => t.revision(),
        }
    }

    fn declaration(&self) -> Value {
        match self {
            SearchTool::GoogleSearch(t) => t.declaration(),
            SearchTool::Retrieval(t) => t.declaration(),
        }
    }
}

fn is_legacy_model(model: &str) -> bool {
    let id = model.strip_prefix("models/").unwrap_or(model);
    id.starts_with("gemini-1.") || id == "gemini-pro"
}
