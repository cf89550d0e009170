//! Data models for generation settings and the Gemini wire format.
//!
//! This module defines the structures exchanged with the remote API:
//! - [`GenerationConfig`]: sampling knobs, read from YAML and sent as `generationConfig`
//! - [`GenerateContentRequest`] / [`GenerateContentResponse`]: the `generateContent` call
//! - [`ModelInfo`]: metadata returned when a model is looked up
//! - [`ModelHandle`] and [`GenerateRequest`]: provider-agnostic values used by the pipeline
//!
//! Wire structs use `rename_all = "camelCase"` to match the REST API, while the
//! YAML config keeps snake_case keys.

use crate::error::GenerationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sampling parameters sent with every generation request.
///
/// Deserialized from the config file with snake_case keys, serialized to the
/// API in camelCase.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(
    rename_all(serialize = "camelCase", deserialize = "snake_case"),
    default,
    deny_unknown_fields
)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
            response_mime_type: "text/plain".to_string(),
        }
    }
}

/// A model that initialized successfully and will receive the request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelHandle {
    /// Identifier as it appears in the candidate list.
    pub id: String,
    /// Human-readable name reported by the provider, if any.
    pub display_name: Option<String>,
    /// Zero-based position in the candidate list.
    pub position: usize,
}

impl ModelHandle {
    pub fn new(id: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            id: id.into(),
            display_name,
            position: 0,
        }
    }
}

/// Everything one generation call needs, independent of the provider.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub system_instruction: String,
    pub prompt: String,
    pub generation: GenerationConfig,
    /// One entry per tool, already in wire form.
    pub tools: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

/// Body of `POST models/{model}:generateContent`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,
    pub generation_config: GenerationConfig,
}

impl From<&GenerateRequest> for GenerateContentRequest {
    fn from(req: &GenerateRequest) -> Self {
        let system_instruction = if req.system_instruction.trim().is_empty() {
            None
        } else {
            Some(Content::text(None, &req.system_instruction))
        };
        Self {
            system_instruction,
            contents: vec![Content::text(Some("user"), &req.prompt)],
            tools: req.tools.clone(),
            generation_config: req.generation.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub web_search_queries: Vec<String>,
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebChunk>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebChunk {
    pub uri: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenate the text parts of the first candidate.
    ///
    /// # Errors
    ///
    /// [`GenerationError::Blocked`] when the prompt was rejected, and
    /// [`GenerationError::EmptyResponse`] when no text came back.
    pub fn into_text(self) -> Result<String, GenerationError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GenerationError::Blocked(reason));
        }

        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(text)
    }

    fn grounding(&self) -> Option<&GroundingMetadata> {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
    }

    /// URIs of the web pages the answer was grounded on.
    pub fn source_uris(&self) -> Vec<&str> {
        self.grounding()
            .map(|g| {
                g.grounding_chunks
                    .iter()
                    .filter_map(|c| c.web.as_ref().and_then(|w| w.uri.as_deref()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Queries the model issued to the search tool.
    pub fn search_queries(&self) -> &[String] {
        self.grounding()
            .map(|g| g.web_search_queries.as_slice())
            .unwrap_or(&[])
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.candidates.first().and_then(|c| c.finish_reason.as_deref())
    }
}

/// Response of `GET models/{model}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    /// Models that omit the method list are assumed to support generation.
    pub fn supports_generate_content(&self) -> bool {
        self.supported_generation_methods.is_empty()
            || self
                .supported_generation_methods
                .iter()
                .any(|m| m == "generateContent")
    }
}

/// Error envelope returned by the API on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}
