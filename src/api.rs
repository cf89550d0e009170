//! Gemini API interaction with bounded retry.
//!
//! # Architecture
//!
//! - [`GenerativeBackend`]: core trait for looking up a model and generating text
//! - [`GeminiClient`]: REST implementation against `generativelanguage.googleapis.com`
//! - [`RetryGenerate`]: decorator that retries transient generation failures
//!
//! # Retry Strategy
//!
//! - Only errors where [`GenerationError::is_transient`] holds are retried
//! - Exponential backoff from the configured base delay, capped at 30 seconds
//! - Random jitter (0-250ms) added to each delay
//! - Model lookups are never retried; the resolver moves on to the next candidate

use crate::config::Settings;
use crate::error::{ConfigError, GenerationError};
use crate::models::{
    ApiErrorBody, GenerateContentRequest, GenerateContentResponse, GenerateRequest, ModelHandle,
    ModelInfo,
};
use crate::utils::truncate_for_log;
use rand::{Rng, rng};
use reqwest::{Client, Response};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// A remote text-generation capability.
pub trait GenerativeBackend {
    /// Check that `model` exists and can generate text.
    ///
    /// # Errors
    ///
    /// Any [`GenerationError`]; the caller treats every error as "model unavailable".
    async fn load_model(&self, model: &str) -> Result<ModelHandle, GenerationError>;

    /// Generate text with an already loaded model.
    async fn generate(
        &self,
        model: &ModelHandle,
        request: &GenerateRequest,
    ) -> Result<String, GenerationError>;
}

/// REST client for the Gemini `v1beta` (or configured) API.
pub struct GeminiClient {
    http: Client,
    base: String,
    version: String,
    api_key: String,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base", &self.base)
            .field("version", &self.version)
            .finish()
    }
}

impl GeminiClient {
    /// Build a client with the timeout and endpoint from `settings`.
    pub fn new(settings: &Settings) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ConfigError::HttpClient)?;
        Ok(Self {
            http,
            base: settings.api_base.as_str().trim_end_matches('/').to_string(),
            version: settings.api_version.clone(),
            api_key: settings.api_key.clone(),
        })
    }

    fn model_url(&self, model: &str, method: Option<&str>) -> String {
        let mut url = format!(
            "{}/{}/models/{}",
            self.base,
            self.version,
            urlencoding::encode(model)
        );
        if let Some(method) = method {
            url.push(':');
            url.push_str(method);
        }
        url
    }
}

impl GenerativeBackend for GeminiClient {
    #[instrument(level = "info", skip(self))]
    async fn load_model(&self, model: &str) -> Result<ModelHandle, GenerationError> {
        let resp = self
            .http
            .get(self.model_url(model, None))
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }

        let info: ModelInfo = resp.json().await?;
        if !info.supports_generate_content() {
            return Err(GenerationError::UnsupportedModel {
                model: model.to_string(),
            });
        }
        debug!(name = %info.name, display_name = ?info.display_name, "Model metadata loaded");
        Ok(ModelHandle::new(model, info.display_name))
    }

    #[instrument(level = "info", skip_all, fields(model = %model.id))]
    async fn generate(
        &self,
        model: &ModelHandle,
        request: &GenerateRequest,
    ) -> Result<String, GenerationError> {
        let t0 = Instant::now();
        let body = GenerateContentRequest::from(request);
        let resp = self
            .http
            .post(self.model_url(&model.id, Some("generateContent")))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let e = error_from_response(resp).await;
            warn!(elapsed_ms = t0.elapsed().as_millis(), error = %e, "generateContent failed");
            return Err(e);
        }

        let parsed: GenerateContentResponse = resp.json().await?;
        let sources = parsed.source_uris().len();
        debug!(
            queries = ?parsed.search_queries(),
            sources = ?parsed.source_uris(),
            finish_reason = ?parsed.finish_reason(),
            "Grounding metadata"
        );
        let text = parsed.into_text()?;
        info!(
            elapsed_ms = t0.elapsed().as_millis(),
            bytes = text.len(),
            grounding_sources = sources,
            "generateContent succeeded"
        );
        Ok(text)
    }
}

/// Turn a non-2xx response into a [`GenerationError`], preferring the API's own message.
async fn error_from_response(resp: Response) -> GenerationError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiErrorBody>(&body) {
        Ok(ApiErrorBody { error }) => match (error.status, error.message) {
            (Some(s), Some(m)) => format!("{s}: {m}"),
            (None, Some(m)) => m,
            (Some(s), None) => s,
            (None, None) => truncate_for_log(body.trim(), 300),
        },
        Err(_) => truncate_for_log(body.trim(), 300),
    };

    match status {
        429 => GenerationError::Quota(message),
        status => GenerationError::Api { status, message },
    }
}

/// Wrapper that adds exponential backoff retry to any [`GenerativeBackend`].
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..=max_jitter)
/// ```
pub struct RetryGenerate<T> {
    /// The underlying backend to wrap.
    inner: T,
    /// Retries after the first attempt; 0 disables retrying.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap.
    max_delay: StdDuration,
    max_jitter_ms: u64,
}

impl<T> RetryGenerate<T>
where
    T: GenerativeBackend,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
            max_jitter_ms: 250,
        }
    }

    #[cfg(test)]
    pub fn with_max_jitter(mut self, max_jitter: StdDuration) -> Self {
        self.max_jitter_ms = max_jitter.as_millis() as u64;
        self
    }

    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = (attempt.saturating_sub(1)).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=self.max_jitter_ms);
        delay + StdDuration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryGenerate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryGenerate")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> GenerativeBackend for RetryGenerate<T>
where
    T: GenerativeBackend,
{
    async fn load_model(&self, model: &str) -> Result<ModelHandle, GenerationError> {
        self.inner.load_model(model).await
    }

    #[instrument(level = "info", skip_all, fields(model = %model.id))]
    async fn generate(
        &self,
        model: &ModelHandle,
        request: &GenerateRequest,
    ) -> Result<String, GenerationError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.generate(model, request).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    attempt += 1;
                    let elapsed_ms_attempt = attempt_t0.elapsed().as_millis();
                    let elapsed_ms_total = total_t0.elapsed().as_millis();

                    if !e.is_transient() || attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            transient = e.is_transient(),
                            elapsed_ms_attempt,
                            elapsed_ms_total,
                            error = %e,
                            "generate() giving up"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt,
                        elapsed_ms_total,
                        ?delay,
                        error = %e,
                        "generate() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
