//! The digest pipeline, run once per process.
//!
//! ```text
//! INIT → CONFIG_RESOLVED | CONFIG_FAILED → GENERATING → GENERATED | GENERATION_FAILED
//!      → SANITIZED → WRITTEN
//! ```
//!
//! A resolver failure skips generation but still writes a page listing the
//! models that were tried. Only a write failure is returned as an error.

use crate::api::GenerativeBackend;
use crate::config::Settings;
use crate::error::WriteError;
use crate::models::GenerateRequest;
use crate::outputs::html::write_report;
use crate::prompt::{SYSTEM_INSTRUCTION, build_prompt};
use crate::report::{ReportOutcome, generate_report};
use crate::resolver::{Resolution, resolve_model};
use crate::tools::{DeclareSearch, SearchTool};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    ConfigResolved,
    ConfigFailed,
    Generating,
    Generated,
    GenerationFailed,
    Sanitized,
    Written,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Init => "INIT",
            Stage::ConfigResolved => "CONFIG_RESOLVED",
            Stage::ConfigFailed => "CONFIG_FAILED",
            Stage::Generating => "GENERATING",
            Stage::Generated => "GENERATED",
            Stage::GenerationFailed => "GENERATION_FAILED",
            Stage::Sanitized => "SANITIZED",
            Stage::Written => "WRITTEN",
        };
        f.write_str(s)
    }
}

/// What a completed run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub path: PathBuf,
    pub bytes: usize,
    /// Model that was called, if any.
    pub model: Option<String>,
    /// True when the written file is a fallback page.
    pub degraded: bool,
    /// Every stage visited, in order.
    pub stages: Vec<Stage>,
}

fn enter(stages: &mut Vec<Stage>, stage: Stage) {
    debug!(%stage, "Pipeline stage");
    stages.push(stage);
}

/// Resolve a model, generate the digest for `timestamp`, sanitize and write it.
///
/// # Errors
///
/// Only [`WriteError`]; every remote failure is turned into a fallback page.
#[instrument(level = "info", skip(backend, settings), fields(output = %settings.output.display()))]
pub async fn run<B>(backend: &B, settings: &Settings, timestamp: &str) -> Result<RunSummary, WriteError>
where
    B: GenerativeBackend,
{
    let mut stages = vec![Stage::Init];

    let outcome = match resolve_model(backend, &settings.candidates).await {
        Resolution::Resolved(model) => {
            enter(&mut stages, Stage::ConfigResolved);

            let tool = SearchTool::select(settings.search_tool, &model.id);
            info!(
                model = %model.id,
                display_name = ?model.display_name,
                position = model.position,
                tool = tool.revision(),
                %timestamp,
                "Generating digest"
            );
            let request = GenerateRequest {
                system_instruction: SYSTEM_INSTRUCTION.to_string(),
                prompt: build_prompt(timestamp),
                generation: settings.generation.clone(),
                tools: vec![tool.declaration()],
            };

            enter(&mut stages, Stage::Generating);
            let outcome = generate_report(backend, &model, &request).await;
            enter(
                &mut stages,
                if outcome.is_degraded() {
                    Stage::GenerationFailed
                } else {
                    Stage::Generated
                },
            );
            outcome
        }
        Resolution::Unavailable { attempts } => {
            enter(&mut stages, Stage::ConfigFailed);
            ReportOutcome::Unavailable { attempts }
        }
    };

    let model = outcome.model().map(str::to_string);
    let degraded = outcome.is_degraded();
    let document = outcome.into_document();
    enter(&mut stages, Stage::Sanitized);

    let bytes = write_report(&settings.output, &document).await?;
    enter(&mut stages, Stage::Written);

    Ok(RunSummary {
        path: settings.output.clone(),
        bytes,
        model,
        degraded,
        stages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::config::FileConfig;
    use crate::error::GenerationError;
    use crate::models::ModelHandle;
    use serde_json::json;
    use std::path::Path;
    use std::sync::Mutex;

    const TIMESTAMP: &str = "2025年01月01日 00:00";

    /// Loads only the listed models and answers every generation with `reply`.
    struct Stub {
        available: Vec<&'static str>,
        reply: Result<String, GenerationError>,
        requests: Mutex<Vec<(String, GenerateRequest)>>,
    }

    impl Stub {
        fn new(available: Vec<&'static str>, reply: Result<String, GenerationError>) -> Self {
            Self {
                available,
                reply,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl GenerativeBackend for Stub {
        async fn load_model(&self, model: &str) -> Result<ModelHandle, GenerationError> {
            if self.available.iter().any(|m| *m == model) {
                Ok(ModelHandle::new(model, None))
            } else {
                Err(GenerationError::Api {
                    status: 404,
                    message: format!("models/{model} is not found"),
                })
            }
        }

        async fn generate(
            &self,
            model: &ModelHandle,
            request: &GenerateRequest,
        ) -> Result<String, GenerationError> {
            self.requests
                .lock()
                .unwrap()
                .push((model.id.clone(), request.clone()));
            self.reply.clone()
        }
    }

    fn settings(output: &Path, models: &[&str]) -> Settings {
        let cli = Cli {
            output: Some(output.to_path_buf()),
            models: models.iter().map(|m| m.to_string()).collect(),
            ..Cli::default()
        };
        Settings::resolve(&cli, FileConfig::default(), |_| Some("test-key".to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_fenced_response_is_written_clean() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("index.html");
        let backend = Stub::new(
            vec!["gemini-2.0-flash"],
            Ok("```html\n<!DOCTYPE html><html></html>\n```".to_string()),
        );

        let summary = run(&backend, &settings(&out, &["gemini-2.0-flash"]), TIMESTAMP)
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&out).unwrap(),
            "<!DOCTYPE html><html></html>"
        );
        assert!(!summary.degraded);
        assert_eq!(summary.model.as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(
            summary.stages,
            vec![
                Stage::Init,
                Stage::ConfigResolved,
                Stage::Generating,
                Stage::Generated,
                Stage::Sanitized,
                Stage::Written,
            ]
        );

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let (model, request) = &requests[0];
        assert_eq!(model, "gemini-2.0-flash");
        assert!(request.prompt.contains(TIMESTAMP));
        assert_eq!(request.system_instruction, SYSTEM_INSTRUCTION);
        assert_eq!(request.tools, vec![json!({ "google_search": {} })]);
    }

    #[tokio::test]
    async fn test_timeout_writes_fallback_page() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("index.html");
        let backend = Stub::new(
            vec!["gemini-2.0-flash"],
            Err(GenerationError::Timeout("slow".to_string())),
        );

        let summary = run(&backend, &settings(&out, &["gemini-2.0-flash"]), TIMESTAMP)
            .await
            .unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert!(!written.is_empty());
        assert!(written.contains("slow"));
        assert!(written.contains("gemini-2.0-flash"));
        assert!(summary.degraded);
        assert!(summary.stages.contains(&Stage::GenerationFailed));
        assert_eq!(summary.stages.last(), Some(&Stage::Written));
    }

    #[tokio::test]
    async fn test_fallback_page_is_written_unmodified() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("index.html");
        let error = GenerationError::Api {
            status: 400,
            message: r#"Unknown name "google_search" near ```json"#.to_string(),
        };
        let expected = error.to_string();
        let backend = Stub::new(vec!["gemini-2.0-flash"], Err(error));

        let summary = run(&backend, &settings(&out, &["gemini-2.0-flash"]), TIMESTAMP)
            .await
            .unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.contains(&expected), "missing {expected:?}");
        assert!(summary.stages.contains(&Stage::Sanitized));
    }

    #[tokio::test]
    async fn test_fallback_candidate_gets_its_own_tool_dialect() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("index.html");
        let backend = Stub::new(vec!["gemini-1.5-flash"], Ok("<html></html>".to_string()));

        let summary = run(
            &backend,
            &settings(&out, &["gemini-2.0-flash", "gemini-1.5-flash"]),
            TIMESTAMP,
        )
        .await
        .unwrap();

        assert_eq!(summary.model.as_deref(), Some("gemini-1.5-flash"));
        let requests = backend.requests.lock().unwrap();
        assert!(requests[0].1.tools[0].get("google_search_retrieval").is_some());
    }

    #[tokio::test]
    async fn test_unavailable_models_skip_generation_but_still_write() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("index.html");
        let backend = Stub::new(vec![], Ok("never used".to_string()));

        let summary = run(&backend, &settings(&out, &["A", "B"]), TIMESTAMP)
            .await
            .unwrap();

        assert!(backend.requests.lock().unwrap().is_empty());
        assert!(summary.degraded);
        assert_eq!(summary.model, None);
        assert!(summary.stages.contains(&Stage::ConfigFailed));
        assert!(!summary.stages.contains(&Stage::Generating));

        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.contains("<code>A</code>"));
        assert!(written.contains("<code>B</code>"));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::ConfigFailed.to_string(), "CONFIG_FAILED");
        assert_eq!(Stage::Written.to_string(), "WRITTEN");
    }
}
