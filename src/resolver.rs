//! Candidate model selection.
//!
//! Candidates are tried strictly in order. The first one that loads wins and
//! the rest are never contacted. If none load, the caller gets
//! [`Resolution::Unavailable`] with the reason for each failure and must not
//! attempt generation.

use crate::api::GenerativeBackend;
use crate::models::ModelHandle;
use itertools::Itertools;
use std::fmt;
use tracing::{error, info, instrument, warn};

/// One candidate that failed to load.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedAttempt {
    pub model: String,
    pub reason: String,
}

impl fmt::Display for FailedAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.model, self.reason)
    }
}

#[derive(Debug)]
pub enum Resolution {
    Resolved(ModelHandle),
    Unavailable { attempts: Vec<FailedAttempt> },
}

/// Load candidates in order and return the first one that succeeds.
#[instrument(level = "info", skip(backend))]
pub async fn resolve_model<B>(backend: &B, candidates: &[String]) -> Resolution
where
    B: GenerativeBackend,
{
    let mut attempts = Vec::new();

    for (position, model) in candidates.iter().enumerate() {
        match backend.load_model(model).await {
            Ok(mut handle) => {
                handle.position = position;
                if position > 0 {
                    warn!(
                        model = %handle.id,
                        primary = %candidates[0],
                        skipped = attempts.len(),
                        "Primary model unavailable; using fallback candidate"
                    );
                } else {
                    info!(model = %handle.id, "Model resolved");
                }
                return Resolution::Resolved(handle);
            }
            Err(e) => {
                warn!(%model, position, error = %e, "Candidate model failed to load");
                attempts.push(FailedAttempt {
                    model: model.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    error!(
        tried = attempts.len(),
        attempts = %summarize(&attempts),
        "No candidate model is available"
    );
    Resolution::Unavailable { attempts }
}

/// One line per run for the log, e.g. `a: reason; b: reason`.
fn summarize(attempts: &[FailedAttempt]) -> String {
    attempts.iter().join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use crate::models::GenerateRequest;
    use std::sync::Mutex;

    struct Candidates {
        available: Vec<&'static str>,
        loaded: Mutex<Vec<String>>,
    }

    impl Candidates {
        fn new(available: Vec<&'static str>) -> Self {
            Self {
                available,
                loaded: Mutex::new(Vec::new()),
            }
        }
    }

    impl GenerativeBackend for Candidates {
        async fn load_model(&self, model: &str) -> Result<ModelHandle, GenerationError> {
            self.loaded.lock().unwrap().push(model.to_string());
            if self.available.iter().any(|m| *m == model) {
                Ok(ModelHandle::new(model, Some(model.to_uppercase())))
            } else {
                Err(GenerationError::Api {
                    status: 404,
                    message: format!("models/{model} is not found"),
                })
            }
        }

        async fn generate(
            &self,
            _model: &ModelHandle,
            _request: &GenerateRequest,
        ) -> Result<String, GenerationError> {
            unreachable!("resolver never generates")
        }
    }

    fn list(models: &[&str]) -> Vec<String> {
        models.iter().map(|m| m.to_string()).collect()
    }

    #[tokio::test]
    async fn test_first_success_wins_and_later_candidates_are_skipped() {
        let backend = Candidates::new(vec!["B", "C"]);

        let resolution = resolve_model(&backend, &list(&["A", "B", "C"])).await;

        match resolution {
            Resolution::Resolved(handle) => {
                assert_eq!(handle.id, "B");
                assert_eq!(handle.position, 1);
                assert_eq!(handle.display_name.as_deref(), Some("B"));
            }
            other => panic!("expected a handle, got {other:?}"),
        }
        assert_eq!(*backend.loaded.lock().unwrap(), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_primary_success() {
        let backend = Candidates::new(vec!["A", "B"]);
        let resolution = resolve_model(&backend, &list(&["A", "B"])).await;
        assert!(matches!(resolution, Resolution::Resolved(ref h) if h.id == "A" && h.position == 0));
        assert_eq!(backend.loaded.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_all_failing_is_unavailable() {
        let backend = Candidates::new(vec![]);

        let resolution = resolve_model(&backend, &list(&["A", "B", "C"])).await;

        let Resolution::Unavailable { attempts } = resolution else {
            panic!("expected unavailable");
        };
        assert_eq!(
            attempts.iter().map(|a| a.model.as_str()).collect::<Vec<_>>(),
            vec!["A", "B", "C"]
        );
        assert!(attempts[0].reason.contains("404"));
        assert_eq!(
            summarize(&attempts),
            "A: API request failed with 404: models/A is not found; \
             B: API request failed with 404: models/B is not found; \
             C: API request failed with 404: models/C is not found"
        );
    }
}
