//! Report generation and the fallback pages shown when it fails.
//!
//! Generation never returns an error to the pipeline. A failed call becomes
//! [`ReportOutcome::Failed`], which still renders to a complete HTML page, so
//! every run leaves a viewable `index.html` behind.

use crate::api::GenerativeBackend;
use crate::error::GenerationError;
use crate::models::{GenerateRequest, ModelHandle};
use crate::resolver::FailedAttempt;
use crate::utils::{escape_html, sanitize_report, truncate_for_log};
use std::fmt::Write;
use tracing::{debug, error, info, instrument};

/// Result of the generation stage.
#[derive(Debug)]
pub enum ReportOutcome {
    /// Raw model output, possibly still wrapped in markdown fences.
    Generated { model: String, body: String },
    /// The call to `model` failed.
    Failed { model: String, error: GenerationError },
    /// No candidate model could be loaded, so nothing was called.
    Unavailable { attempts: Vec<FailedAttempt> },
}

impl ReportOutcome {
    pub fn is_degraded(&self) -> bool {
        !matches!(self, ReportOutcome::Generated { .. })
    }

    pub fn model(&self) -> Option<&str> {
        match self {
            ReportOutcome::Generated { model, .. } | ReportOutcome::Failed { model, .. } => {
                Some(model)
            }
            ReportOutcome::Unavailable { .. } => None,
        }
    }

    /// The document to write. Model output is fence-stripped; fallback pages
    /// are already well-formed and returned untouched.
    pub fn into_document(self) -> String {
        match self {
            ReportOutcome::Generated { body, .. } => sanitize_report(&body),
            ReportOutcome::Failed { model, error } => failure_page(&model, &error),
            ReportOutcome::Unavailable { attempts } => unavailable_page(&attempts),
        }
    }
}

/// Call the backend once (plus whatever retry the backend itself applies).
#[instrument(level = "info", skip_all, fields(model = %model.id))]
pub async fn generate_report<B>(
    backend: &B,
    model: &ModelHandle,
    request: &GenerateRequest,
) -> ReportOutcome
where
    B: GenerativeBackend,
{
    match backend.generate(model, request).await {
        Ok(body) => {
            info!(bytes = body.len(), "Report generated");
            debug!(preview = %truncate_for_log(&body, 300), "Raw response");
            ReportOutcome::Generated {
                model: model.id.clone(),
                body,
            }
        }
        Err(error) => {
            error!(error = %error, "Report generation failed; writing fallback page");
            ReportOutcome::Failed {
                model: model.id.clone(),
                error,
            }
        }
    }
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
</head>
<body style="background:#0f172a;color:#e2e8f0;font-family:sans-serif;padding:2rem">
{body}
</body>
</html>"#
    )
}

fn failure_page(model: &str, error: &GenerationError) -> String {
    let body = format!(
        "<h1>生成失败</h1>\n<p>{}</p>\n<p>模型: <code>{}</code></p>",
        escape_html(&error.to_string()),
        escape_html(model)
    );
    page("AI 日报 - 生成失败", &body)
}

fn unavailable_page(attempts: &[FailedAttempt]) -> String {
    let mut body = String::from("<h1>生成失败</h1>\n<p>没有可用的模型。</p>\n<ul>\n");
    for attempt in attempts {
        let _ = writeln!(
            body,
            "<li><code>{}</code>: {}</li>",
            escape_html(&attempt.model),
            escape_html(&attempt.reason)
        );
    }
    body.push_str("</ul>");
    page("AI 日报 - 生成失败", &body)
}
