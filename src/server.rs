//! HTTP surface: `POST /api/analyze-scorecard` and friends.
//!
//! The handler only collects the multipart form into a
//! [`SubmissionRequest`]; all validation and processing happens in
//! [`Analyzer::analyze`]. Every failure, including a panic inside a handler,
//! comes back as a JSON object with an `error` field.

use crate::analyze::Analyzer;
use crate::error::ScorecardError;
use crate::pipeline::input::{SubmissionRequest, UploadedFile, FIELD_FILES};
use axum::{
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        DefaultBodyLimit, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::any::Any;
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{debug, error, warn};

/// Path of the analysis endpoint.
pub const ANALYZE_PATH: &str = "/api/analyze-scorecard";

/// Default request body limit: 25 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 25 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    analyzer: Arc<Analyzer>,
}

/// Build the application router.
pub fn router(analyzer: Arc<Analyzer>, body_limit: usize) -> Router {
    Router::new()
        .route(ANALYZE_PATH, post(analyze_scorecard).get(endpoint_info))
        .route("/health", get(|| async { "ok" }))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(AppState { analyzer })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn analyze_scorecard(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let result = async {
        let multipart = multipart.map_err(|e| ScorecardError::InvalidForm(e.body_text()))?;
        let submission = read_submission(multipart).await?;
        state.analyzer.analyze(submission).await
    }
    .await;

    match result {
        Ok(analysis) => Json(analysis).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Collect text fields and `files` attachments, in the order they arrive.
async fn read_submission(mut multipart: Multipart) -> Result<SubmissionRequest, ScorecardError> {
    let mut submission = SubmissionRequest::default();

    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == FIELD_FILES {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(form_error)?;
            if file_name.is_empty() && bytes.is_empty() {
                debug!("Ignoring empty '{}' entry", FIELD_FILES);
                continue;
            }
            debug!(
                "Received '{}' ({}, {} bytes)",
                file_name,
                content_type,
                bytes.len()
            );
            submission
                .files
                .push(UploadedFile::new(file_name, content_type, bytes.to_vec()));
        } else {
            let value = field.text().await.map_err(form_error)?;
            submission.set_field(&name, &value);
        }
    }

    Ok(submission)
}

fn form_error(e: MultipartError) -> ScorecardError {
    ScorecardError::InvalidForm(e.body_text())
}

/// Static description of the analysis endpoint.
async fn endpoint_info() -> Json<Value> {
    Json(json!({
        "endpoint": ANALYZE_PATH,
        "method": "POST",
        "description": "Extract provider quality measures from uploaded scorecard PDFs and images",
        "contentType": "multipart/form-data",
        "fields": {
            "providerName": "string (required)",
            "reportingMonth": "string (required)",
            "reportingYear": "string (required)",
            "files": "one or more PDF or image files (required)"
        },
        "response": {
            "provider": "ProviderSummary",
            "measures": "Measure[]",
            "narrative": "Narrative"
        }
    }))
}

// ---------------------------------------------------------------------------
// Error responses
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ScorecardError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status.is_server_error() {
            error!("Analysis failed: {} ({:?})", self, self.details());
        } else {
            warn!("Rejected submission: {}", self);
        }

        let body = ErrorResponse {
            error: self.to_string(),
            details: self.details().map(str::to_string),
        };
        (status, Json(body)).into_response()
    }
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    ScorecardError::Internal(details).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn client_errors_are_400_without_details() {
        let response = ScorecardError::NoFiles.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({ "error": "No files uploaded" }));
    }

    #[tokio::test]
    async fn upstream_errors_carry_details() {
        let response = ScorecardError::Upstream {
            message: "OpenAI error".into(),
            details: "rate limited".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "OpenAI error", "details": "rate limited" })
        );
    }

    #[tokio::test]
    async fn panics_become_json() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Unhandled server error", "details": "boom" })
        );
    }
}
