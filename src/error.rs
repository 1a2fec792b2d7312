//! Error types for the scorecard-analyzer library.
//!
//! A single fatal error type, [`ScorecardError`], covers every way an analysis
//! can fail. The pipeline is all-or-nothing: there is no partial result, so
//! there is no second "non-fatal" error type either.
//!
//! Variants fall into five families, which the HTTP layer maps onto status
//! codes:
//!
//! | Family        | Variants                                           | Status |
//! |---------------|----------------------------------------------------|--------|
//! | Validation    | `MissingFields`, `NoFiles`, `InvalidForm`          | 400    |
//! | Configuration | `MissingCredential`, `InvalidConfig`               | 500    |
//! | Upstream      | `Upstream`                                         | 500    |
//! | Parse         | `InvalidModelOutput`                               | 500    |
//! | Unhandled     | `PdfExtraction`, `Internal`                        | 500    |

use thiserror::Error;

/// All errors returned by the scorecard-analyzer library.
#[derive(Debug, Error)]
pub enum ScorecardError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// One of providerName / reportingMonth / reportingYear is empty after trimming.
    #[error("Missing required fields")]
    MissingFields,

    /// The submission carried no `files` entries.
    #[error("No files uploaded")]
    NoFiles,

    /// The request body could not be read as a multipart form.
    #[error("Invalid form submission: {0}")]
    InvalidForm(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// The inference credential was never configured.
    #[error("{var} not set")]
    MissingCredential { var: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Upstream errors ───────────────────────────────────────────────────
    /// The inference service failed: non-success status, transport failure,
    /// or a response body that is not JSON at all.
    ///
    /// `details` holds the raw upstream body (or transport error text).
    #[error("{message}")]
    Upstream { message: String, details: String },

    // ── Parse errors ──────────────────────────────────────────────────────
    /// The model's payload was not valid JSON, or did not match the
    /// expected result shape. `raw` is the untouched payload text.
    #[error("Model did not return valid JSON")]
    InvalidModelOutput { reason: String, raw: String },

    // ── Text extraction errors ────────────────────────────────────────────
    /// The PDF text-extraction collaborator failed on one file.
    #[error("Failed to extract text from '{file}': {detail}")]
    PdfExtraction { file: String, detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Unhandled server error")]
    Internal(String),
}

impl ScorecardError {
    /// `true` for errors caused by the caller's input (HTTP 400).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ScorecardError::MissingFields | ScorecardError::NoFiles | ScorecardError::InvalidForm(_)
        )
    }

    /// Diagnostic text attached to the error response, when there is any.
    ///
    /// Meant for debugging, not for end-user display.
    pub fn details(&self) -> Option<&str> {
        match self {
            ScorecardError::Upstream { details, .. } => Some(details),
            ScorecardError::InvalidModelOutput { raw, .. } => Some(raw),
            ScorecardError::PdfExtraction { detail, .. } => Some(detail),
            ScorecardError::Internal(detail) => Some(detail),
            _ => None,
        }
    }

    pub(crate) fn upstream(message: impl Into<String>, details: impl Into<String>) -> Self {
        ScorecardError::Upstream {
            message: message.into(),
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages() {
        assert_eq!(ScorecardError::MissingFields.to_string(), "Missing required fields");
        assert_eq!(ScorecardError::NoFiles.to_string(), "No files uploaded");
        assert!(ScorecardError::MissingFields.is_client_error());
        assert!(ScorecardError::InvalidForm("bad boundary".into()).is_client_error());
    }

    #[test]
    fn missing_credential_names_the_variable() {
        let e = ScorecardError::MissingCredential {
            var: "OPENAI_API_KEY".into(),
        };
        assert_eq!(e.to_string(), "OPENAI_API_KEY not set");
        assert!(!e.is_client_error());
        assert!(e.details().is_none());
    }

    #[test]
    fn upstream_carries_raw_body() {
        let e = ScorecardError::upstream("OpenAI error", r#"{"error":"bad key"}"#);
        assert_eq!(e.to_string(), "OpenAI error");
        assert_eq!(e.details(), Some(r#"{"error":"bad key"}"#));
    }

    #[test]
    fn invalid_model_output_keeps_raw_text() {
        let e = ScorecardError::InvalidModelOutput {
            reason: "expected value at line 1 column 1".into(),
            raw: "Sure! Here is the JSON".into(),
        };
        assert_eq!(e.to_string(), "Model did not return valid JSON");
        assert_eq!(e.details(), Some("Sure! Here is the JSON"));
    }

    #[test]
    fn internal_display_hides_detail() {
        let e = ScorecardError::Internal("task panicked".into());
        assert_eq!(e.to_string(), "Unhandled server error");
        assert_eq!(e.details(), Some("task panicked"));
    }
}
