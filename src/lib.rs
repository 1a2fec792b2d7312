//! # scorecard-analyzer
//!
//! Turn uploaded healthcare provider scorecards (PDFs and images) into
//! structured quality-measure data using a vision language model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! multipart form
//!  │
//!  ├─ 1. Validate  providerName / reportingMonth / reportingYear / files
//!  ├─ 2. Extract   PDF text layer via pdfium (spawn_blocking), images → base64
//!  ├─ 3. Prompt    identity lines + extracted text + extraction instruction
//!  ├─ 4. Infer     one call to the OpenAI Responses API (or any edgequake-llm provider)
//!  └─ 5. Normalise parse JSON, clean measure names, coerce numbers, pin identity
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scorecard_analyzer::{Analyzer, AnalyzerConfig, SubmissionRequest, UploadedFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from OPENAI_API_KEY
//!     let config = AnalyzerConfig::default();
//!     let analyzer = Analyzer::from_config(config)?;
//!
//!     let pdf = std::fs::read("march.pdf")?;
//!     let submission = SubmissionRequest::new("Acme Clinic", "March", "2024")
//!         .with_file(UploadedFile::new("march.pdf", "application/pdf", pdf));
//!
//!     let result = analyzer.analyze(submission).await?;
//!     println!("{}", serde_json::to_string_pretty(&result)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | HTTP router and the `scorecard-server` binary (axum + clap + tracing-subscriber) |
//!
//! Disable `server` when embedding only the library:
//! ```toml
//! scorecard-analyzer = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::Analyzer;
pub use config::{AnalyzerConfig, AnalyzerConfigBuilder};
pub use error::ScorecardError;
pub use output::{AnalysisResult, Measure, Narrative, Priority, ProviderSummary};
pub use pipeline::encode::EncodedImage;
pub use pipeline::extract::{ExtractedContent, PdfiumTextExtractor, TextExtractor};
pub use pipeline::input::{SubmissionRequest, UploadedFile};
pub use pipeline::llm::{InferenceClient, Prompt, ProviderClient, ResponsesClient};
