//! The analysis entry point: one submission in, one normalised result out.
//!
//! [`Analyzer`] owns the injected configuration and the two collaborators
//! (text extraction, inference) and runs the linear pipeline:
//!
//! ```text
//! validate ──▶ extract ──▶ prompt ──▶ infer ──▶ normalize
//! ```
//!
//! Every stage fails fast; there is no retry and no partial result.

use crate::config::AnalyzerConfig;
use crate::error::ScorecardError;
use crate::output::AnalysisResult;
use crate::pipeline::extract::{self, ExtractedContent, PdfiumTextExtractor, TextExtractor};
use crate::pipeline::input::SubmissionRequest;
use crate::pipeline::llm::{InferenceClient, Prompt, ResponsesClient};
use crate::pipeline::postprocess;
use crate::prompts::{build_user_text, DEFAULT_INSTRUCTION};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Runs scorecard analyses. Cheap to share: wrap in an `Arc` and clone.
pub struct Analyzer {
    config: AnalyzerConfig,
    extractor: Arc<dyn TextExtractor>,
    inference: Arc<dyn InferenceClient>,
}

impl Analyzer {
    /// Assemble an analyzer from explicit collaborators.
    pub fn new(
        config: AnalyzerConfig,
        extractor: Arc<dyn TextExtractor>,
        inference: Arc<dyn InferenceClient>,
    ) -> Self {
        Self {
            config,
            extractor,
            inference,
        }
    }

    /// The default wiring: pdfium text extraction + the Responses API.
    pub fn from_config(config: AnalyzerConfig) -> Result<Self, ScorecardError> {
        let extractor = Arc::new(PdfiumTextExtractor::new(config.pdfium_library_path.clone()));
        let inference = Arc::new(ResponsesClient::new(&config)?);
        Ok(Self::new(config, extractor, inference))
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyse one submission.
    ///
    /// # Errors
    /// - [`ScorecardError::MissingFields`] / [`ScorecardError::NoFiles`] for bad input
    /// - [`ScorecardError::MissingCredential`] when inference is not configured
    /// - [`ScorecardError::PdfExtraction`] when a PDF cannot be read
    /// - [`ScorecardError::Upstream`] when the inference call fails
    /// - [`ScorecardError::InvalidModelOutput`] when the model's answer is not the expected JSON
    pub async fn analyze(
        &self,
        mut submission: SubmissionRequest,
    ) -> Result<AnalysisResult, ScorecardError> {
        let start = Instant::now();

        // ── Step 1: Validate input ───────────────────────────────────────────
        submission.validate()?;
        self.inference.ensure_configured()?;
        info!(
            "Analysing scorecard for '{}' ({} {}), {} files",
            submission.provider_name,
            submission.reporting_month,
            submission.reporting_year,
            submission.files.len()
        );

        // ── Step 2: Extract PDF text / encode images ─────────────────────────
        let content =
            extract::extract_content(&submission.files, self.extractor.as_ref(), &self.config)
                .await?;
        debug!(
            "Extracted {} chars of text and {} images in {:?}",
            content.combined_text.len(),
            content.images.len(),
            start.elapsed()
        );

        // ── Step 3: Build prompt ─────────────────────────────────────────────
        let prompt = self.build_prompt(&submission, content);

        // ── Step 4: Inference ────────────────────────────────────────────────
        let raw = self.inference.complete(&prompt).await?;

        // ── Step 5: Normalise ────────────────────────────────────────────────
        let result = postprocess::normalize(&raw, &submission)?;

        info!(
            "Analysis complete via {}: {} measures in {}ms",
            self.inference.name(),
            result.measures.len(),
            start.elapsed().as_millis()
        );
        Ok(result)
    }

    /// Assemble the outbound prompt from extracted content.
    pub fn build_prompt(&self, submission: &SubmissionRequest, content: ExtractedContent) -> Prompt {
        let instruction = self
            .config
            .instruction
            .as_deref()
            .unwrap_or(DEFAULT_INSTRUCTION);

        Prompt {
            user_text: build_user_text(submission, &content.combined_text, instruction),
            images: content.images,
        }
    }
}
