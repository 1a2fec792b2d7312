//! Configuration types for scorecard analysis.
//!
//! All analysis behaviour is controlled through [`AnalyzerConfig`], built via
//! its [`AnalyzerConfigBuilder`] once at startup and handed to the
//! [`crate::Analyzer`]. Nothing on the request path reads the process
//! environment: the binary resolves flags and env vars up front and the
//! library only ever sees this struct.

use crate::error::ScorecardError;
use std::fmt;
use std::path::PathBuf;

/// Default Responses API root.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default vision model.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Environment variable the credential is conventionally read from.
/// Used in the "not set" error message.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Configuration for a scorecard analysis.
///
/// # Example
/// ```rust
/// use scorecard_analyzer::AnalyzerConfig;
///
/// let config = AnalyzerConfig::builder()
///     .api_key("sk-test")
///     .model("gpt-4.1-mini")
///     .temperature(0.2)
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "gpt-4.1-mini");
/// ```
#[derive(Clone)]
pub struct AnalyzerConfig {
    /// Inference credential. `None` is accepted here; each analysis then
    /// fails with [`ScorecardError::MissingCredential`].
    pub api_key: Option<String>,

    /// Root URL of the Responses API. Default: [`DEFAULT_API_BASE`].
    pub api_base: String,

    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Sampling temperature. Default: 0.2.
    ///
    /// Extraction should be near-deterministic; the narrative fields still
    /// benefit from a little variety, hence not 0.
    pub temperature: f32,

    /// Upper bound on generated tokens. Not sent when `None` (default).
    pub max_output_tokens: Option<usize>,

    /// Per-request timeout for the inference call. Default: `None` (no timeout).
    pub request_timeout_secs: Option<u64>,

    /// How many uploaded files are extracted at once. Default: 4.
    ///
    /// Output order always follows submission order regardless of this value.
    pub extraction_concurrency: usize,

    /// Render PDFs without a text layer into page images for the vision
    /// model. Default: false.
    pub rasterize_scanned_pdfs: bool,

    /// Maximum pages rendered per text-less PDF. Default: 4.
    pub max_rendered_pages: usize,

    /// Maximum rendered image dimension in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Replaces the built-in extraction instruction. Default: `None`.
    pub instruction: Option<String>,

    /// Explicit path to libpdfium. `None` binds the system library.
    pub pdfium_library_path: Option<PathBuf>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.2,
            max_output_tokens: None,
            request_timeout_secs: None,
            extraction_concurrency: 4,
            rasterize_scanned_pdfs: false,
            max_rendered_pages: 4,
            max_rendered_pixels: 2000,
            instruction: None,
            pdfium_library_path: None,
        }
    }
}

impl fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("extraction_concurrency", &self.extraction_concurrency)
            .field("rasterize_scanned_pdfs", &self.rasterize_scanned_pdfs)
            .field("max_rendered_pages", &self.max_rendered_pages)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("instruction", &self.instruction.as_ref().map(|_| "<custom>"))
            .field("pdfium_library_path", &self.pdfium_library_path)
            .finish()
    }
}

impl AnalyzerConfig {
    /// Create a new builder for `AnalyzerConfig`.
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder {
            config: Self::default(),
        }
    }

    /// The credential, or the configuration error every request reports
    /// while it is missing.
    pub fn require_api_key(&self) -> Result<&str, ScorecardError> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ScorecardError::MissingCredential {
                var: API_KEY_ENV.to_string(),
            }),
        }
    }
}

/// Builder for [`AnalyzerConfig`].
#[derive(Debug)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    /// Set or clear the credential from an optional source (flag / env var).
    pub fn maybe_api_key(mut self, key: Option<String>) -> Self {
        self.config.api_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = Some(n);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn extraction_concurrency(mut self, n: usize) -> Self {
        self.config.extraction_concurrency = n.max(1);
        self
    }

    pub fn rasterize_scanned_pdfs(mut self, v: bool) -> Self {
        self.config.rasterize_scanned_pdfs = v;
        self
    }

    pub fn max_rendered_pages(mut self, n: usize) -> Self {
        self.config.max_rendered_pages = n;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn instruction(mut self, text: impl Into<String>) -> Self {
        self.config.instruction = Some(text.into());
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalyzerConfig, ScorecardError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(ScorecardError::InvalidConfig("model must not be empty".into()));
        }
        if c.api_base.trim().is_empty() {
            return Err(ScorecardError::InvalidConfig(
                "api_base must not be empty".into(),
            ));
        }
        if c.extraction_concurrency == 0 {
            return Err(ScorecardError::InvalidConfig(
                "Extraction concurrency must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = AnalyzerConfig::default();
        assert_eq!(c.model, "gpt-4.1-mini");
        assert_eq!(c.temperature, 0.2);
        assert!(c.request_timeout_secs.is_none());
        assert!(!c.rasterize_scanned_pdfs);
    }

    #[test]
    fn missing_key_is_a_configuration_error() {
        let c = AnalyzerConfig::default();
        let err = c.require_api_key().unwrap_err();
        assert_eq!(err.to_string(), "OPENAI_API_KEY not set");

        let c = AnalyzerConfig::builder().maybe_api_key(Some("   ".into())).build().unwrap();
        assert!(c.require_api_key().is_err());
    }

    #[test]
    fn builder_clamps_and_trims() {
        let c = AnalyzerConfig::builder()
            .temperature(5.0)
            .extraction_concurrency(0)
            .api_base("http://localhost:8080/v1/")
            .build()
            .unwrap();
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.extraction_concurrency, 1);
        assert_eq!(c.api_base, "http://localhost:8080/v1");
    }

    #[test]
    fn empty_model_rejected() {
        let err = AnalyzerConfig::builder().model("  ").build().unwrap_err();
        assert!(err.to_string().contains("model"), "got: {err}");
    }

    #[test]
    fn debug_redacts_key() {
        let c = AnalyzerConfig::builder().api_key("sk-secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-secret"), "got: {dbg}");
        assert!(dbg.contains("<redacted>"));
    }
}
