//! Inference: send the assembled prompt to a vision model, get JSON text back.
//!
//! Two back-ends sit behind [`InferenceClient`]:
//!
//! * [`ResponsesClient`] talks to the OpenAI Responses API directly over
//!   `reqwest`. It is the default because it keeps the raw upstream body for
//!   diagnostics when the call fails.
//! * [`ProviderClient`] routes through `edgequake-llm`, so any provider it
//!   supports (Anthropic, Gemini, Azure, Ollama …) can do the extraction.
//!
//! Both make exactly one round-trip per analysis: no retry, no streaming.

use crate::config::AnalyzerConfig;
use crate::error::ScorecardError;
use crate::pipeline::encode::EncodedImage;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// The outbound multimodal message: one text part followed by the images.
#[derive(Debug, Clone, Default)]
pub struct Prompt {
    pub user_text: String,
    pub images: Vec<EncodedImage>,
}

/// A structured-generation service that answers a [`Prompt`] with text
/// that should contain JSON.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &str;

    /// Fails when the client cannot possibly succeed (e.g. no credential).
    /// Checked before any extraction work starts.
    fn ensure_configured(&self) -> Result<(), ScorecardError> {
        Ok(())
    }

    /// One request, one response. Returns the model's text payload
    /// (possibly empty when the response carried no text).
    async fn complete(&self, prompt: &Prompt) -> Result<String, ScorecardError>;
}

// ── Responses API ────────────────────────────────────────────────────────

/// Error label for a non-success upstream status.
pub const UPSTREAM_ERROR: &str = "OpenAI error";

/// [`InferenceClient`] for `POST {api_base}/responses`.
#[derive(Debug, Clone)]
pub struct ResponsesClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_output_tokens: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<usize>,
    input: Vec<InputMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct InputMessage<'a> {
    role: &'static str,
    content: Vec<InputContent<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InputContent<'a> {
    InputText { text: &'a str },
    InputImage { image_url: String },
}

impl ResponsesClient {
    /// Build a client from the analyzer configuration.
    ///
    /// A missing credential is not an error here; it surfaces per request
    /// through [`InferenceClient::ensure_configured`].
    pub fn new(config: &AnalyzerConfig) -> Result<Self, ScorecardError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| ScorecardError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: format!("{}/responses", config.api_base.trim_end_matches('/')),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: config.model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    fn build_request<'a>(&'a self, prompt: &'a Prompt) -> ResponsesRequest<'a> {
        let mut content = Vec::with_capacity(1 + prompt.images.len());
        content.push(InputContent::InputText {
            text: &prompt.user_text,
        });
        content.extend(prompt.images.iter().map(|img| InputContent::InputImage {
            image_url: img.data_url(),
        }));

        ResponsesRequest {
            model: &self.model,
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
            input: vec![InputMessage {
                role: "user",
                content,
            }],
        }
    }

    fn api_key(&self) -> Result<&str, ScorecardError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ScorecardError::MissingCredential {
                var: crate::config::API_KEY_ENV.to_string(),
            })
    }
}

#[async_trait]
impl InferenceClient for ResponsesClient {
    fn name(&self) -> &str {
        "openai-responses"
    }

    fn ensure_configured(&self) -> Result<(), ScorecardError> {
        self.api_key().map(|_| ())
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, ScorecardError> {
        let key = self.api_key()?;
        let body = self.build_request(prompt);
        let start = Instant::now();

        info!(
            "Calling {} ({} images, {} chars of text)",
            self.model,
            prompt.images.len(),
            prompt.user_text.len()
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ScorecardError::upstream("OpenAI request failed", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Upstream returned HTTP {} after {:?}", status, start.elapsed());
            let body = response.text().await.unwrap_or_default();
            return Err(ScorecardError::upstream(UPSTREAM_ERROR, body));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ScorecardError::upstream("OpenAI request failed", e.to_string()))?;

        let value: Value = serde_json::from_str(&text).map_err(|e| {
            warn!("Upstream body is not JSON: {}", e);
            ScorecardError::upstream("OpenAI returned a non-JSON response", text.clone())
        })?;

        let payload = response_text(&value).unwrap_or_default();
        debug!(
            "Upstream answered in {:?}: {} chars of payload",
            start.elapsed(),
            payload.len()
        );
        Ok(payload.to_string())
    }
}

/// Where a Responses API body may carry the generated text, most specific first.
type TextStrategy = fn(&Value) -> Option<&str>;

const RESPONSE_TEXT_STRATEGIES: &[TextStrategy] = &[output_text_block, top_level_output_text];

/// Pull the generated text out of a Responses API body.
///
/// Strategies are tried in order; the first non-empty match wins.
pub fn response_text(value: &Value) -> Option<&str> {
    RESPONSE_TEXT_STRATEGIES
        .iter()
        .find_map(|strategy| strategy(value).filter(|text| !text.is_empty()))
}

/// `output[].content[]` → first block with `type == "output_text"`.
fn output_text_block(value: &Value) -> Option<&str> {
    value
        .get("output")?
        .as_array()?
        .iter()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .find(|block| block.get("type").and_then(Value::as_str) == Some("output_text"))?
        .get("text")?
        .as_str()
}

/// Convenience `output_text` field some gateways add at the top level.
fn top_level_output_text(value: &Value) -> Option<&str> {
    value.get("output_text")?.as_str()
}

// ── edgequake-llm providers ──────────────────────────────────────────────

/// [`InferenceClient`] over any `edgequake-llm` provider.
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    label: String,
    temperature: f32,
    max_tokens: Option<usize>,
}

impl ProviderClient {
    /// Wrap a pre-built provider.
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>, config: &AnalyzerConfig) -> Self {
        Self {
            provider,
            label: label.into(),
            temperature: config.temperature,
            max_tokens: config.max_output_tokens,
        }
    }

    /// Instantiate a named provider (`openai`, `anthropic`, `gemini`, …) with
    /// the configured model. The provider reads its own API key variable.
    pub fn from_name(provider_name: &str, config: &AnalyzerConfig) -> Result<Self, ScorecardError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, &config.model).map_err(|e| {
            ScorecardError::InvalidConfig(format!(
                "LLM provider '{provider_name}' is not configured: {e}"
            ))
        })?;
        Ok(Self::new(provider, provider_name, config))
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: self.max_tokens,
            ..Default::default()
        }
    }
}

#[async_trait]
impl InferenceClient for ProviderClient {
    fn name(&self) -> &str {
        &self.label
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, ScorecardError> {
        let images = prompt.images.iter().map(EncodedImage::to_image_data).collect();
        let messages = vec![ChatMessage::user_with_images(prompt.user_text.as_str(), images)];
        let start = Instant::now();

        let response = self
            .provider
            .chat(&messages, Some(&self.options()))
            .await
            .map_err(|e| {
                warn!("{}: chat failed: {}", self.label, e);
                ScorecardError::upstream(format!("{} error", self.label), e.to_string())
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens, {:?}",
            self.label,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        Ok(response.content)
    }
}
