//! HTTP server binary for scorecard-analyzer.
//!
//! A thin shim that maps CLI flags / environment variables to
//! `AnalyzerConfig` and serves the router from `scorecard_analyzer::server`.

use anyhow::{Context, Result};
use clap::Parser;
use scorecard_analyzer::config::{API_KEY_ENV, DEFAULT_API_BASE, DEFAULT_MODEL};
use scorecard_analyzer::server::{self, DEFAULT_BODY_LIMIT};
use scorecard_analyzer::{Analyzer, AnalyzerConfig, PdfiumTextExtractor, ProviderClient};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "scorecard-server",
    version,
    about = "Serve POST /api/analyze-scorecard: extract provider quality measures from scorecards",
    long_about = None
)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "SCORECARD_BIND", default_value = "0.0.0.0:3000")]
    bind: String,

    /// OpenAI API key. Requests fail with 500 while it is unset.
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the Responses API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Vision model name
    #[arg(long, env = "SCORECARD_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Sampling temperature
    #[arg(long, env = "SCORECARD_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max output tokens per analysis
    #[arg(long, env = "SCORECARD_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Timeout for the inference call, in seconds (unset = no timeout)
    #[arg(long, env = "SCORECARD_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Route inference through an edgequake-llm provider (openai, anthropic, gemini, …)
    /// instead of calling the Responses API directly
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Max request body size in MiB
    #[arg(long, env = "SCORECARD_MAX_UPLOAD_MB", default_value_t = DEFAULT_BODY_LIMIT / (1024 * 1024))]
    max_upload_mb: usize,

    /// Number of PDFs to extract concurrently
    #[arg(long, env = "SCORECARD_EXTRACTION_CONCURRENCY", default_value_t = 4)]
    extraction_concurrency: usize,

    /// Rasterise PDFs without a text layer and send their pages as images
    #[arg(long, env = "SCORECARD_RASTERIZE_SCANNED")]
    rasterize_scanned: bool,

    /// Path to the pdfium shared library (defaults to the system library)
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, env = "SCORECARD_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Configuration ────────────────────────────────────────────────────
    let mut builder = AnalyzerConfig::builder()
        .maybe_api_key(cli.api_key.clone())
        .api_base(cli.api_base.as_str())
        .model(cli.model.as_str())
        .temperature(cli.temperature)
        .extraction_concurrency(cli.extraction_concurrency)
        .rasterize_scanned_pdfs(cli.rasterize_scanned);
    if let Some(n) = cli.max_tokens {
        builder = builder.max_output_tokens(n);
    }
    if let Some(secs) = cli.timeout_secs {
        builder = builder.request_timeout_secs(secs);
    }
    if let Some(path) = &cli.pdfium_lib {
        builder = builder.pdfium_library_path(path);
    }
    let config = builder.build().context("Invalid configuration")?;

    // ── Analyzer ─────────────────────────────────────────────────────────
    let analyzer = match cli.provider.as_deref() {
        Some(name) => {
            let inference = ProviderClient::from_name(name, &config)
                .context("Failed to initialise LLM provider")?;
            let extractor = PdfiumTextExtractor::new(config.pdfium_library_path.clone());
            info!("Inference via edgequake-llm provider '{}'", name);
            Analyzer::new(config, Arc::new(extractor), Arc::new(inference))
        }
        None => {
            if config.require_api_key().is_err() {
                warn!(
                    "{} is not set; analysis requests will fail until it is configured",
                    API_KEY_ENV
                );
            }
            Analyzer::from_config(config).context("Failed to initialise analyzer")?
        }
    };
    info!("Model: {}", analyzer.config().model);

    // ── Serve ────────────────────────────────────────────────────────────
    let app = server::router(Arc::new(analyzer), cli.max_upload_mb * 1024 * 1024);
    let listener = TcpListener::bind(&cli.bind)
        .await
        .with_context(|| format!("Failed to bind {}", cli.bind))?;
    info!("Listening on {}", cli.bind);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
