//! Content extraction: turn uploaded files into prompt text and images.
//!
//! Each file is handled on its own: PDFs go through the [`TextExtractor`]
//! collaborator, images are base64-encoded, anything else is skipped.
//! Files may be processed concurrently (`extraction_concurrency`), but
//! `buffered` yields results in submission order, so the combined text and
//! the image sequence always follow the order files were uploaded in.

use crate::config::AnalyzerConfig;
use crate::error::ScorecardError;
use crate::pipeline::encode::{encode_upload, EncodedImage};
use crate::pipeline::input::{FileKind, UploadedFile};
use crate::pipeline::render;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use futures::FutureExt;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Placeholder written under a PDF label when the file yields no text.
pub const NO_TEXT_PLACEHOLDER: &str = "[No readable text extracted]";

/// Converts PDF bytes into plain text.
///
/// `render_pages` is optional: the default yields no images, which simply
/// disables scanned-PDF rasterisation for that extractor.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, file: &UploadedFile) -> Result<String, ScorecardError>;

    async fn render_pages(
        &self,
        _file: &UploadedFile,
        _max_pages: usize,
        _max_pixels: u32,
    ) -> Result<Vec<EncodedImage>, ScorecardError> {
        Ok(Vec::new())
    }
}

/// [`TextExtractor`] backed by pdfium's native text layer.
#[derive(Debug, Clone, Default)]
pub struct PdfiumTextExtractor {
    library_path: Option<PathBuf>,
}

impl PdfiumTextExtractor {
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }
}

#[async_trait]
impl TextExtractor for PdfiumTextExtractor {
    async fn extract_text(&self, file: &UploadedFile) -> Result<String, ScorecardError> {
        let bytes = file.bytes.clone();
        let lib = self.library_path.clone();

        tokio::task::spawn_blocking(move || render::extract_text_blocking(&bytes, lib.as_deref()))
            .await
            .map_err(|e| ScorecardError::Internal(format!("Text extraction task panicked: {e}")))?
            .map_err(|detail| ScorecardError::PdfExtraction {
                file: file.name.clone(),
                detail,
            })
    }

    async fn render_pages(
        &self,
        file: &UploadedFile,
        max_pages: usize,
        max_pixels: u32,
    ) -> Result<Vec<EncodedImage>, ScorecardError> {
        let bytes = file.bytes.clone();
        let lib = self.library_path.clone();

        tokio::task::spawn_blocking(move || {
            render::render_pages_blocking(&bytes, lib.as_deref(), max_pages, max_pixels)
        })
        .await
        .map_err(|e| ScorecardError::Internal(format!("Render task panicked: {e}")))?
        .map_err(|detail| ScorecardError::PdfExtraction {
            file: file.name.clone(),
            detail,
        })
    }
}

/// Text and images gathered from a submission, in submission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedContent {
    /// Labelled PDF text blocks; empty when no PDF was uploaded.
    pub combined_text: String,
    pub images: Vec<EncodedImage>,
}

/// What a single file contributes.
#[derive(Debug, Default)]
struct FileContribution {
    text_block: Option<String>,
    images: Vec<EncodedImage>,
}

/// Extract every file, failing fast on the first collaborator error.
pub async fn extract_content(
    files: &[UploadedFile],
    extractor: &dyn TextExtractor,
    config: &AnalyzerConfig,
) -> Result<ExtractedContent, ScorecardError> {
    let tasks: Vec<_> = files
        .iter()
        .map(|file| extract_file(file, extractor, config).boxed())
        .collect();
    let contributions: Vec<FileContribution> = stream::iter(tasks)
        .buffered(config.extraction_concurrency.max(1))
        .try_collect()
        .await?;

    let mut content = ExtractedContent::default();
    for c in contributions {
        if let Some(block) = c.text_block {
            content.combined_text.push_str(&block);
        }
        content.images.extend(c.images);
    }
    Ok(content)
}

async fn extract_file(
    file: &UploadedFile,
    extractor: &dyn TextExtractor,
    config: &AnalyzerConfig,
) -> Result<FileContribution, ScorecardError> {
    match file.kind() {
        FileKind::Pdf => {
            let text = extractor.extract_text(file).await?;
            if !text.trim().is_empty() {
                debug!("PDF '{}': {} chars of text", file.name, text.len());
                return Ok(FileContribution {
                    text_block: Some(pdf_block(&file.name, &text)),
                    images: Vec::new(),
                });
            }

            warn!("PDF '{}' has no readable text layer", file.name);
            let images = if config.rasterize_scanned_pdfs {
                extractor
                    .render_pages(file, config.max_rendered_pages, config.max_rendered_pixels)
                    .await?
            } else {
                Vec::new()
            };
            Ok(FileContribution {
                text_block: Some(pdf_block(&file.name, NO_TEXT_PLACEHOLDER)),
                images,
            })
        }
        FileKind::Image => Ok(FileContribution {
            text_block: None,
            images: vec![encode_upload(file)],
        }),
        FileKind::Other => {
            debug!(
                "Skipping '{}' with unsupported content type '{}'",
                file.name, file.content_type
            );
            Ok(FileContribution::default())
        }
    }
}

fn pdf_block(name: &str, body: &str) -> String {
    format!("\n\n--- PDF: {name} ---\n{body}")
}
