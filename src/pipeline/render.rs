//! pdfium access: text-layer extraction and page rasterisation.
//!
//! Everything here is blocking. `pdfium-render` wraps the pdfium C++ library,
//! which keeps thread-local state and must not run on Tokio worker threads;
//! callers wrap these functions in `tokio::task::spawn_blocking`.
//!
//! A fresh `Pdfium` binding is created per call. The OS caches the
//! `dlopen`, so repeat binds are effectively free, and no pdfium handle ever
//! crosses a thread boundary.

use crate::pipeline::encode::{encode_page, EncodedImage};
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, warn};

/// Bind to libpdfium at `library_path`, or to the system library.
pub fn bind_pdfium(library_path: Option<&Path>) -> Result<Pdfium, String> {
    let bindings = match library_path {
        Some(path) => Pdfium::bind_to_library(path).map_err(|e| {
            format!("failed to load pdfium from '{}': {e:?}", path.display())
        })?,
        None => Pdfium::bind_to_system_library().map_err(|e| {
            format!("pdfium library not found; set PDFIUM_LIB_PATH: {e:?}")
        })?,
    };
    Ok(Pdfium::new(bindings))
}

/// Read the embedded text layer of every page, pages joined by newlines.
///
/// Pages whose text layer cannot be read contribute nothing rather than
/// failing the whole document.
pub fn extract_text_blocking(pdf_bytes: &[u8], library_path: Option<&Path>) -> Result<String, String> {
    let pdfium = bind_pdfium(library_path)?;
    let document = pdfium
        .load_pdf_from_byte_slice(pdf_bytes, None)
        .map_err(|e| format!("cannot open PDF: {e:?}"))?;

    let pages: Vec<String> = document
        .pages()
        .iter()
        .map(|page| page.text().map(|t| t.all()).unwrap_or_default())
        .collect();

    debug!("Extracted text layer from {} pages", pages.len());
    Ok(pages.join("\n"))
}

/// 150 DPI relative to the 72 DPI PDF user space.
const RENDER_SCALE: f32 = 150.0 / 72.0;

/// Longest-edge cap as pdfium expects it.
fn pixel_cap(max_pixels: u32) -> i32 {
    i32::try_from(max_pixels).unwrap_or(i32::MAX)
}

/// Rasterise up to `max_pages` leading pages into PNG images.
///
/// `max_pixels` caps the longest edge so an oversized page cannot blow up
/// memory or the upload size of the inference request.
pub fn render_pages_blocking(
    pdf_bytes: &[u8],
    library_path: Option<&Path>,
    max_pages: usize,
    max_pixels: u32,
) -> Result<Vec<EncodedImage>, String> {
    let pdfium = bind_pdfium(library_path)?;
    let document = pdfium
        .load_pdf_from_byte_slice(pdf_bytes, None)
        .map_err(|e| format!("cannot open PDF: {e:?}"))?;

    let cap = pixel_cap(max_pixels);
    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(RENDER_SCALE)
        .set_maximum_width(cap)
        .set_maximum_height(cap);

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    if total_pages > max_pages {
        warn!(
            "Rendering only the first {} of {} pages",
            max_pages, total_pages
        );
    }

    let mut results = Vec::with_capacity(total_pages.min(max_pages));
    for (idx, page) in pages.iter().take(max_pages).enumerate() {
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| format!("rasterisation failed for page {}: {e:?}", idx + 1))?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );

        let encoded = encode_page(&image)
            .map_err(|e| format!("PNG encoding failed for page {}: {e}", idx + 1))?;
        results.push(encoded);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_cap_saturates() {
        assert_eq!(pixel_cap(2000), 2000);
        assert_eq!(pixel_cap(u32::MAX), i32::MAX);
    }
}
