//! Pipeline stages for scorecard analysis.
//!
//! Each submodule implements one step. The orchestration lives in
//! [`crate::analyze`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ encode ──▶ llm ──▶ postprocess
//! (form)    (pdf text)  (base64)  (VLM)   (normalise)
//! ```
//!
//! 1. [`input`]: submission fields and uploaded files, plus validation
//! 2. [`extract`]: PDF text layer per file (pdfium runs in `spawn_blocking`)
//!    and base64 images; concurrent but order-preserving
//! 3. [`render`]: blocking pdfium helpers: text layer and optional page
//!    rasterisation for scanned PDFs
//! 4. [`encode`]: base64 data URLs for the multimodal request body
//! 5. [`llm`]: the single inference round-trip; the only stage with
//!    network I/O
//! 6. [`postprocess`]: parse the model's JSON and coerce it into
//!    [`crate::output::AnalysisResult`]

pub mod encode;
pub mod extract;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod render;
