//! Prompts for scorecard extraction.
//!
//! The instruction (schema + rules) is fixed; the per-request user text wraps
//! it with the provider identity and the extracted PDF text. Everything is
//! deterministic: identical inputs always produce an identical prompt.
//!
//! Callers can replace the instruction through
//! [`crate::config::AnalyzerConfig::instruction`]; the constant here is used
//! only when no override is provided.

use crate::pipeline::input::SubmissionRequest;

/// Default extraction instruction: persona, rules and the JSON schema.
pub const DEFAULT_INSTRUCTION: &str = r#"
You are a Healthcare Quality Operations Expert and Performance Coach.
Extract provider performance metrics from the supplied scorecard(s).

Rules:
- Return JSON ONLY. No markdown. No commentary.
- Clean measure names: remove (CMS...) and (NQF...) codes.
- Do not invent numbers. If not found, use null (provider fields) or omit the measure entry.
- Measures must include numerator and denominator when present.

Return JSON with this schema:

{
  "provider": {
    "providerName": string,
    "reportingMonth": string,
    "reportingYear": string,
    "currentEncounters": number|null,
    "priorEncounters": number|null,
    "awvsCompleted": number|null,
    "awvsGoal": number|null,
    "tocsCompleted": number|null,
    "tocsGoal": number|null
  },
  "measures": [
    { "name": string, "numerator": number, "denominator": number }
  ],
  "narrative": {
    "why": string,
    "how": string,
    "priorities": [
      { "t": string, "d": string },
      { "t": string, "d": string },
      { "t": string, "d": string }
    ]
  }
}
"#;

/// Stands in for the PDF text when nothing was extracted.
pub const NO_PDF_TEXT_PLACEHOLDER: &str = "[No PDFs uploaded or no text extracted]";

/// Build the user message text for one submission.
///
/// Layout: identity lines, a label, the combined PDF text (or
/// [`NO_PDF_TEXT_PLACEHOLDER`]), a blank line, then the instruction.
pub fn build_user_text(
    submission: &SubmissionRequest,
    combined_text: &str,
    instruction: &str,
) -> String {
    let pdf_text = if combined_text.is_empty() {
        NO_PDF_TEXT_PLACEHOLDER
    } else {
        combined_text
    };

    format!(
        "Provider: {}\nMonth: {}\nYear: {}\n\nPDF Extracted Text (if any):\n{}\n\n{}",
        submission.provider_name,
        submission.reporting_month,
        submission.reporting_year,
        pdf_text,
        instruction
    )
}
