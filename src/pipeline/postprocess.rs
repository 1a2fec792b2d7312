//! Post-processing: turn the model's JSON text into a trusted
//! [`AnalysisResult`].
//!
//! The model is asked for a fixed schema but is never trusted with it:
//!
//! 1. Strip an outer ```` ```json ```` fence if the model added one
//! 2. Parse into explicit raw types; anything off-schema is a parse error
//! 3. Replace the provider identity with the caller's values
//! 4. Clean measure names (drop `(CMS…)` / `(NQF…)` annotations, collapse
//!    whitespace), coerce numerator/denominator to numbers, drop nameless
//!    measures
//! 5. Pass the narrative through untouched
//!
//! Each step is a pure function and tested on its own.

use crate::error::ScorecardError;
use crate::output::{AnalysisResult, Measure, Narrative, ProviderSummary};
use crate::pipeline::input::SubmissionRequest;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Parse and normalise the model payload for `submission`.
pub fn normalize(raw: &str, submission: &SubmissionRequest) -> Result<AnalysisResult, ScorecardError> {
    let parsed = parse_payload(raw)?;

    let provider = ProviderSummary {
        provider_name: submission.provider_name.clone(),
        reporting_month: submission.reporting_month.clone(),
        reporting_year: submission.reporting_year.clone(),
        ..parsed.provider.unwrap_or_default().into_summary()
    };

    let total = match &parsed.measures {
        Value::Array(items) => items.len(),
        _ => 0,
    };
    let measures = normalize_measures(&parsed.measures);
    if measures.len() < total {
        debug!("Dropped {} measures with empty names", total - measures.len());
    }

    Ok(AnalysisResult {
        provider,
        measures,
        narrative: parsed.narrative,
    })
}

// ── Step 1: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json|JSON)?[ \t]*\n(.*)\n```\s*$").unwrap());

fn strip_json_fences(input: &str) -> &str {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str(),
        None => trimmed,
    }
}

// ── Step 2: Parse into raw schema types ──────────────────────────────────────

/// The model's answer before normalisation.
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    provider: Option<RawProvider>,
    /// Kept loose: a non-array value is treated as "no measures".
    #[serde(default)]
    measures: Value,
    narrative: Narrative,
}

/// Provider block from the model. Identity fields are ignored on purpose.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawProvider {
    #[serde(deserialize_with = "optional_number")]
    current_encounters: Option<f64>,
    #[serde(deserialize_with = "optional_number")]
    prior_encounters: Option<f64>,
    #[serde(deserialize_with = "optional_number")]
    awvs_completed: Option<f64>,
    #[serde(deserialize_with = "optional_number")]
    awvs_goal: Option<f64>,
    #[serde(deserialize_with = "optional_number")]
    tocs_completed: Option<f64>,
    #[serde(deserialize_with = "optional_number")]
    tocs_goal: Option<f64>,
}

/// Provider counts: numbers and numeric strings are kept, anything else is null.
fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let n = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(n.filter(|n| n.is_finite()))
}

impl RawProvider {
    fn into_summary(self) -> ProviderSummary {
        ProviderSummary {
            current_encounters: self.current_encounters,
            prior_encounters: self.prior_encounters,
            awvs_completed: self.awvs_completed,
            awvs_goal: self.awvs_goal,
            tocs_completed: self.tocs_completed,
            tocs_goal: self.tocs_goal,
            ..Default::default()
        }
    }
}

fn parse_payload(raw: &str) -> Result<RawAnalysis, ScorecardError> {
    serde_json::from_str(strip_json_fences(raw)).map_err(|e| {
        warn!("Model output rejected: {}", e);
        ScorecardError::InvalidModelOutput {
            reason: e.to_string(),
            raw: raw.to_string(),
        }
    })
}

// ── Step 3/4: Measures ───────────────────────────────────────────────────────

/// Parenthesised group mentioning CMS or NQF, with surrounding whitespace.
static RE_CODE_ANNOTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*\([^)]*(?:CMS|NQF)[^)]*\)\s*").unwrap());

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Strip coding-system annotations and normalise whitespace.
///
/// `"A1c Testing (CMS122v10) Rate"` → `"A1c Testing Rate"`. Idempotent.
pub fn clean_measure_name(name: &str) -> String {
    let without_codes = RE_CODE_ANNOTATION.replace_all(name, " ");
    RE_WHITESPACE
        .replace_all(&without_codes, " ")
        .trim()
        .to_string()
}

fn normalize_measures(measures: &Value) -> Vec<Measure> {
    let Value::Array(items) = measures else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let name = clean_measure_name(&name_text(item.get("name")));
            if name.is_empty() {
                return None;
            }
            Some(Measure {
                name,
                numerator: coerce_number(item.get("numerator")),
                denominator: coerce_number(item.get("denominator")),
            })
        })
        .collect()
}

/// Measure names: strings as-is, numbers stringified, anything else empty.
fn name_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Numbers pass through; numeric strings are parsed; booleans are 1/0;
/// anything missing, null, non-numeric or non-finite becomes 0.
fn coerce_number(value: Option<&Value>) -> f64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse::<f64>().unwrap_or(0.0)
            }
        }
        Some(Value::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn acme() -> SubmissionRequest {
        SubmissionRequest::new("Acme Clinic", "March", "2024")
    }

    fn payload(measures: Value) -> String {
        json!({
            "provider": {
                "providerName": "Someone Else",
                "reportingMonth": "June",
                "reportingYear": "1999",
                "currentEncounters": 812,
                "awvsGoal": null
            },
            "measures": measures,
            "narrative": {
                "why": "Gaps in diabetic care",
                "how": "Outreach lists",
                "priorities": [
                    { "t": "A1c", "d": "Close A1c gaps" },
                    { "t": "AWV", "d": "Schedule AWVs" },
                    { "t": "TOC", "d": "Follow up discharges" }
                ]
            }
        })
        .to_string()
    }

    #[test]
    fn clean_name_examples() {
        assert_eq!(clean_measure_name("Diabetes Control (NQF 0059)"), "Diabetes Control");
        assert_eq!(clean_measure_name("A1c Testing (CMS122v10) Rate"), "A1c Testing Rate");
        assert_eq!(clean_measure_name("Screening (cms 138) (nqf 0028)"), "Screening");
        assert_eq!(clean_measure_name("(CMS123)"), "");
        assert_eq!(clean_measure_name("  BP   Control\n(Adults) "), "BP Control (Adults)");
    }

    #[test]
    fn clean_name_idempotent() {
        for name in [
            "Diabetes Control (NQF 0059)",
            "A1c Testing (CMS122v10) Rate",
            "Colorectal\tScreening (ages 45-75)",
            "(CMS123)",
            "",
        ] {
            let once = clean_measure_name(name);
            assert_eq!(clean_measure_name(&once), once, "not idempotent for {name:?}");
        }
    }

    #[test]
    fn identity_overwritten_from_submission() {
        let result = normalize(&payload(json!([])), &acme()).unwrap();
        assert_eq!(result.provider.provider_name, "Acme Clinic");
        assert_eq!(result.provider.reporting_month, "March");
        assert_eq!(result.provider.reporting_year, "2024");
        assert_eq!(result.provider.current_encounters, Some(812.0));
        assert_eq!(result.provider.awvs_goal, None);
    }

    #[test]
    fn missing_provider_block_still_gets_identity() {
        let raw = r#"{"measures":[],"narrative":{"why":"","how":"","priorities":[]}}"#;
        let result = normalize(raw, &acme()).unwrap();
        assert_eq!(result.provider.provider_name, "Acme Clinic");
        assert_eq!(result.provider.current_encounters, None);
    }

    #[test]
    fn provider_counts_tolerate_strings_and_junk() {
        let raw = r#"{
            "provider": { "currentEncounters": " 398 ", "priorEncounters": "unknown", "awvsGoal": [50], "tocsGoal": 12 },
            "narrative": { "why": "", "how": "", "priorities": [] }
        }"#;
        let p = normalize(raw, &acme()).unwrap().provider;
        assert_eq!(p.current_encounters, Some(398.0));
        assert_eq!(p.prior_encounters, None);
        assert_eq!(p.awvs_goal, None);
        assert_eq!(p.tocs_goal, Some(12.0));
        assert_eq!(p.awvs_completed, None);
    }

    #[test]
    fn measures_cleaned_coerced_and_filtered() {
        let raw = payload(json!([
            { "name": "A1c Control (NQF 0059)", "numerator": 45, "denominator": 60 },
            { "name": "(CMS123)", "numerator": 1, "denominator": 2 },
            { "name": "BP Control", "numerator": "12", "denominator": null },
            { "name": "Statin Therapy", "numerator": "n/a" },
            { "name": "", "numerator": 3, "denominator": 4 },
            { "numerator": 3, "denominator": 4 },
            { "name": 2024, "numerator": true, "denominator": 2.5 }
        ]));
        let result = normalize(&raw, &acme()).unwrap();
        assert_eq!(
            result.measures,
            vec![
                Measure { name: "A1c Control".into(), numerator: 45.0, denominator: 60.0 },
                Measure { name: "BP Control".into(), numerator: 12.0, denominator: 0.0 },
                Measure { name: "Statin Therapy".into(), numerator: 0.0, denominator: 0.0 },
                Measure { name: "2024".into(), numerator: 1.0, denominator: 2.5 },
            ]
        );
    }

    #[test]
    fn non_array_measures_become_empty() {
        for measures in [json!(null), json!({ "name": "x" }), json!("A1c")] {
            let result = normalize(&payload(measures), &acme()).unwrap();
            assert!(result.measures.is_empty());
        }
        let raw = r#"{"narrative":{"why":"w","how":"h","priorities":[]}}"#;
        assert!(normalize(raw, &acme()).unwrap().measures.is_empty());
    }

    #[test]
    fn narrative_passed_through() {
        let result = normalize(&payload(json!([])), &acme()).unwrap();
        assert_eq!(result.narrative.why, "Gaps in diabetic care");
        assert_eq!(result.narrative.priorities.len(), 3);
        assert_eq!(result.narrative.priorities[2].t, "TOC");
    }

    #[test]
    fn fenced_json_accepted() {
        let raw = format!("```json\n{}\n```", payload(json!([])));
        assert!(normalize(&raw, &acme()).is_ok());
        assert_eq!(strip_json_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_json_fences(" {} "), "{}");
    }

    #[test]
    fn invalid_json_keeps_raw_text() {
        let err = normalize("Sure! Here are the metrics.", &acme()).unwrap_err();
        match err {
            ScorecardError::InvalidModelOutput { raw, .. } => {
                assert_eq!(raw, "Sure! Here are the metrics.")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            normalize("", &acme()),
            Err(ScorecardError::InvalidModelOutput { .. })
        ));
    }

    #[test]
    fn off_schema_output_is_a_parse_error() {
        // Valid JSON, but no narrative.
        let err = normalize(r#"{"measures":[]}"#, &acme()).unwrap_err();
        assert!(matches!(err, ScorecardError::InvalidModelOutput { .. }));
        // Top level is not an object.
        let err = normalize("[1,2,3]", &acme()).unwrap_err();
        assert!(matches!(err, ScorecardError::InvalidModelOutput { .. }));
    }

    #[test]
    fn coerce_number_edge_cases() {
        assert_eq!(coerce_number(None), 0.0);
        assert_eq!(coerce_number(Some(&json!(null))), 0.0);
        assert_eq!(coerce_number(Some(&json!(" 7.5 "))), 7.5);
        assert_eq!(coerce_number(Some(&json!(""))), 0.0);
        assert_eq!(coerce_number(Some(&json!("inf"))), 0.0);
        assert_eq!(coerce_number(Some(&json!([1]))), 0.0);
        assert_eq!(coerce_number(Some(&json!(false))), 0.0);
    }
}
