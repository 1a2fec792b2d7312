//! Result types returned by a successful analysis.
//!
//! These are the response body of `POST /api/analyze-scorecard`. Field names
//! serialise in camelCase to match what scorecard front-ends already consume.

use serde::{Deserialize, Serialize, Serializer};

/// The normalised extraction result for one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub provider: ProviderSummary,
    pub measures: Vec<Measure>,
    pub narrative: Narrative,
}

/// Provider identity plus the headline volume figures.
///
/// The three identity fields always hold the values the caller submitted;
/// whatever the model produced for them is discarded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSummary {
    pub provider_name: String,
    pub reporting_month: String,
    pub reporting_year: String,
    #[serde(serialize_with = "serialize_optional_number")]
    pub current_encounters: Option<f64>,
    #[serde(serialize_with = "serialize_optional_number")]
    pub prior_encounters: Option<f64>,
    #[serde(serialize_with = "serialize_optional_number")]
    pub awvs_completed: Option<f64>,
    #[serde(serialize_with = "serialize_optional_number")]
    pub awvs_goal: Option<f64>,
    #[serde(serialize_with = "serialize_optional_number")]
    pub tocs_completed: Option<f64>,
    #[serde(serialize_with = "serialize_optional_number")]
    pub tocs_goal: Option<f64>,
}

/// One quality measure. `name` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub name: String,
    #[serde(serialize_with = "serialize_number")]
    pub numerator: f64,
    #[serde(serialize_with = "serialize_number")]
    pub denominator: f64,
}

/// Coaching narrative, passed through from the model as-is.
///
/// The instruction asks for exactly three priorities; that count is not
/// enforced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    pub why: String,
    pub how: String,
    pub priorities: Vec<Priority>,
}

/// A single priority: short title `t`, description `d`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Priority {
    pub t: String,
    pub d: String,
}

/// Largest magnitude that still round-trips exactly through an `i64`
/// without precision loss from the `f64` side (2^53).
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Write integral values as JSON integers (`45`, not `45.0`).
fn serialize_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() <= MAX_EXACT_INTEGER {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

fn serialize_optional_number<S: Serializer>(
    value: &Option<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serialize_number(v, serializer),
        None => serializer.serialize_none(),
    }
}
