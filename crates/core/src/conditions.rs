//! Free-text condition matching
//!
//! The trained model derives boolean columns from four free-text history
//! fields by probing each for a fixed list of condition names. The match is
//! a case-insensitive substring test; patients with no history carry the
//! literal `"non"`, which must never match anything.

use crate::record::value_to_string;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The four condition vocabularies, one per free-text source field.
///
/// Loaded from the preprocessing metadata artifact; the key names are fixed
/// by the training pipeline that wrote it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionVocabularies {
    #[serde(rename = "family_conditions")]
    pub family: Vec<String>,
    #[serde(rename = "psy_conditions")]
    pub psy: Vec<String>,
    #[serde(rename = "treatment_conditions")]
    pub treatment: Vec<String>,
    #[serde(rename = "medical_conditions")]
    pub medical: Vec<String>,
}

/// Tests whether `condition` appears in a free-text field value.
///
/// Returns 1 iff the lowercased condition is a substring of the lowercased
/// value. Absent/null values and the exact sentinel `"non"` always yield 0.
/// Total function: any JSON value is accepted.
pub fn has_condition(value: Option<&Value>, condition: &str) -> u8 {
    let value = match value {
        None | Some(Value::Null) => return 0,
        Some(v) => v,
    };

    if matches!(value, Value::String(s) if s == "non") {
        return 0;
    }

    let haystack = value_to_string(value).to_lowercase();
    u8::from(haystack.contains(&condition.to_lowercase()))
}
