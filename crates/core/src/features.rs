//! Feature expansion and alignment
//!
//! Expansion turns the four free-text history fields into one 0/1 column per
//! (field, condition) pair; alignment then reshapes the working record into
//! the exact column order the model was trained on.
//!
//! The derived column names must match the training pipeline byte-for-byte,
//! including the per-field cleanup of spaces, apostrophes, hyphens and
//! accented characters. Do not "fix" the asymmetry between the four rules.

use crate::conditions::{has_condition, ConditionVocabularies};
use crate::errors::RequestError;
use crate::record::InputRecord;
use serde_json::{Map, Value};

/// Raw free-text source fields, dropped after expansion.
pub const FAMILY_FIELD: &str = "terrain familial";
pub const PSY_FIELD: &str = "trouble psy";
pub const TREATMENT_FIELD: &str = "traitements";
pub const MEDICAL_FIELD: &str = "TT medical";

const FREE_TEXT_FIELDS: [&str; 4] = [FAMILY_FIELD, PSY_FIELD, TREATMENT_FIELD, MEDICAL_FIELD];

/// `fh_` columns: lowercase, spaces to underscores.
fn family_feature_name(condition: &str) -> String {
    format!("fh_{}", condition.to_lowercase().replace(' ', "_"))
}

/// `psy_` columns: lowercase, spaces to underscores, apostrophes removed.
fn psy_feature_name(condition: &str) -> String {
    format!(
        "psy_{}",
        condition.to_lowercase().replace(' ', "_").replace('\'', "")
    )
}

/// `treat_` columns: lowercase, hyphens to underscores, é/è folded to e.
fn treatment_feature_name(condition: &str) -> String {
    format!(
        "treat_{}",
        condition
            .to_lowercase()
            .replace('-', "_")
            .replace('é', "e")
            .replace('è', "e")
    )
}

/// `med_` columns: lowercase, é/è/ê folded to e. Spaces are kept.
fn medical_feature_name(condition: &str) -> String {
    format!(
        "med_{}",
        condition
            .to_lowercase()
            .replace('é', "e")
            .replace('è', "e")
            .replace('ê', "e")
    )
}

/// Expands the free-text fields of `record` into derived 0/1 columns.
///
/// Returns the working record: every original column except the four
/// free-text sources, plus one derived column per vocabulary entry. A
/// present-but-null source expands to all zeros; an absent source key is a
/// request error, surfaced to the caller rather than guessed around.
pub fn expand(
    record: &InputRecord,
    vocabularies: &ConditionVocabularies,
) -> Result<Map<String, Value>, RequestError> {
    let groups: [(&'static str, &[String], fn(&str) -> String); 4] = [
        (FAMILY_FIELD, &vocabularies.family, family_feature_name),
        (PSY_FIELD, &vocabularies.psy, psy_feature_name),
        (TREATMENT_FIELD, &vocabularies.treatment, treatment_feature_name),
        (MEDICAL_FIELD, &vocabularies.medical, medical_feature_name),
    ];

    let mut working = record.clone();

    for (field, conditions, feature_name) in groups {
        let raw = record
            .get(field)
            .ok_or(RequestError::MissingField(field))?;
        for condition in conditions {
            let flag = has_condition(Some(raw), condition);
            working.insert(feature_name(condition), Value::from(flag));
        }
    }

    for field in FREE_TEXT_FIELDS {
        working.remove(field);
    }

    Ok(working)
}

/// Reindexes the working record to the training-time column order.
///
/// The feature-order list is authoritative: every listed column is present
/// in the output (missing ones as integer 0, the training pipeline's fill
/// value) and columns not listed are discarded.
pub fn align(features: &Map<String, Value>, feature_order: &[String]) -> Vec<Value> {
    feature_order
        .iter()
        .map(|column| features.get(column).cloned().unwrap_or(Value::from(0)))
        .collect()
}
