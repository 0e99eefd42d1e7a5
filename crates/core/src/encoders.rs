//! Stored label encoders
//!
//! Categorical columns were integer-encoded at training time; the same
//! value-to-code mapping is replayed here from the serialized artifact.

use crate::errors::{ConfigError, RequestError};
use crate::record::{value_to_f64, value_to_string};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One column's encoder: the ordered vocabulary of classes seen at training
/// time. A value's code is its vocabulary index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    /// Integer code for `raw`.
    ///
    /// Values outside the vocabulary canonicalize to the first stored class
    /// before mapping, exactly as the training artifact behaves. The
    /// fallback is training-serialization-order dependent; keep it
    /// bit-for-bit and do not extend it to new columns.
    pub fn code_for(&self, raw: &str) -> usize {
        self.classes
            .iter()
            .position(|class| class == raw)
            .unwrap_or(0)
    }

    /// First stored class, the unseen-value fallback.
    pub fn fallback(&self) -> Option<&str> {
        self.classes.first().map(String::as_str)
    }
}

/// Column-name -> encoder map, applied to every aligned column that has one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncoderSet {
    encoders: HashMap<String, LabelEncoder>,
}

impl EncoderSet {
    pub fn new(encoders: HashMap<String, LabelEncoder>) -> Self {
        Self { encoders }
    }

    pub fn get(&self, column: &str) -> Option<&LabelEncoder> {
        self.encoders.get(column)
    }

    pub fn len(&self) -> usize {
        self.encoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }

    /// Rejects encoders that could not produce a code for any value.
    /// Load-time check so `code_for` stays total per request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (column, encoder) in &self.encoders {
            if encoder.classes.is_empty() {
                return Err(ConfigError::EmptyEncoder(column.clone()));
            }
        }
        Ok(())
    }

    /// Converts the aligned value row to the numeric vector the model eats.
    ///
    /// Encoded columns go through their stored vocabulary after string
    /// coercion; everything else must already be numeric.
    pub fn apply(
        &self,
        feature_order: &[String],
        values: &[Value],
    ) -> Result<Vec<f64>, RequestError> {
        feature_order
            .iter()
            .zip(values)
            .map(|(column, value)| match self.get(column) {
                Some(encoder) => Ok(encoder.code_for(&value_to_string(value)) as f64),
                None => value_to_f64(column, value),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sexe_encoder() -> LabelEncoder {
        LabelEncoder {
            classes: vec!["F".into(), "M".into()],
        }
    }

    #[test]
    fn known_values_map_to_their_vocabulary_index() {
        let encoder = sexe_encoder();
        assert_eq!(encoder.code_for("F"), 0);
        assert_eq!(encoder.code_for("M"), 1);
    }

    #[test]
    fn unseen_values_encode_as_the_fallback_class() {
        let encoder = sexe_encoder();
        assert_eq!(encoder.fallback(), Some("F"));
        assert_eq!(encoder.code_for("X"), encoder.code_for("F"));
    }

    #[test]
    fn apply_encodes_categorical_and_passes_numeric() {
        let mut encoders = HashMap::new();
        encoders.insert("Sexe".to_string(), sexe_encoder());
        let set = EncoderSet::new(encoders);

        let order = vec!["Sexe".to_string(), "Age".to_string()];
        let row = vec![json!("M"), json!(34)];
        assert_eq!(set.apply(&order, &row).unwrap(), vec![1.0, 34.0]);
    }

    #[test]
    fn apply_coerces_fill_zero_through_the_encoder() {
        // a categorical column the request never carried arrives as the
        // alignment fill value 0; "0" is unseen, so it encodes as class 0
        let mut encoders = HashMap::new();
        encoders.insert("Sexe".to_string(), sexe_encoder());
        let set = EncoderSet::new(encoders);

        let order = vec!["Sexe".to_string()];
        assert_eq!(set.apply(&order, &[json!(0)]).unwrap(), vec![0.0]);
    }

    #[test]
    fn apply_rejects_text_in_unencoded_columns() {
        let set = EncoderSet::default();
        let order = vec!["Age".to_string()];
        let err = set.apply(&order, &[json!("abc")]).unwrap_err();
        assert!(matches!(err, RequestError::NonNumeric { .. }));
    }

    #[test]
    fn empty_vocabulary_fails_validation() {
        let mut encoders = HashMap::new();
        encoders.insert(
            "Sexe".to_string(),
            LabelEncoder { classes: Vec::new() },
        );
        let set = EncoderSet::new(encoders);
        assert!(matches!(
            set.validate().unwrap_err(),
            ConfigError::EmptyEncoder(column) if column == "Sexe"
        ));
    }
}
