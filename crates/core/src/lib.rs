//! Preprocessing pipeline and model evaluation for obesity profile
//! prediction.
//!
//! A single patient record flows expand → align → encode → model → rank:
//!
//! - `conditions`: substring matcher over the free-text history fields
//! - `features`: derived-column expansion and training-order alignment
//! - `encoders`: stored label encoders for categorical columns
//! - `model`: boosted-tree ensembles yielding per-profile probabilities
//! - `artifacts`: load-once artifact set shared read-only across requests
//! - `predict`: the composed pipeline plus result ranking
//! - `errors`: load-time vs per-request error split
//!
//! The preprocessing must reproduce the training-time transform exactly;
//! every normalization quirk in `features` is intentional.

pub mod artifacts;
pub mod conditions;
pub mod encoders;
pub mod errors;
pub mod features;
pub mod model;
pub mod predict;
pub mod record;

pub use artifacts::Artifacts;
pub use conditions::{has_condition, ConditionVocabularies};
pub use encoders::{EncoderSet, LabelEncoder};
pub use errors::{ConfigError, RequestError};
pub use model::{ProfileModel, PROFILE_LABELS};
pub use predict::{Prediction, Predictor};
pub use record::InputRecord;

/// Crate version string for health and status payloads
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FAMILY_FIELD, MEDICAL_FIELD, PSY_FIELD, TREATMENT_FIELD};
    use crate::model::{Node, ProfileClassifier, Tree};
    use serde_json::json;
    use std::collections::HashMap;

    /// End-to-end: the flow a request takes through the crate, with a
    /// record shaped like the production payload.
    #[test]
    fn full_pipeline_on_a_production_shaped_record() {
        let classifiers = PROFILE_LABELS
            .iter()
            .map(|label| ProfileClassifier {
                target: label.to_string(),
                bias: 0.0,
                trees: vec![Tree {
                    nodes: vec![
                        Node {
                            feature_index: 1,
                            threshold: 40.0,
                            left: 1,
                            right: 2,
                            value: None,
                        },
                        Node {
                            feature_index: 0,
                            threshold: 0.0,
                            left: 0,
                            right: 0,
                            value: Some(-1.0),
                        },
                        Node {
                            feature_index: 0,
                            threshold: 0.0,
                            left: 0,
                            right: 0,
                            value: Some(1.0),
                        },
                    ],
                }],
            })
            .collect();

        let model = ProfileModel {
            version: 1,
            feature_count: 4,
            classifiers,
            metadata: HashMap::new(),
        };

        let mut encoders = HashMap::new();
        encoders.insert(
            "Sexe".to_string(),
            LabelEncoder {
                classes: vec!["F".into(), "M".into()],
            },
        );
        encoders.insert(
            "Tabac".to_string(),
            LabelEncoder {
                classes: vec!["non".into(), "oui".into()],
            },
        );

        let artifacts = Artifacts {
            model,
            encoders: EncoderSet::new(encoders),
            feature_order: vec![
                "Sexe".into(),
                "Age".into(),
                "Tabac".into(),
                "fh_diabete".into(),
            ],
            vocabularies: ConditionVocabularies {
                family: vec!["diabete".into()],
                psy: vec!["depression".into()],
                treatment: vec!["cortisone".into()],
                medical: vec!["chirurgie".into()],
            },
        };

        let mut record = InputRecord::new();
        record.insert("Sexe".into(), json!("M"));
        record.insert("Age".into(), json!(52));
        record.insert("Taille".into(), json!(178)); // not in feature order, discarded
        record.insert(FAMILY_FIELD.into(), json!("diabete, HTA"));
        record.insert(PSY_FIELD.into(), json!("non"));
        record.insert(TREATMENT_FIELD.into(), json!("non"));
        record.insert(MEDICAL_FIELD.into(), json!("non"));
        // "Tabac" left out on purpose: fills with 0, encodes via fallback

        let predictions = Predictor::new(artifacts).predict(&record).unwrap();

        assert_eq!(predictions.len(), PROFILE_LABELS.len());
        // Age 52 > 40 pushes every profile to sigmoid(1)
        for prediction in &predictions {
            assert!((prediction.probability - 0.731_058_578_630_0049).abs() < 1e-9);
            assert_eq!(prediction.percentage, "73.1%");
        }
    }
}
