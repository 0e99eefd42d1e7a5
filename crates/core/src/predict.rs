//! Prediction pipeline and result formatting

use crate::artifacts::Artifacts;
use crate::errors::RequestError;
use crate::features::{align, expand};
use crate::record::InputRecord;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

/// One ranked profile probability, as returned to the client.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Prediction {
    pub profile: String,
    pub probability: f64,
    pub percentage: String,
}

/// Runs the full preprocessing-and-inference pipeline for one record.
///
/// Owns the loaded artifact set; constructed once at startup and shared
/// read-only across requests. Nothing here mutates after construction, so
/// no locking is needed.
#[derive(Debug, Clone)]
pub struct Predictor {
    artifacts: Artifacts,
}

impl Predictor {
    pub fn new(artifacts: Artifacts) -> Self {
        Self { artifacts }
    }

    pub fn model_version(&self) -> u32 {
        self.artifacts.model.version
    }

    pub fn feature_count(&self) -> usize {
        self.artifacts.feature_order.len()
    }

    /// expand -> align -> encode -> model -> rank.
    ///
    /// Pure function of the record plus the immutable artifacts; any error
    /// is a `RequestError` for the boundary to convert, never a panic.
    pub fn predict(&self, record: &InputRecord) -> Result<Vec<Prediction>, RequestError> {
        let working = expand(record, &self.artifacts.vocabularies)?;
        let aligned = align(&working, &self.artifacts.feature_order);
        let encoded = self.artifacts.encoders.apply(&self.artifacts.feature_order, &aligned)?;
        let probabilities = self.artifacts.model.predict_proba(&encoded)?;

        debug!(features = encoded.len(), "record encoded for inference");

        let mut predictions: Vec<Prediction> = self
            .artifacts
            .model
            .classifiers
            .iter()
            .zip(probabilities)
            .map(|(classifier, probability)| Prediction {
                profile: classifier.target.clone(),
                probability,
                percentage: format_percentage(probability),
            })
            .collect();

        // stable sort: equal probabilities keep training label order
        predictions.sort_by(|a, b| {
            b.probability
                .partial_cmp(&a.probability)
                .unwrap_or(Ordering::Equal)
        });

        Ok(predictions)
    }
}

/// One-decimal percent string, e.g. 0.8533 -> "85.3%".
fn format_percentage(probability: f64) -> String {
    format!("{:.1}%", probability * 100.0)
}
