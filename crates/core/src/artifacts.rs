//! Load-time artifact handling
//!
//! Everything the request path needs is read once from the artifact
//! directory, validated, and then shared read-only across requests. Any
//! failure here is fatal: serving with a partial artifact set would produce
//! silently wrong predictions.

use crate::conditions::ConditionVocabularies;
use crate::encoders::EncoderSet;
use crate::errors::ConfigError;
use crate::model::ProfileModel;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const MODEL_FILE: &str = "model.json";
pub const ENCODERS_FILE: &str = "label_encoders.json";
pub const FEATURE_ORDER_FILE: &str = "feature_order.json";
pub const METADATA_FILE: &str = "preprocessing_metadata.json";

/// The full trained artifact set, immutable after load.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub model: ProfileModel,
    pub encoders: EncoderSet,
    pub feature_order: Vec<String>,
    pub vocabularies: ConditionVocabularies,
}

impl Artifacts {
    /// Reads and validates all four artifacts from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();

        let model: ProfileModel = read_json(dir.join(MODEL_FILE))?;
        model.validate()?;

        let encoders: EncoderSet = read_json(dir.join(ENCODERS_FILE))?;
        encoders.validate()?;

        let feature_order: Vec<String> = read_json(dir.join(FEATURE_ORDER_FILE))?;
        if feature_order.len() != model.feature_count {
            return Err(ConfigError::InvalidModel(format!(
                "feature order lists {} columns but the model expects {}",
                feature_order.len(),
                model.feature_count
            )));
        }

        let vocabularies: ConditionVocabularies = read_json(dir.join(METADATA_FILE))?;

        info!(
            version = model.version,
            features = feature_order.len(),
            encoded_columns = encoders.len(),
            "model artifacts loaded"
        );

        Ok(Self {
            model,
            encoders,
            feature_order,
            vocabularies,
        })
    }
}

fn read_json<T: DeserializeOwned>(path: PathBuf) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
}
