//! Boosted-tree profile model
//!
//! The trained artifact is a set of five binary gradient-boosted tree
//! ensembles, one per obesity profile. Each ensemble sums its tree leaf
//! values over the encoded feature vector and squashes the raw score
//! through the logistic function to a positive-class probability.

use crate::errors::{ConfigError, RequestError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Target profiles, in training order. Ties in the ranked output preserve
/// this order.
pub const PROFILE_LABELS: [&str; 5] = [
    "digestif",
    "hormonal",
    "iatrogene",
    "metabolique",
    "psychologique",
];

/// A decision tree node (internal or leaf)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    /// Feature index to compare (for internal nodes)
    pub feature_index: u16,
    /// Threshold value for comparison
    pub threshold: f64,
    /// Index of left child node
    pub left: u16,
    /// Index of right child node
    pub right: u16,
    /// Leaf value (None for internal nodes, Some for leaves)
    pub value: Option<f64>,
}

/// A single decision tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tree {
    /// Nodes indexed by position; node 0 is the root
    pub nodes: Vec<Node>,
}

/// One binary classifier of the ensemble: trees plus a base bias,
/// predicting the positive-class probability for a single profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileClassifier {
    /// Profile label this classifier scores
    pub target: String,
    /// Base bias added to all raw scores
    pub bias: f64,
    /// Decision trees in the ensemble
    pub trees: Vec<Tree>,
}

/// Complete multi-profile model as serialized at training time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileModel {
    /// Model version for compatibility
    pub version: u32,
    /// Number of input features expected, post-alignment
    pub feature_count: usize,
    /// One binary classifier per profile, in `PROFILE_LABELS` order
    pub classifiers: Vec<ProfileClassifier>,
    /// Free-form training metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Walk one tree to its leaf for the given feature row.
fn eval_tree(tree: &Tree, features: &[f64]) -> f64 {
    let mut idx = 0usize;

    loop {
        let Some(node) = tree.nodes.get(idx) else {
            // invalid structure is rejected at load; never loops
            return 0.0;
        };

        if let Some(value) = node.value {
            return value;
        }

        let feature_value = features
            .get(node.feature_index as usize)
            .copied()
            .unwrap_or(0.0);

        idx = if feature_value <= node.threshold {
            node.left as usize
        } else {
            node.right as usize
        };
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl ProfileClassifier {
    /// Raw additive score: bias plus the sum of tree leaf values.
    fn raw_score(&self, features: &[f64]) -> f64 {
        self.trees
            .iter()
            .map(|tree| eval_tree(tree, features))
            .sum::<f64>()
            + self.bias
    }

    /// Positive-class probability in [0, 1].
    pub fn predict_proba(&self, features: &[f64]) -> f64 {
        sigmoid(self.raw_score(features))
    }
}

impl ProfileModel {
    /// Structural validation, run once at load time.
    ///
    /// Checks the classifier set against `PROFILE_LABELS`, and every tree
    /// for leaf/child consistency and in-range feature indices, so that
    /// evaluation is total per request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feature_count == 0 {
            return Err(ConfigError::InvalidModel("model has no features".into()));
        }

        if self.classifiers.len() != PROFILE_LABELS.len() {
            return Err(ConfigError::InvalidModel(format!(
                "expected {} classifiers, found {}",
                PROFILE_LABELS.len(),
                self.classifiers.len()
            )));
        }

        for (classifier, label) in self.classifiers.iter().zip(PROFILE_LABELS) {
            if classifier.target != label {
                return Err(ConfigError::InvalidModel(format!(
                    "classifier targets `{}` where `{label}` was expected",
                    classifier.target
                )));
            }

            if classifier.trees.is_empty() {
                return Err(ConfigError::InvalidModel(format!(
                    "classifier `{label}` has no trees"
                )));
            }

            for (tree_idx, tree) in classifier.trees.iter().enumerate() {
                if tree.nodes.is_empty() {
                    return Err(ConfigError::InvalidModel(format!(
                        "classifier `{label}` tree {tree_idx} has no nodes"
                    )));
                }

                for (node_idx, node) in tree.nodes.iter().enumerate() {
                    if node.value.is_some() {
                        // leaf: children must be unset
                        if node.left != 0 || node.right != 0 {
                            return Err(ConfigError::InvalidModel(format!(
                                "classifier `{label}` tree {tree_idx} leaf {node_idx} has children"
                            )));
                        }
                        continue;
                    }

                    if node.feature_index as usize >= self.feature_count {
                        return Err(ConfigError::InvalidModel(format!(
                            "classifier `{label}` tree {tree_idx} node {node_idx} reads feature {} of {}",
                            node.feature_index, self.feature_count
                        )));
                    }

                    let nodes = tree.nodes.len();
                    if node.left as usize >= nodes || node.right as usize >= nodes {
                        return Err(ConfigError::InvalidModel(format!(
                            "classifier `{label}` tree {tree_idx} node {node_idx} child out of range"
                        )));
                    }

                    if node.left as usize <= node_idx || node.right as usize <= node_idx {
                        return Err(ConfigError::InvalidModel(format!(
                            "classifier `{label}` tree {tree_idx} node {node_idx} child does not descend"
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Per-profile positive-class probabilities for one encoded row, in
    /// `PROFILE_LABELS` order.
    pub fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, RequestError> {
        if features.len() != self.feature_count {
            return Err(RequestError::FeatureCountMismatch {
                expected: self.feature_count,
                actual: features.len(),
            });
        }

        Ok(self
            .classifiers
            .iter()
            .map(|classifier| classifier.predict_proba(features))
            .collect())
    }
}
