//! Machine Learning Module
//!
//! Serving side of the crime classifier:
//! - fitted normalization parameters ([`scaler`])
//! - the gradient-boosted tree ensemble ([`gbdt`])
//! - one-time artifact loading ([`artifacts`])
//! - the prediction service ([`inference`])
//!
//! Training happens offline; this module only consumes its artifacts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod artifacts;
pub mod gbdt;
pub mod inference;
pub mod scaler;

pub use artifacts::{ArtifactError, ArtifactPaths, LoadedArtifacts, ModelContext};
pub use gbdt::GradientBoostedClassifier;
pub use inference::{predict, Classifier, InferenceEngine, PredictionError, PredictionResult};
pub use scaler::NormalizationParameters;

/// Disagreement between the columns a component expects and what it was given.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("expected {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },

    #[error("column {position} is `{found}`, expected `{expected}`")]
    ColumnMismatch {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("classifier emits {found} classes, expected {expected}")]
    ClassCount { expected: usize, found: usize },

    #[error("{0}")]
    Invalid(String),
}

/// Require `found` to name exactly the `expected` columns in the same order.
pub fn check_columns(expected: &[String], found: &[String]) -> Result<(), SchemaError> {
    if expected.len() != found.len() {
        return Err(SchemaError::ColumnCount {
            expected: expected.len(),
            found: found.len(),
        });
    }
    match expected.iter().zip(found).position(|(e, f)| e != f) {
        Some(position) => Err(SchemaError::ColumnMismatch {
            position,
            expected: expected[position].clone(),
            found: found[position].clone(),
        }),
        None => Ok(()),
    }
}

/// Feature Vector for ML models
///
/// Values travel with their column names so that order can be checked at every
/// hand-off instead of trusting the length alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub features: Vec<f64>,
    pub feature_names: Vec<String>,
}

impl FeatureVector {
    pub fn new(features: Vec<f64>, feature_names: Vec<String>) -> Result<Self, SchemaError> {
        if features.len() != feature_names.len() {
            return Err(SchemaError::Invalid(format!(
                "Feature count mismatch: {} features, {} names",
                features.len(),
                feature_names.len()
            )));
        }
        Ok(Self {
            features,
            feature_names,
        })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Standardize features using z-score normalization
    pub fn standardize(&self, means: &[f64], stds: &[f64]) -> Result<Self, SchemaError> {
        if means.len() != self.features.len() || stds.len() != self.features.len() {
            return Err(SchemaError::ColumnCount {
                expected: means.len().min(stds.len()),
                found: self.features.len(),
            });
        }

        let standardized = self
            .features
            .iter()
            .zip(means.iter().zip(stds.iter()))
            .map(|(f, (mean, std))| (f - mean) / std)
            .collect();

        Ok(Self {
            features: standardized,
            feature_names: self.feature_names.clone(),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use super::gbdt::{OutputTransform, RegressionTree};
    use super::*;
    use crate::features::{feature_names, FEATURE_COUNT};

    /// Six stumps on standardized latitude: south of 43.7 favours the last
    /// category, north of it the first.
    pub fn latitude_classifier() -> GradientBoostedClassifier {
        let trees = (0..6)
            .map(|c| RegressionTree::stump(0, 0.0, c as f64, -(c as f64)))
            .collect();
        GradientBoostedClassifier::new(feature_names(), 6, OutputTransform::Softmax, trees)
            .unwrap()
    }

    pub fn sample_artifacts() -> LoadedArtifacts {
        let mut mean = vec![0.0; FEATURE_COUNT];
        mean[0] = 43.7;
        let scaler =
            NormalizationParameters::new(feature_names(), mean, vec![1.0; FEATURE_COUNT]).unwrap();
        LoadedArtifacts::new(latitude_classifier(), scaler).unwrap()
    }

    pub fn loaded_context() -> Arc<ModelContext> {
        Arc::new(ModelContext::from_loaded(
            ArtifactPaths::new("model.bin", "scaler.json"),
            sample_artifacts(),
        ))
    }
}
