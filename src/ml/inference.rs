//! ML Model Inference Engine
//!
//! [`predict`] runs a prepared batch through a classifier and pairs each row's
//! probabilities with the fixed category order. [`InferenceEngine`] is the
//! per-request entry point used by the HTTP layer: raw observation in,
//! labelled probabilities out.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::EnumCount;
use thiserror::Error;

use super::artifacts::{ArtifactError, ModelContext};
use super::gbdt::GradientBoostedClassifier;
use super::{check_columns, FeatureVector, SchemaError};
use crate::domain::{CrimeCategory, RawObservation};
use crate::features::{FeatureBuilder, FeatureError, FeatureRow};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("classifier is not loaded")]
    ModelNotLoaded,

    #[error("prediction batch is empty")]
    EmptyInput,

    #[error("input does not match the classifier schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Anything that turns a feature row into per-class probabilities.
pub trait Classifier: Send + Sync {
    fn feature_names(&self) -> &[String];

    fn class_count(&self) -> usize;

    fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, PredictionError>;
}

impl Classifier for GradientBoostedClassifier {
    fn feature_names(&self) -> &[String] {
        GradientBoostedClassifier::feature_names(self)
    }

    fn class_count(&self) -> usize {
        self.num_class()
    }

    fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, PredictionError> {
        Ok(GradientBoostedClassifier::predict_proba(self, row)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelledProbability {
    pub label: CrimeCategory,
    pub probability: f64,
}

/// Per input row, the six categories in trained order with their probability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub rows: Vec<Vec<LabelledProbability>>,
}

impl PredictionResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `[[p1..p6], ...]`, the shape the legacy endpoint returns.
    pub fn probability_matrix(&self) -> Vec<Vec<f64>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|p| p.probability).collect())
            .collect()
    }

    pub fn most_likely(&self) -> Vec<LabelledProbability> {
        self.rows
            .iter()
            .filter_map(|row| {
                row.iter()
                    .copied()
                    .max_by(|a, b| a.probability.total_cmp(&b.probability))
            })
            .collect()
    }
}

/// Run `batch` through `classifier`.
///
/// Column identity is checked for every row before any inference happens.
/// Probabilities are returned as the classifier produced them.
pub fn predict(
    batch: &[FeatureVector],
    classifier: Option<&dyn Classifier>,
) -> Result<PredictionResult, PredictionError> {
    let classifier = classifier.ok_or(PredictionError::ModelNotLoaded)?;
    if batch.is_empty() {
        return Err(PredictionError::EmptyInput);
    }
    if classifier.class_count() != CrimeCategory::COUNT {
        return Err(SchemaError::ClassCount {
            expected: CrimeCategory::COUNT,
            found: classifier.class_count(),
        }
        .into());
    }
    for row in batch {
        check_columns(classifier.feature_names(), &row.feature_names)?;
    }

    let rows = batch
        .iter()
        .map(|row| {
            let proba = classifier.predict_proba(&row.features)?;
            if proba.len() != CrimeCategory::COUNT {
                return Err(PredictionError::Inference(format!(
                    "classifier returned {} probabilities for {} classes",
                    proba.len(),
                    CrimeCategory::COUNT
                )));
            }
            Ok(CrimeCategory::ALL
                .iter()
                .zip(proba)
                .map(|(&label, probability)| LabelledProbability { label, probability })
                .collect())
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PredictionResult { rows })
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

#[derive(Debug, Clone, Serialize)]
pub struct ObservationPrediction {
    pub features: FeatureRow,
    pub probabilities: Vec<LabelledProbability>,
}

/// Feature building plus prediction against the shared artifacts.
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    builder: FeatureBuilder,
    context: Arc<ModelContext>,
}

impl InferenceEngine {
    pub fn new(builder: FeatureBuilder, context: Arc<ModelContext>) -> Self {
        Self { builder, context }
    }

    pub fn builder(&self) -> &FeatureBuilder {
        &self.builder
    }

    pub fn context(&self) -> &Arc<ModelContext> {
        &self.context
    }

    /// Inputs are validated before the artifacts are touched, so a bad request
    /// never triggers a load.
    pub async fn predict_observation(
        &self,
        obs: &RawObservation,
    ) -> Result<ObservationPrediction, InferenceError> {
        let features = self.builder.derive(obs)?;
        let artifacts = self.context.artifacts().await?;

        let vector = artifacts
            .normalization
            .transform(&features.to_vector())
            .map_err(FeatureError::from)?;
        let mut result = predict(&[vector], Some(&artifacts.classifier))?;

        let probabilities = result.rows.pop().ok_or(PredictionError::EmptyInput)?;
        Ok(ObservationPrediction {
            features,
            probabilities,
        })
    }
}
