//! PreCog Matrix
//!
//! Serves a pre-trained gradient-boosted classifier that estimates the relative
//! likelihood of six crime categories for a place and time in Toronto.
//!
//! - [`features`] turns `(lat, lon, timestamp)` into the model's 13 inputs
//! - [`ml`] loads the artifacts once and runs inference
//! - [`api`] exposes both over HTTP

pub mod api;
pub mod config;
pub mod domain;
pub mod features;
pub mod geocoder;
pub mod ml;
pub mod state;
pub mod telemetry;

pub use features::{build_features, FeatureBuilder, FeatureError};
pub use ml::{predict, InferenceEngine, ModelContext, PredictionError, PredictionResult};
