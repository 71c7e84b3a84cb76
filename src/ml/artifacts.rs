//! Artifact loading
//!
//! The classifier and the normalization parameters are produced offline and
//! read once per process. [`ModelContext`] memoizes the load: concurrent first
//! callers wait on a single in-flight load and everyone after that shares the
//! same `Arc`. A failed load leaves the context empty so a later call retries.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use strum::EnumCount;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{error, info};

use super::gbdt::{GradientBoostedClassifier, LightGbmDump};
use super::{check_columns, NormalizationParameters, SchemaError};
use crate::domain::CrimeCategory;
use crate::features::feature_names;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact {} is not valid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("artifact {} is not valid bincode: {source}", path.display())]
    Bincode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("unsupported artifact format: {} (expected .json or .bin)", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("artifact {} does not match the feature schema: {source}", path.display())]
    Schema {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },

    #[error("artifact loading task failed: {0}")]
    Join(String),
}

/// On-disk encoding, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Json,
    Bincode,
}

impl ArtifactFormat {
    pub fn from_path(path: &Path) -> Result<Self, ArtifactError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(ArtifactFormat::Json),
            Some(ext) if ext.eq_ignore_ascii_case("bin") => Ok(ArtifactFormat::Bincode),
            _ => Err(ArtifactError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

fn read(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn decode_bincode<T: DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T, ArtifactError> {
    bincode::deserialize(bytes).map_err(|source| ArtifactError::Bincode {
        path: path.to_path_buf(),
        source,
    })
}

fn decode_json<T: DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T, ArtifactError> {
    serde_json::from_slice(bytes).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn schema_error(path: &Path) -> impl FnOnce(SchemaError) -> ArtifactError + '_ {
    move |source| ArtifactError::Schema {
        path: path.to_path_buf(),
        source,
    }
}

/// Load a classifier from a LightGBM JSON dump or a compiled `.bin` artifact.
pub fn load_classifier(path: &Path) -> Result<GradientBoostedClassifier, ArtifactError> {
    let format = ArtifactFormat::from_path(path)?;
    let bytes = read(path)?;
    match format {
        ArtifactFormat::Json => {
            let dump: LightGbmDump = decode_json(path, &bytes)?;
            GradientBoostedClassifier::from_lightgbm_dump(dump).map_err(schema_error(path))
        }
        ArtifactFormat::Bincode => {
            let model: GradientBoostedClassifier = decode_bincode(path, &bytes)?;
            model.validate().map_err(schema_error(path))?;
            Ok(model)
        }
    }
}

pub fn load_normalization(path: &Path) -> Result<NormalizationParameters, ArtifactError> {
    let format = ArtifactFormat::from_path(path)?;
    let bytes = read(path)?;
    let params: NormalizationParameters = match format {
        ArtifactFormat::Json => decode_json(path, &bytes)?,
        ArtifactFormat::Bincode => decode_bincode(path, &bytes)?,
    };
    params.validate().map_err(schema_error(path))?;
    Ok(params)
}

/// Write any artifact in the compiled bincode form.
pub fn save_bincode<T: Serialize>(value: &T, path: &Path) -> Result<(), ArtifactError> {
    let bytes = bincode::serialize(value).map_err(|source| ArtifactError::Bincode {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, bytes).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: PathBuf,
}

impl ArtifactPaths {
    pub fn new(model: impl Into<PathBuf>, scaler: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            scaler: scaler.into(),
        }
    }

    pub fn in_dir(dir: impl AsRef<Path>, model_file: &str, scaler_file: &str) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(model_file), dir.join(scaler_file))
    }
}

/// The classifier and its fitted normalization, checked against each other and
/// against the feature schema.
#[derive(Debug)]
pub struct LoadedArtifacts {
    pub classifier: GradientBoostedClassifier,
    pub normalization: NormalizationParameters,
    pub loaded_at: DateTime<Utc>,
}

impl LoadedArtifacts {
    pub fn new(
        classifier: GradientBoostedClassifier,
        normalization: NormalizationParameters,
    ) -> Result<Self, SchemaError> {
        check_normalization(&normalization)?;
        check_classifier(&classifier)?;
        Ok(Self {
            classifier,
            normalization,
            loaded_at: Utc::now(),
        })
    }

    /// Blocking; reads and validates both files.
    pub fn load(paths: &ArtifactPaths) -> Result<Self, ArtifactError> {
        let normalization = load_normalization(&paths.scaler)?;
        check_normalization(&normalization).map_err(schema_error(&paths.scaler))?;

        let classifier = load_classifier(&paths.model)?;
        check_classifier(&classifier).map_err(schema_error(&paths.model))?;

        Ok(Self {
            classifier,
            normalization,
            loaded_at: Utc::now(),
        })
    }
}

fn check_normalization(params: &NormalizationParameters) -> Result<(), SchemaError> {
    params.validate()?;
    check_columns(&feature_names(), params.feature_names())
}

fn check_classifier(classifier: &GradientBoostedClassifier) -> Result<(), SchemaError> {
    check_columns(&feature_names(), classifier.feature_names())?;
    if classifier.num_class() != CrimeCategory::COUNT {
        return Err(SchemaError::ClassCount {
            expected: CrimeCategory::COUNT,
            found: classifier.num_class(),
        });
    }
    Ok(())
}

/// Process-wide handle to the serving artifacts.
#[derive(Debug)]
pub struct ModelContext {
    paths: ArtifactPaths,
    cell: OnceCell<Arc<LoadedArtifacts>>,
    loads: AtomicUsize,
}

impl ModelContext {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            paths,
            cell: OnceCell::new(),
            loads: AtomicUsize::new(0),
        }
    }

    /// Context that is already populated; no file access happens.
    pub fn from_loaded(paths: ArtifactPaths, artifacts: LoadedArtifacts) -> Self {
        Self {
            paths,
            cell: OnceCell::new_with(Some(Arc::new(artifacts))),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// Load on first use; concurrent callers share one load.
    pub async fn artifacts(&self) -> Result<Arc<LoadedArtifacts>, ArtifactError> {
        self.cell
            .get_or_try_init(|| async {
                self.loads.fetch_add(1, Ordering::SeqCst);
                let paths = self.paths.clone();
                let loaded = tokio::task::spawn_blocking(move || LoadedArtifacts::load(&paths))
                    .await
                    .map_err(|e| ArtifactError::Join(e.to_string()))?;

                match loaded {
                    Ok(artifacts) => {
                        info!(
                            model = %self.paths.model.display(),
                            scaler = %self.paths.scaler.display(),
                            features = artifacts.normalization.feature_names().len(),
                            classes = artifacts.classifier.num_class(),
                            trees = artifacts.classifier.tree_count(),
                            "loaded model artifacts"
                        );
                        Ok(Arc::new(artifacts))
                    }
                    Err(e) => {
                        error!(error = %e, "failed to load model artifacts");
                        Err(e)
                    }
                }
            })
            .await
            .cloned()
    }

    pub async fn preload(&self) -> Result<(), ArtifactError> {
        self.artifacts().await.map(|_| ())
    }

    /// Artifacts if already loaded; never triggers a load.
    pub fn get(&self) -> Option<Arc<LoadedArtifacts>> {
        self.cell.get().cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Number of load attempts started so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}
