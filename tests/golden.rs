//! Golden-file tests against the fixture artifacts in `tests/fixtures/`.
//!
//! The fixture scaler and tree dump are small hand-built artifacts, not the
//! production model. `expected.json` holds probabilities computed
//! independently from that dump and scaler. Any drift in feature
//! construction, column order or tree evaluation shows up here.

use std::path::PathBuf;

use precog_matrix::domain::{CrimeCategory, RawObservation};
use precog_matrix::features::{build_features, feature_names, FeatureBuilder, FeatureError};
use precog_matrix::ml::artifacts::{load_classifier, load_normalization, save_bincode};
use precog_matrix::ml::{predict, ArtifactPaths, LoadedArtifacts, ModelContext};
use serde::Deserialize;

const TOLERANCE: f64 = 1e-12;

#[derive(Debug, Deserialize)]
struct GoldenCase {
    lat: f64,
    lon: f64,
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    probabilities: Vec<f64>,
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn fixture_paths() -> ArtifactPaths {
    ArtifactPaths::new(fixture("model.json"), fixture("scaler.json"))
}

fn golden_cases() -> Vec<GoldenCase> {
    let raw = std::fs::read(fixture("expected.json")).unwrap();
    serde_json::from_slice(&raw).unwrap()
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() < TOLERANCE,
            "class {i}: got {a}, expected {e}"
        );
    }
}

#[test]
fn test_fixture_artifacts_match_feature_schema() {
    let artifacts = LoadedArtifacts::load(&fixture_paths()).unwrap();
    assert_eq!(artifacts.normalization.feature_names(), feature_names().as_slice());
    assert_eq!(artifacts.classifier.feature_names(), feature_names().as_slice());
    assert_eq!(artifacts.classifier.num_class(), 6);
    assert_eq!(artifacts.classifier.tree_count(), 12);
}

#[test]
fn test_golden_probabilities() {
    let artifacts = LoadedArtifacts::load(&fixture_paths()).unwrap();

    for case in golden_cases() {
        let vector = build_features(
            case.lat,
            case.lon,
            case.year,
            case.month,
            case.day,
            case.hour,
            &artifacts.normalization,
        )
        .unwrap();
        let result = predict(&[vector], Some(&artifacts.classifier)).unwrap();

        assert_close(&result.probability_matrix()[0], &case.probabilities);
    }
}

#[test]
fn test_cn_tower_most_likely_category() {
    let artifacts = LoadedArtifacts::load(&fixture_paths()).unwrap();
    let vector =
        build_features(43.6426, -79.3871, 2024, 6, 9, 14, &artifacts.normalization).unwrap();
    let result = predict(&[vector], Some(&artifacts.classifier)).unwrap();

    assert_eq!(result.most_likely()[0].label, CrimeCategory::Assault);
}

#[test]
fn test_batch_keeps_row_order() {
    let artifacts = LoadedArtifacts::load(&fixture_paths()).unwrap();
    let cases = golden_cases();
    let batch: Vec<_> = cases
        .iter()
        .map(|c| {
            build_features(c.lat, c.lon, c.year, c.month, c.day, c.hour, &artifacts.normalization)
                .unwrap()
        })
        .collect();

    let result = predict(&batch, Some(&artifacts.classifier)).unwrap();
    assert_eq!(result.len(), cases.len());
    for (row, case) in result.probability_matrix().iter().zip(&cases) {
        assert_close(row, &case.probabilities);
    }
}

#[test]
fn test_rejections_happen_before_prediction() {
    let normalization = load_normalization(&fixture("scaler.json")).unwrap();

    let err = build_features(10.0, 10.0, 2024, 6, 9, 14, &normalization).unwrap_err();
    assert!(matches!(err, FeatureError::OutOfBounds { .. }));

    let err = build_features(43.6426, -79.3871, 2023, 2, 30, 14, &normalization).unwrap_err();
    assert!(matches!(err, FeatureError::InvalidCalendar { .. }));
}

#[test]
fn test_compiled_artifacts_predict_identically() {
    let dir = tempfile::tempdir().unwrap();

    let classifier = load_classifier(&fixture("model.json")).unwrap();
    let normalization = load_normalization(&fixture("scaler.json")).unwrap();
    save_bincode(&classifier, &dir.path().join("model.bin")).unwrap();
    save_bincode(&normalization, &dir.path().join("scaler.bin")).unwrap();

    let compiled =
        LoadedArtifacts::load(&ArtifactPaths::in_dir(dir.path(), "model.bin", "scaler.bin")).unwrap();

    for case in golden_cases() {
        let vector = build_features(
            case.lat,
            case.lon,
            case.year,
            case.month,
            case.day,
            case.hour,
            &compiled.normalization,
        )
        .unwrap();
        let result = predict(&[vector], Some(&compiled.classifier)).unwrap();
        assert_close(&result.probability_matrix()[0], &case.probabilities);
    }
}

#[tokio::test]
async fn test_engine_matches_golden_file() {
    let context = std::sync::Arc::new(ModelContext::new(fixture_paths()));
    let engine = precog_matrix::ml::InferenceEngine::new(FeatureBuilder::default(), context.clone());

    for case in golden_cases() {
        let obs = RawObservation::new(case.lat, case.lon, case.year, case.month, case.day, case.hour);
        let prediction = engine.predict_observation(&obs).await.unwrap();
        let probabilities: Vec<f64> = prediction.probabilities.iter().map(|p| p.probability).collect();
        assert_close(&probabilities, &case.probabilities);
    }
    assert_eq!(context.load_count(), 1);
}
