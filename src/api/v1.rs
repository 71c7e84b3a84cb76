use std::time::Instant;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::{
        error::ApiError,
        predict::{run_prediction, PredictQuery},
        response::ApiResponse,
    },
    domain::{CrimeCategory, GeoPoint},
    features::CalendarFields,
    ml::inference::LabelledProbability,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/predictions", get(get_prediction))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub location: GeoPoint,
    /// Local wall-clock time the prediction was made for
    pub timestamp: NaiveDateTime,
    pub calendar: CalendarFields,
    pub probabilities: Vec<LabelledProbability>,
    pub most_likely: Option<CrimeCategory>,
}

/// GET /api/v1/predictions
pub async fn get_prediction(
    State(state): State<AppState>,
    query: Result<Query<PredictQuery>, QueryRejection>,
) -> Result<ApiResponse<PredictionResponse>, ApiError> {
    let started = Instant::now();
    let Query(q) = query?;
    let (location, timestamp, prediction) = run_prediction(&state, &q).await?;

    let most_likely = prediction
        .probabilities
        .iter()
        .max_by(|a, b| a.probability.total_cmp(&b.probability))
        .map(|p| p.label);

    let response = PredictionResponse {
        location,
        timestamp,
        calendar: prediction.features.calendar,
        probabilities: prediction.probabilities,
        most_likely,
    };

    Ok(ApiResponse::success(response)
        .with_request_id(Uuid::new_v4())
        .with_duration(started.elapsed().as_micros() as u64))
}
