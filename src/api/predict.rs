use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    api::error::ApiError,
    domain::{GeoPoint, RawObservation},
    ml::inference::ObservationPrediction,
    state::AppState,
};

/// Query accepted by both prediction endpoints.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PredictQuery {
    pub address: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub crime_date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Greeting {
    pub greeting: String,
}

/// Legacy response: one row of six probabilities in category order
#[derive(Debug, Serialize, Deserialize)]
pub struct LegacyPrediction {
    pub prediction: Vec<Vec<f64>>,
}

const NAIVE_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse the wall-clock time of a request.
///
/// An explicit UTC offset is dropped rather than converted: the model was
/// trained on local occurrence times. A missing value means "now" in `tz`.
pub fn parse_crime_date(raw: Option<&str>, tz: Tz) -> Result<NaiveDateTime, ApiError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(Utc::now().with_timezone(&tz).naive_local()),
        Some(raw) => raw,
    };

    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.naive_local());
    }
    if let Some(at) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Ok(at);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or(ApiError::InvalidDate)
}

/// Coordinates win over an address when both are given.
pub async fn resolve_location(state: &AppState, q: &PredictQuery) -> Result<GeoPoint, ApiError> {
    match (q.lat, q.lon) {
        (Some(lat), Some(lon)) => return Ok(GeoPoint::new(lat, lon)),
        (Some(_), None) | (None, Some(_)) => {
            return Err(ApiError::BadRequest(
                "both lat and lon are required".to_string(),
            ))
        }
        (None, None) => {}
    }

    let address = q
        .address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| {
            ApiError::BadRequest("either address or both lat and lon are required".to_string())
        })?;

    let geocoder = state.geocoder.as_ref().ok_or_else(|| {
        ApiError::BadRequest("address lookup is disabled; pass lat and lon".to_string())
    })?;
    Ok(geocoder.geocode(address).await?)
}

pub async fn run_prediction(
    state: &AppState,
    q: &PredictQuery,
) -> Result<(GeoPoint, NaiveDateTime, ObservationPrediction), ApiError> {
    let at = parse_crime_date(q.crime_date.as_deref(), state.timezone)?;
    let location = resolve_location(state, q).await?;

    let obs = RawObservation::from_datetime(location, at);
    let prediction = state.engine.predict_observation(&obs).await?;

    if let Some(top) = prediction
        .probabilities
        .iter()
        .max_by(|a, b| a.probability.total_cmp(&b.probability))
    {
        info!(
            lat = location.latitude,
            lon = location.longitude,
            at = %at,
            most_likely = %top.label,
            probability = top.probability,
            "prediction served"
        );
    }
    Ok((location, at, prediction))
}

/// GET /
pub async fn greeting() -> Json<Greeting> {
    Json(Greeting {
        greeting: "PreCog Matrix".to_string(),
    })
}

/// GET /predict
pub async fn legacy_predict(
    State(state): State<AppState>,
    query: Result<Query<PredictQuery>, QueryRejection>,
) -> Result<Json<LegacyPrediction>, ApiError> {
    let Query(q) = query?;
    let (_, _, prediction) = run_prediction(&state, &q).await?;
    let row = prediction.probabilities.iter().map(|p| p.probability).collect();
    Ok(Json(LegacyPrediction {
        prediction: vec![row],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::geocoder::{GeocodeError, Geocoder, MockGeocoder};
    use crate::ml::testing::loaded_context;
    use chrono::{NaiveDate, Timelike};
    use rstest::rstest;
    use std::sync::Arc;

    fn state(geocoder: Option<Arc<dyn Geocoder>>) -> AppState {
        AppState::from_parts(Config::default(), loaded_context(), geocoder).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[rstest]
    #[case("2024-06-09T14:30:00", at(2024, 6, 9, 14, 30, 0))]
    #[case("2024-06-09T14:30:00.250", at(2024, 6, 9, 14, 30, 0) + chrono::Duration::milliseconds(250))]
    #[case("2024-06-09T14:30", at(2024, 6, 9, 14, 30, 0))]
    #[case("2024-06-09 14:30:05", at(2024, 6, 9, 14, 30, 5))]
    #[case("2024-06-09 14:30", at(2024, 6, 9, 14, 30, 0))]
    #[case("2024-06-09", at(2024, 6, 9, 0, 0, 0))]
    #[case(" 2024-06-09T14:30:00 ", at(2024, 6, 9, 14, 30, 0))]
    #[case("2024-06-09T14:30:00Z", at(2024, 6, 9, 14, 30, 0))]
    #[case("2024-06-09T23:30:00-04:00", at(2024, 6, 9, 23, 30, 0))]
    fn test_accepted_timestamps(#[case] raw: &str, #[case] expected: NaiveDateTime) {
        assert_eq!(parse_crime_date(Some(raw), chrono_tz::America::Toronto).unwrap(), expected);
    }

    #[rstest]
    #[case("yesterday")]
    #[case("09/06/2024 14:00")]
    #[case("2024-02-30T10:00:00")]
    #[case("2024-06-09T24:00:00")]
    #[case("2024-13-01")]
    fn test_rejected_timestamps(#[case] raw: &str) {
        assert!(matches!(
            parse_crime_date(Some(raw), chrono_tz::America::Toronto),
            Err(ApiError::InvalidDate)
        ));
    }

    #[test]
    fn test_missing_timestamp_is_now_in_zone() {
        let before = Utc::now().with_timezone(&chrono_tz::America::Toronto).naive_local();
        let parsed = parse_crime_date(None, chrono_tz::America::Toronto).unwrap();
        let empty = parse_crime_date(Some(""), chrono_tz::America::Toronto).unwrap();
        assert!(parsed >= before.with_nanosecond(0).unwrap());
        assert!((empty - parsed).num_seconds().abs() < 5);
    }

    #[tokio::test]
    async fn test_coordinates_take_precedence_over_address() {
        let mut geocoder = MockGeocoder::new();
        geocoder.expect_geocode().never();
        let state = state(Some(Arc::new(geocoder)));

        let q = PredictQuery {
            address: Some("CN Tower".to_string()),
            lat: Some(43.6426),
            lon: Some(-79.3871),
            ..Default::default()
        };
        assert_eq!(
            resolve_location(&state, &q).await.unwrap(),
            GeoPoint::new(43.6426, -79.3871)
        );
    }

    #[tokio::test]
    async fn test_address_is_geocoded() {
        let mut geocoder = MockGeocoder::new();
        geocoder
            .expect_geocode()
            .times(1)
            .returning(|_| Ok(GeoPoint::new(43.65, -79.38)));
        let state = state(Some(Arc::new(geocoder)));

        let q = PredictQuery {
            address: Some("  Union Station ".to_string()),
            crime_date: Some("2024-06-09T14:00:00".to_string()),
            ..Default::default()
        };
        let (location, at, prediction) = run_prediction(&state, &q).await.unwrap();
        assert_eq!(location, GeoPoint::new(43.65, -79.38));
        assert_eq!(at.hour(), 14);
        assert_eq!(prediction.probabilities.len(), 6);
    }

    #[rstest]
    #[case(PredictQuery::default())]
    #[case(PredictQuery { lat: Some(43.7), ..Default::default() })]
    #[case(PredictQuery { lon: Some(-79.4), ..Default::default() })]
    #[case(PredictQuery { address: Some("   ".to_string()), ..Default::default() })]
    #[tokio::test]
    async fn test_missing_location_is_bad_request(#[case] q: PredictQuery) {
        let state = state(None);
        assert!(matches!(
            resolve_location(&state, &q).await,
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_address_without_geocoder_is_bad_request() {
        let q = PredictQuery {
            address: Some("CN Tower".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            resolve_location(&state(None), &q).await,
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_address() {
        let mut geocoder = MockGeocoder::new();
        geocoder
            .expect_geocode()
            .returning(|a| Err(GeocodeError::NotFound(a.to_string())));
        let state = state(Some(Arc::new(geocoder)));

        let q = PredictQuery {
            address: Some("Atlantis".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            run_prediction(&state, &q).await,
            Err(ApiError::GeocodeNotFound(a)) if a == "Atlantis"
        ));
    }
}
