use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::FeatureError;
use crate::geocoder::GeocodeError;
use crate::ml::inference::InferenceError;

pub const INVALID_DATE_MESSAGE: &str =
    "Invalid date format. Please use ISO 8601 format (YYYY-MM-DDTHH:MM:SS).";

/// API error types that can be returned from handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid date format. Please use ISO 8601 format (YYYY-MM-DDTHH:MM:SS).")]
    InvalidDate,

    #[error("Location outside service area: {0}")]
    OutOfBounds(String),

    #[error("Could not geocode address: {0}")]
    GeocodeNotFound(String),

    #[error("Geocoding service error: {0}")]
    GeocoderUnavailable(String),

    #[error("Model error: {0}")]
    ModelError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Error response that gets serialized to JSON
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ApiError {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::InvalidDate | ApiError::OutOfBounds(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::GeocodeNotFound(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::GeocoderUnavailable(_) => StatusCode::BAD_GATEWAY,
            ApiError::ModelError(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error type string
    fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::InvalidDate => "InvalidDate",
            ApiError::OutOfBounds(_) => "OutOfBounds",
            ApiError::GeocodeNotFound(_) => "GeocodeNotFound",
            ApiError::GeocoderUnavailable(_) => "GeocoderUnavailable",
            ApiError::ModelError(_) => "ModelError",
            ApiError::InternalError(_) => "InternalServerError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_type = self.error_type();

        let message = match &self {
            ApiError::ModelError(_) | ApiError::InternalError(_) => {
                tracing::error!(error = %self, "prediction failed on the server side");
                "An internal error occurred".to_string()
            }
            ApiError::GeocoderUnavailable(_) => {
                tracing::warn!(error = %self, "geocoding service unavailable");
                "Could not resolve address right now".to_string()
            }
            ApiError::GeocodeNotFound(_) => "Could not geocode address".to_string(),
            ApiError::InvalidDate => INVALID_DATE_MESSAGE.to_string(),
            _ => {
                tracing::debug!(error = %self, "Client error");
                self.to_string()
            }
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<FeatureError> for ApiError {
    fn from(error: FeatureError) -> Self {
        match error {
            FeatureError::OutOfBounds { .. } => ApiError::OutOfBounds(error.to_string()),
            FeatureError::InvalidCalendar { .. } => ApiError::InvalidDate,
            FeatureError::Schema(_) => ApiError::ModelError(error.to_string()),
        }
    }
}

impl From<InferenceError> for ApiError {
    fn from(error: InferenceError) -> Self {
        match error {
            InferenceError::Feature(e) => e.into(),
            InferenceError::Artifact(e) => ApiError::ModelError(e.to_string()),
            InferenceError::Prediction(e) => ApiError::ModelError(e.to_string()),
        }
    }
}

impl From<GeocodeError> for ApiError {
    fn from(error: GeocodeError) -> Self {
        match error {
            GeocodeError::NotFound(address) => ApiError::GeocodeNotFound(address),
            other => ApiError::GeocoderUnavailable(other.to_string()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        ApiError::InternalError(error.to_string())
    }
}
