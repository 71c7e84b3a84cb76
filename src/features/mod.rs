//! Feature engineering for the crime classifier
//!
//! Turns a raw `(latitude, longitude, year, month, day, hour)` observation into
//! the 13-column vector the model was trained on:
//! - latitude, longitude and year pass through untransformed
//! - month, hour, day of month, day of year and day of week are replaced by
//!   their sine/cosine pairs
//! - the assembled row is standardized with the fitted [`NormalizationParameters`]
//!
//! Every step here must match the training pipeline exactly; a divergence does
//! not fail, it silently produces wrong probabilities.

pub mod calendar;
pub mod columns;
pub mod cyclic;

use serde::Serialize;
use strum::Display;
use thiserror::Error;

use crate::domain::{BoundingBox, RawObservation};
use crate::ml::{FeatureVector, NormalizationParameters, SchemaError};

pub use calendar::CalendarFields;
pub use columns::{feature_names, FeatureColumn, FEATURE_COUNT};
pub use cyclic::{CyclicField, CyclicPair};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Axis {
    #[strum(serialize = "Latitude")]
    Latitude,
    #[strum(serialize = "Longitude")]
    Longitude,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    #[error("{axis} {value} is out of bounds for Toronto (expected {min} to {max})")]
    OutOfBounds {
        axis: Axis,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{year:04}-{month:02}-{day:02} hour {hour} is not a valid calendar date and hour")]
    InvalidCalendar {
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
    },

    #[error("feature schema mismatch: {0}")]
    Schema(#[from] SchemaError),
}

/// Un-normalized model input for one observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureRow {
    pub latitude: f64,
    pub longitude: f64,
    pub year: f64,
    pub month: CyclicPair,
    pub hour: CyclicPair,
    pub day_of_month: CyclicPair,
    pub day_of_year: CyclicPair,
    pub day_of_week: CyclicPair,
    /// Kept for diagnostics only; not part of the model input
    pub calendar: CalendarFields,
}

impl FeatureRow {
    /// Values in [`FeatureColumn::ORDER`]
    pub fn values(&self) -> [f64; FEATURE_COUNT] {
        [
            self.latitude,
            self.longitude,
            self.year,
            self.month.sin,
            self.month.cos,
            self.hour.sin,
            self.hour.cos,
            self.day_of_month.sin,
            self.day_of_month.cos,
            self.day_of_year.sin,
            self.day_of_year.cos,
            self.day_of_week.sin,
            self.day_of_week.cos,
        ]
    }

    pub fn value(&self, column: FeatureColumn) -> f64 {
        match column {
            FeatureColumn::Lat => self.latitude,
            FeatureColumn::Long => self.longitude,
            FeatureColumn::Year => self.year,
            FeatureColumn::MonthSin => self.month.sin,
            FeatureColumn::MonthCos => self.month.cos,
            FeatureColumn::HourSin => self.hour.sin,
            FeatureColumn::HourCos => self.hour.cos,
            FeatureColumn::DaySin => self.day_of_month.sin,
            FeatureColumn::DayCos => self.day_of_month.cos,
            FeatureColumn::DoySin => self.day_of_year.sin,
            FeatureColumn::DoyCos => self.day_of_year.cos,
            FeatureColumn::DowSin => self.day_of_week.sin,
            FeatureColumn::DowCos => self.day_of_week.cos,
        }
    }

    pub fn to_vector(&self) -> FeatureVector {
        FeatureVector {
            features: self.values().to_vec(),
            feature_names: feature_names(),
        }
    }
}

/// Builds model input rows for a fixed service area.
#[derive(Debug, Clone, Copy)]
pub struct FeatureBuilder {
    bounds: BoundingBox,
}

impl FeatureBuilder {
    pub fn new(bounds: BoundingBox) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Reject coordinates outside the service area. Never clamps.
    pub fn check_bounds(&self, latitude: f64, longitude: f64) -> Result<(), FeatureError> {
        let b = &self.bounds;
        if !b.contains_latitude(latitude) {
            return Err(FeatureError::OutOfBounds {
                axis: Axis::Latitude,
                value: latitude,
                min: b.lat_min,
                max: b.lat_max,
            });
        }
        if !b.contains_longitude(longitude) {
            return Err(FeatureError::OutOfBounds {
                axis: Axis::Longitude,
                value: longitude,
                min: b.lon_min,
                max: b.lon_max,
            });
        }
        Ok(())
    }

    /// Validate the observation and compute its cyclic features.
    pub fn derive(&self, obs: &RawObservation) -> Result<FeatureRow, FeatureError> {
        self.check_bounds(obs.latitude, obs.longitude)?;

        let date = calendar::resolve_date(obs.year, obs.month, obs.day)
            .filter(|_| obs.hour <= 23)
            .ok_or(FeatureError::InvalidCalendar {
                year: obs.year,
                month: obs.month,
                day: obs.day,
                hour: obs.hour,
            })?;
        let calendar = CalendarFields::from_date(date);

        Ok(FeatureRow {
            latitude: obs.latitude,
            longitude: obs.longitude,
            year: obs.year as f64,
            month: CyclicField::Month.encode(obs.month),
            hour: CyclicField::Hour.encode(obs.hour),
            day_of_month: CyclicField::DayOfMonth.encode(obs.day),
            day_of_year: CyclicField::DayOfYear.encode(calendar.day_of_year),
            day_of_week: CyclicField::DayOfWeek.encode(calendar.day_of_week),
            calendar,
        })
    }

    /// Derive the row and standardize it with the fitted parameters.
    pub fn build(
        &self,
        obs: &RawObservation,
        params: &NormalizationParameters,
    ) -> Result<FeatureVector, FeatureError> {
        let row = self.derive(obs)?;
        Ok(params.transform(&row.to_vector())?)
    }
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self::new(BoundingBox::TORONTO)
    }
}

/// Build the normalized feature vector for one query inside the Toronto box.
pub fn build_features(
    lat: f64,
    lon: f64,
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    params: &NormalizationParameters,
) -> Result<FeatureVector, FeatureError> {
    FeatureBuilder::default().build(&RawObservation::new(lat, lon, year, month, day, hour), params)
}
