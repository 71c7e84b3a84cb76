use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Geographic coordinate in WGS84 degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Latitude/longitude rectangle that defines the service area.
///
/// Both ranges are inclusive. The default is the approximate Toronto box the
/// model was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    pub const TORONTO: BoundingBox = BoundingBox {
        lat_min: 43.5810,
        lat_max: 43.8554,
        lon_min: -79.639,
        lon_max: -79.115,
    };

    pub fn contains_latitude(&self, latitude: f64) -> bool {
        self.lat_min <= latitude && latitude <= self.lat_max
    }

    pub fn contains_longitude(&self, longitude: f64) -> bool {
        self.lon_min <= longitude && longitude <= self.lon_max
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        self.contains_latitude(point.latitude) && self.contains_longitude(point.longitude)
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.lat_min + self.lat_max) / 2.0,
            (self.lon_min + self.lon_max) / 2.0,
        )
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::TORONTO
    }
}

/// A single query as supplied by the caller: where, and which calendar hour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub latitude: f64,
    pub longitude: f64,
    pub year: i32,
    /// 1-12
    pub month: u32,
    /// 1-31
    pub day: u32,
    /// 0-23
    pub hour: u32,
}

impl RawObservation {
    pub fn new(latitude: f64, longitude: f64, year: i32, month: u32, day: u32, hour: u32) -> Self {
        Self {
            latitude,
            longitude,
            year,
            month,
            day,
            hour,
        }
    }

    /// Split a wall-clock timestamp into the calendar fields the model uses.
    /// Minutes and seconds are discarded.
    pub fn from_datetime(point: GeoPoint, at: NaiveDateTime) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
            year: at.year(),
            month: at.month(),
            day: at.day(),
            hour: at.hour(),
        }
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}
