//! Sine/cosine encoding of periodic calendar fields

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use strum::{Display, EnumIter};

/// Periodic fields and the period each one was encoded with during training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum CyclicField {
    Hour,
    DayOfMonth,
    Month,
    DayOfWeek,
    DayOfYear,
}

impl CyclicField {
    /// Day-of-month is always divided by 31 and day-of-year by 365, regardless
    /// of the actual month or year length.
    pub fn period(self) -> f64 {
        match self {
            CyclicField::Hour => 24.0,
            CyclicField::DayOfMonth => 31.0,
            CyclicField::Month => 12.0,
            CyclicField::DayOfWeek => 7.0,
            CyclicField::DayOfYear => 365.0,
        }
    }

    pub fn encode(self, value: u32) -> CyclicPair {
        CyclicPair::encode(value as f64, self.period())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CyclicPair {
    pub sin: f64,
    pub cos: f64,
}

impl CyclicPair {
    pub fn encode(value: f64, period: f64) -> Self {
        let angle = 2.0 * PI * value / period;
        Self {
            sin: angle.sin(),
            cos: angle.cos(),
        }
    }

    /// Recover the encoded value, reduced into `[0, period)`.
    pub fn decode(&self, period: f64) -> f64 {
        let angle = self.sin.atan2(self.cos);
        let value = (angle * period / (2.0 * PI)).rem_euclid(period);
        // rem_euclid can round up to exactly `period` for tiny negative inputs
        if value >= period {
            0.0
        } else {
            value
        }
    }
}
