//! The ordered feature schema shared with the trained model

use strum::{Display, EnumCount, EnumIter, IntoStaticStr};

/// Model input columns, declared in the order the model was trained on.
///
/// The serialized names are the training data frame's column names and must
/// match the `feature_names` stored in both artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumCount, IntoStaticStr)]
pub enum FeatureColumn {
    #[strum(serialize = "LAT_WGS84")]
    Lat,
    #[strum(serialize = "LONG_WGS84")]
    Long,
    #[strum(serialize = "OCC_YEAR")]
    Year,
    #[strum(serialize = "MONTH_SIN")]
    MonthSin,
    #[strum(serialize = "MONTH_COS")]
    MonthCos,
    #[strum(serialize = "HOUR_SIN")]
    HourSin,
    #[strum(serialize = "HOUR_COS")]
    HourCos,
    #[strum(serialize = "OCC_DAY_SIN")]
    DaySin,
    #[strum(serialize = "OCC_DAY_COS")]
    DayCos,
    #[strum(serialize = "OCC_DOY_SIN")]
    DoySin,
    #[strum(serialize = "OCC_DOY_COS")]
    DoyCos,
    #[strum(serialize = "OCC_DOW_SIN")]
    DowSin,
    #[strum(serialize = "OCC_DOW_COS")]
    DowCos,
}

pub const FEATURE_COUNT: usize = FeatureColumn::COUNT;

impl FeatureColumn {
    pub const ORDER: [FeatureColumn; FEATURE_COUNT] = [
        FeatureColumn::Lat,
        FeatureColumn::Long,
        FeatureColumn::Year,
        FeatureColumn::MonthSin,
        FeatureColumn::MonthCos,
        FeatureColumn::HourSin,
        FeatureColumn::HourCos,
        FeatureColumn::DaySin,
        FeatureColumn::DayCos,
        FeatureColumn::DoySin,
        FeatureColumn::DoyCos,
        FeatureColumn::DowSin,
        FeatureColumn::DowCos,
    ];

    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Column names in model order, as owned strings for [`crate::ml::FeatureVector`].
pub fn feature_names() -> Vec<String> {
    FeatureColumn::ORDER
        .iter()
        .map(|c| c.name().to_string())
        .collect()
}
