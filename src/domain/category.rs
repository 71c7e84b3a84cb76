use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

/// Crime categories emitted by the trained classifier.
///
/// Declaration order is the column order of the model's probability output and
/// must not be rearranged without retraining.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
    IntoStaticStr,
)]
pub enum CrimeCategory {
    #[serde(rename = "AUTO THEFT")]
    #[strum(serialize = "AUTO THEFT")]
    AutoTheft,
    #[serde(rename = "ASSAULT")]
    #[strum(serialize = "ASSAULT")]
    Assault,
    #[serde(rename = "ROBBERY")]
    #[strum(serialize = "ROBBERY")]
    Robbery,
    #[serde(rename = "THEFT OVER")]
    #[strum(serialize = "THEFT OVER")]
    TheftOver,
    #[serde(rename = "BREAK AND ENTER")]
    #[strum(serialize = "BREAK AND ENTER")]
    BreakAndEnter,
    #[serde(rename = "HOMICIDE")]
    #[strum(serialize = "HOMICIDE")]
    Homicide,
}

impl CrimeCategory {
    /// All categories in model output order
    pub const ALL: [CrimeCategory; CrimeCategory::COUNT] = [
        CrimeCategory::AutoTheft,
        CrimeCategory::Assault,
        CrimeCategory::Robbery,
        CrimeCategory::TheftOver,
        CrimeCategory::BreakAndEnter,
        CrimeCategory::Homicide,
    ];

    pub fn label(self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_label_order_matches_model_output() {
        let labels: Vec<&str> = CrimeCategory::iter().map(CrimeCategory::label).collect();
        assert_eq!(
            labels,
            vec![
                "AUTO THEFT",
                "ASSAULT",
                "ROBBERY",
                "THEFT OVER",
                "BREAK AND ENTER",
                "HOMICIDE"
            ]
        );
        assert_eq!(CrimeCategory::ALL.to_vec(), CrimeCategory::iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_category_round_trips_through_label() {
        assert_eq!(
            CrimeCategory::from_str("BREAK AND ENTER").unwrap(),
            CrimeCategory::BreakAndEnter
        );
        assert_eq!(CrimeCategory::TheftOver.to_string(), "THEFT OVER");

        let json = serde_json::to_string(&CrimeCategory::AutoTheft).unwrap();
        assert_eq!(json, "\"AUTO THEFT\"");
    }
}
