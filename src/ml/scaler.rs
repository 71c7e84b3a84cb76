//! Fitted feature standardization (StandardScaler state)

use serde::{Deserialize, Serialize};

use super::{check_columns, FeatureVector, SchemaError};

/// Per-feature mean and scale fitted on the training set.
///
/// Field aliases accept the attribute names a scikit-learn `StandardScaler`
/// exports (`feature_names_in_`, `mean_`, `scale_`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationParameters {
    #[serde(alias = "feature_names_in_")]
    pub feature_names_in: Vec<String>,
    #[serde(alias = "mean_")]
    pub mean: Vec<f64>,
    #[serde(alias = "scale_")]
    pub scale: Vec<f64>,
}

impl NormalizationParameters {
    pub fn new(
        feature_names_in: Vec<String>,
        mean: Vec<f64>,
        scale: Vec<f64>,
    ) -> Result<Self, SchemaError> {
        let params = Self {
            feature_names_in,
            mean,
            scale,
        };
        params.validate()?;
        Ok(params)
    }

    /// Zero mean, unit scale. Leaves values untouched.
    pub fn identity(feature_names_in: Vec<String>) -> Self {
        let n = feature_names_in.len();
        Self {
            feature_names_in,
            mean: vec![0.0; n],
            scale: vec![1.0; n],
        }
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names_in
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        let n = self.feature_names_in.len();
        if self.mean.len() != n || self.scale.len() != n {
            return Err(SchemaError::Invalid(format!(
                "scaler has {} names, {} means and {} scales",
                n,
                self.mean.len(),
                self.scale.len()
            )));
        }
        if let Some(i) = self.mean.iter().position(|m| !m.is_finite()) {
            return Err(SchemaError::Invalid(format!(
                "mean of `{}` is not finite",
                self.feature_names_in[i]
            )));
        }
        if let Some(i) = self
            .scale
            .iter()
            .position(|s| !s.is_finite() || *s == 0.0)
        {
            return Err(SchemaError::Invalid(format!(
                "scale of `{}` must be finite and non-zero, got {}",
                self.feature_names_in[i], self.scale[i]
            )));
        }
        Ok(())
    }

    /// Standardize `vector`, which must carry exactly the fitted columns.
    pub fn transform(&self, vector: &FeatureVector) -> Result<FeatureVector, SchemaError> {
        check_columns(&self.feature_names_in, &vector.feature_names)?;
        vector.standardize(&self.mean, &self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["x".to_string(), "y".to_string()]
    }

    #[test]
    fn test_transform() {
        let params = NormalizationParameters::new(names(), vec![1.0, -2.0], vec![2.0, 0.5]).unwrap();
        let v = FeatureVector::new(vec![5.0, -1.0], names()).unwrap();

        let out = params.transform(&v).unwrap();
        assert_eq!(out.features, vec![2.0, 2.0]);
    }

    #[test]
    fn test_rejects_zero_and_non_finite_scale() {
        assert!(NormalizationParameters::new(names(), vec![0.0, 0.0], vec![1.0, 0.0]).is_err());
        assert!(NormalizationParameters::new(names(), vec![0.0, 0.0], vec![f64::NAN, 1.0]).is_err());
        assert!(NormalizationParameters::new(names(), vec![f64::INFINITY, 0.0], vec![1.0, 1.0]).is_err());
        assert!(NormalizationParameters::new(names(), vec![0.0], vec![1.0, 1.0]).is_err());
    }

    #[test]
    fn test_rejects_reordered_columns() {
        let params = NormalizationParameters::identity(names());
        let v = FeatureVector::new(vec![1.0, 2.0], vec!["y".to_string(), "x".to_string()]).unwrap();
        assert!(matches!(
            params.transform(&v),
            Err(SchemaError::ColumnMismatch { position: 0, .. })
        ));
    }

    #[test]
    fn test_deserializes_sklearn_attribute_names() {
        let json = r#"{"feature_names_in_": ["x", "y"], "mean_": [1.0, 2.0], "scale_": [3.0, 4.0]}"#;
        let params: NormalizationParameters = serde_json::from_str(json).unwrap();
        assert_eq!(params.feature_names(), names().as_slice());
        assert_eq!(params.scale, vec![3.0, 4.0]);
    }
}
