//! Numeric feature preprocessing over named columns.
//!
//! [`build_pipeline`] picks the Integer and Float columns of the training
//! features, then fits median imputation followed by standard scaling on
//! them. The fitted pipeline remembers the column names, so at transform
//! time it looks columns up by name rather than by position.

use crate::dataset::Dataset;
use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::imputation::SimpleImputer;
use crate::preprocessing::pipeline::{FittedPipeline, Pipeline, PipelineParams};
use crate::preprocessing::scaling::StandardScaler;
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use crate::serialization::{ArtifactError, ArtifactKind, ArtifactObject};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Median fill, then z-score scaling.
pub fn numeric_preprocessor() -> Pipeline {
    Pipeline::new()
        .add_simple_imputer(SimpleImputer::new())
        .add_standard_scaler(StandardScaler::new())
}

/// Fit the numeric preprocessor on the training features.
///
/// Boolean and categorical columns are dropped with a warning each.
///
/// # Errors
/// [`PreprocessingError::EmptyData`] if no column is numeric or there are
/// no rows.
pub fn build_pipeline(features: &Dataset) -> Result<FittedNumericPipeline, PreprocessingError> {
    let mut columns = Vec::new();
    for column in features.columns() {
        if column.kind().is_numeric() {
            columns.push(column.name().to_string());
        } else {
            warn!(
                column = column.name(),
                kind = %column.kind(),
                "dropping non-numeric feature column"
            );
        }
    }
    if columns.is_empty() {
        return Err(PreprocessingError::EmptyData(
            "no numeric feature columns to fit".to_string(),
        ));
    }

    let matrix = numeric_matrix(features, &columns)?;
    let pipeline = numeric_preprocessor().fit(&matrix)?;
    debug!(
        n_columns = columns.len(),
        steps = ?pipeline.step_names(),
        "numeric pipeline fitted"
    );
    Ok(FittedNumericPipeline { columns, pipeline })
}

/// Gather the named numeric columns into a row-major matrix, `NaN` for missing.
pub fn numeric_matrix(features: &Dataset, columns: &[String]) -> Result<Array2<f64>, PreprocessingError> {
    let slices = columns
        .iter()
        .map(|name| {
            let column = features
                .column(name)
                .ok_or_else(|| PreprocessingError::MissingColumn(name.clone()))?;
            column
                .as_f64()
                .ok_or_else(|| PreprocessingError::InvalidColumnKind {
                    column: name.clone(),
                    kind: column.kind(),
                })
        })
        .collect::<Result<Vec<&[f64]>, _>>()?;

    Ok(Array2::from_shape_fn(
        (features.n_rows(), slices.len()),
        |(row, col)| slices[col][row],
    ))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NumericPipelineParams {
    pub columns: Vec<String>,
    pub pipeline: PipelineParams,
}

/// Fitted numeric preprocessing bound to the training column names.
#[derive(Clone, Debug, PartialEq)]
pub struct FittedNumericPipeline {
    columns: Vec<String>,
    pipeline: FittedPipeline,
}

impl FittedNumericPipeline {
    /// Selected column names, in output order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn pipeline(&self) -> &FittedPipeline {
        &self.pipeline
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    /// Apply the frozen preprocessing to `features`.
    ///
    /// Extra columns are ignored.
    pub fn transform(&self, features: &Dataset) -> Result<Array2<f64>, PreprocessingError> {
        let matrix = numeric_matrix(features, &self.columns)?;
        self.pipeline.transform(&matrix)
    }

    pub fn extract_params(&self) -> NumericPipelineParams {
        NumericPipelineParams {
            columns: self.columns.clone(),
            pipeline: self.pipeline.extract_params(),
        }
    }

    pub fn from_params(params: NumericPipelineParams) -> Result<Self, PreprocessingError> {
        let pipeline = FittedPipeline::from_params(params.pipeline)?;
        if pipeline.n_features_in() != params.columns.len() {
            return Err(PreprocessingError::FeatureMismatch {
                expected_features: params.columns.len(),
                got_features: pipeline.n_features_in(),
            });
        }
        Ok(Self {
            columns: params.columns,
            pipeline,
        })
    }
}

impl ArtifactObject for FittedNumericPipeline {
    const KIND: ArtifactKind = ArtifactKind::Pipeline;
    type Payload = NumericPipelineParams;

    fn to_payload(&self) -> Self::Payload {
        self.extract_params()
    }

    fn from_payload(payload: Self::Payload) -> Result<Self, ArtifactError> {
        Self::from_params(payload).map_err(|e| ArtifactError::Corrupt(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;
    use approx::assert_relative_eq;

    fn train_features() -> Dataset {
        Dataset::new(vec![
            Column::float("x", vec![1.0, 2.0, f64::NAN, 4.0]),
            Column::categorical("protocol", [Some("tcp"), Some("udp"), Some("tcp"), None]),
            Column::integer("port", vec![Some(80), Some(443), Some(80), Some(22)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_selects_numeric_columns() {
        let fitted = build_pipeline(&train_features()).unwrap();
        assert_eq!(fitted.columns(), &["x", "port"]);
        assert_eq!(fitted.pipeline().step_names(), vec!["SimpleImputer", "StandardScaler"]);
    }

    #[test]
    fn test_median_then_standardize() {
        let features = train_features();
        let fitted = build_pipeline(&features).unwrap();
        let out = fitted.transform(&features).unwrap();

        let std = 1.1875f64.sqrt();
        for (row, x) in [1.0, 2.0, 2.0, 4.0].iter().enumerate() {
            assert_relative_eq!(out[[row, 0]], (x - 2.25) / std, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_test_split_uses_training_statistics() {
        let fitted = build_pipeline(&train_features()).unwrap();
        let test = Dataset::new(vec![
            Column::integer("port", vec![Some(1000), None]),
            Column::float("x", vec![f64::NAN, 1000.0]),
        ])
        .unwrap();

        let out = fitted.transform(&test).unwrap();
        let std = 1.1875f64.sqrt();
        assert_relative_eq!(out[[0, 0]], (2.0 - 2.25) / std, epsilon = 1e-12);
        assert_relative_eq!(out[[1, 0]], (1000.0 - 2.25) / std, epsilon = 1e-9);
    }

    #[test]
    fn test_missing_column_at_transform() {
        let fitted = build_pipeline(&train_features()).unwrap();
        let test = Dataset::new(vec![Column::float("x", vec![1.0])]).unwrap();
        assert!(matches!(
            fitted.transform(&test),
            Err(PreprocessingError::MissingColumn(name)) if name == "port"
        ));
    }

    #[test]
    fn test_kind_change_at_transform() {
        let fitted = build_pipeline(&train_features()).unwrap();
        let test = Dataset::new(vec![
            Column::float("x", vec![1.0]),
            Column::categorical("port", [Some("http")]),
        ])
        .unwrap();
        assert!(matches!(
            fitted.transform(&test),
            Err(PreprocessingError::InvalidColumnKind { .. })
        ));
    }

    #[test]
    fn test_no_numeric_columns() {
        let features =
            Dataset::new(vec![Column::categorical("protocol", [Some("tcp")])]).unwrap();
        assert!(matches!(
            build_pipeline(&features),
            Err(PreprocessingError::EmptyData(_))
        ));
    }

    #[test]
    fn test_artifact_roundtrip() {
        let fitted = build_pipeline(&train_features()).unwrap();
        let bytes = fitted.to_artifact_bytes().unwrap();
        let loaded = FittedNumericPipeline::from_artifact_bytes(&bytes).unwrap();
        assert_eq!(loaded, fitted);
    }
}
