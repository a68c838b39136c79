//! Pipeline for chaining transformers.
//!
//! A Pipeline chains transformers so the output of one becomes the input
//! of the next. Each step is fitted on the output of the previously fitted
//! steps.
//!
//! # Example
//! ```
//! use ndarray::array;
//! use netsentry::preprocessing::{
//!     FittedTransformer, Pipeline, SimpleImputer, StandardScaler, Transformer,
//! };
//!
//! let pipeline = Pipeline::new()
//!     .add_simple_imputer(SimpleImputer::new())
//!     .add_standard_scaler(StandardScaler::new());
//!
//! let fitted = pipeline.fit(&array![[1.0], [f64::NAN], [3.0]]).unwrap();
//! assert_eq!(fitted.step_names(), vec!["SimpleImputer", "StandardScaler"]);
//! ```

use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::imputation::{FittedSimpleImputer, SimpleImputer, SimpleImputerParams};
use crate::preprocessing::scaling::{FittedStandardScaler, StandardScaler, StandardScalerParams};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// A fitted transformer that can be part of a pipeline.
pub trait PipelineStep: Clone {
    /// Transform the data.
    fn transform_step(&self, data: &Array2<f64>) -> Result<Array2<f64>, PreprocessingError>;
    /// Get the step name for debugging.
    fn step_name(&self) -> &'static str;
}

/// A fitted step.
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineStepEnum {
    /// SimpleImputer step.
    SimpleImputer(FittedSimpleImputer),
    /// StandardScaler step.
    StandardScaler(FittedStandardScaler),
}

impl PipelineStep for PipelineStepEnum {
    fn transform_step(&self, data: &Array2<f64>) -> Result<Array2<f64>, PreprocessingError> {
        match self {
            PipelineStepEnum::SimpleImputer(t) => t.transform(data),
            PipelineStepEnum::StandardScaler(t) => t.transform(data),
        }
    }

    fn step_name(&self) -> &'static str {
        match self {
            PipelineStepEnum::SimpleImputer(_) => "SimpleImputer",
            PipelineStepEnum::StandardScaler(_) => "StandardScaler",
        }
    }
}

/// Serializable parameters of one fitted step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PipelineStepParams {
    SimpleImputer(SimpleImputerParams),
    StandardScaler(StandardScalerParams),
}

/// Serializable representation of a fitted pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineParams {
    /// Parameters of every step, in order.
    pub steps: Vec<PipelineStepParams>,
    /// Number of features seen during fit.
    pub n_features: usize,
}

/// A step in the unfitted pipeline.
#[derive(Clone, Debug)]
pub enum UnfittedStepEnum {
    SimpleImputer(SimpleImputer),
    StandardScaler(StandardScaler),
}

impl UnfittedStepEnum {
    fn fit(&self, data: &Array2<f64>) -> Result<PipelineStepEnum, PreprocessingError> {
        match self {
            UnfittedStepEnum::SimpleImputer(t) => t.fit(data).map(PipelineStepEnum::SimpleImputer),
            UnfittedStepEnum::StandardScaler(t) => {
                t.fit(data).map(PipelineStepEnum::StandardScaler)
            }
        }
    }
}

/// Pipeline transformer (unfitted).
#[derive(Clone, Debug, Default)]
pub struct Pipeline {
    steps: Vec<UnfittedStepEnum>,
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a SimpleImputer to the pipeline.
    pub fn add_simple_imputer(mut self, imputer: SimpleImputer) -> Self {
        self.steps.push(UnfittedStepEnum::SimpleImputer(imputer));
        self
    }

    /// Add a StandardScaler to the pipeline.
    pub fn add_standard_scaler(mut self, scaler: StandardScaler) -> Self {
        self.steps.push(UnfittedStepEnum::StandardScaler(scaler));
        self
    }

    /// Get the number of steps in the pipeline.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the pipeline is empty.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Transformer for Pipeline {
    type Input = Array2<f64>;
    type Output = Array2<f64>;
    type Params = PipelineParams;
    type Fitted = FittedPipeline;

    fn fit(&self, data: &Self::Input) -> Result<Self::Fitted, PreprocessingError> {
        if self.steps.is_empty() {
            return Err(PreprocessingError::InvalidParameter(
                "Cannot fit an empty pipeline".to_string(),
            ));
        }
        if data.nrows() == 0 {
            return Err(PreprocessingError::EmptyData(
                "Cannot fit pipeline on empty data".to_string(),
            ));
        }

        let mut fitted_steps = Vec::with_capacity(self.steps.len());
        let mut current_data = data.clone();

        for step in &self.steps {
            let fitted = step.fit(&current_data)?;
            current_data = fitted.transform_step(&current_data)?;
            fitted_steps.push(fitted);
        }

        Ok(FittedPipeline {
            steps: fitted_steps,
            n_features: data.ncols(),
        })
    }
}

/// Fitted Pipeline ready for inference.
#[derive(Clone, Debug, PartialEq)]
pub struct FittedPipeline {
    steps: Vec<PipelineStepEnum>,
    n_features: usize,
}

impl FittedPipeline {
    /// Get the number of steps in the pipeline.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the pipeline is empty.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Get the names of all steps in the pipeline.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.step_name()).collect()
    }

    fn check_features(&self, data: &Array2<f64>) -> Result<(), PreprocessingError> {
        if data.ncols() != self.n_features {
            return Err(PreprocessingError::FeatureMismatch {
                expected_features: self.n_features,
                got_features: data.ncols(),
            });
        }
        Ok(())
    }
}

impl FittedTransformer for FittedPipeline {
    type Input = Array2<f64>;
    type Output = Array2<f64>;
    type Params = PipelineParams;

    fn transform(&self, data: &Self::Input) -> Result<Self::Output, PreprocessingError> {
        self.check_features(data)?;
        let mut result = data.clone();
        for step in &self.steps {
            result = step.transform_step(&result)?;
        }
        Ok(result)
    }

    fn extract_params(&self) -> Self::Params {
        let steps = self
            .steps
            .iter()
            .map(|step| match step {
                PipelineStepEnum::SimpleImputer(t) => {
                    PipelineStepParams::SimpleImputer(t.extract_params())
                }
                PipelineStepEnum::StandardScaler(t) => {
                    PipelineStepParams::StandardScaler(t.extract_params())
                }
            })
            .collect();
        PipelineParams {
            steps,
            n_features: self.n_features,
        }
    }

    fn from_params(params: Self::Params) -> Result<Self, PreprocessingError> {
        let steps = params
            .steps
            .into_iter()
            .map(|step| match step {
                PipelineStepParams::SimpleImputer(p) => {
                    FittedSimpleImputer::from_params(p).map(PipelineStepEnum::SimpleImputer)
                }
                PipelineStepParams::StandardScaler(p) => {
                    FittedStandardScaler::from_params(p).map(PipelineStepEnum::StandardScaler)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        for step in &steps {
            let n = match step {
                PipelineStepEnum::SimpleImputer(t) => t.n_features_in(),
                PipelineStepEnum::StandardScaler(t) => t.n_features_in(),
            };
            if n != params.n_features {
                return Err(PreprocessingError::FeatureMismatch {
                    expected_features: params.n_features,
                    got_features: n,
                });
            }
        }

        Ok(Self {
            steps,
            n_features: params.n_features,
        })
    }

    fn n_features_in(&self) -> usize {
        self.n_features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn median_then_scale() -> Pipeline {
        Pipeline::new()
            .add_simple_imputer(SimpleImputer::new())
            .add_standard_scaler(StandardScaler::new())
    }

    #[test]
    fn test_pipeline_imputes_before_scaling() {
        let data = array![[1.0], [2.0], [f64::NAN], [4.0]];
        let fitted = median_then_scale().fit(&data).unwrap();

        let out = fitted.transform(&data).unwrap();
        let std = 1.1875f64.sqrt();
        let expected = [1.0, 2.0, 2.0, 4.0].map(|x| (x - 2.25) / std);
        for (got, want) in out.column(0).iter().zip(expected) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn test_empty_pipeline() {
        assert!(Pipeline::new().is_empty());
        let result = Pipeline::new().fit(&array![[1.0]]);
        assert!(matches!(result, Err(PreprocessingError::InvalidParameter(_))));
    }

    #[test]
    fn test_pipeline_empty_data() {
        let data = Array2::<f64>::zeros((0, 3));
        assert!(matches!(
            median_then_scale().fit(&data),
            Err(PreprocessingError::EmptyData(_))
        ));
    }

    #[test]
    fn test_pipeline_params_roundtrip() {
        let data = array![[1.0, 10.0], [f64::NAN, 20.0], [3.0, f64::NAN]];
        let fitted = median_then_scale().fit(&data).unwrap();

        let restored = FittedPipeline::from_params(fitted.extract_params()).unwrap();
        assert_eq!(restored, fitted);
        assert_eq!(restored.len(), 2);
    }

    #[test]
    fn test_pipeline_feature_mismatch() {
        let fitted = median_then_scale().fit(&array![[1.0, 2.0]]).unwrap();
        assert!(matches!(
            fitted.transform(&array![[1.0]]),
            Err(PreprocessingError::FeatureMismatch { .. })
        ));
    }
}
