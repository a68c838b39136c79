//! Simple Imputer.
//!
//! Completes missing values column by column with the median learned from
//! the training matrix. `NaN` marks a missing cell.
//!
//! # Example
//! ```
//! use ndarray::array;
//! use netsentry::preprocessing::{FittedTransformer, SimpleImputer, Transformer};
//!
//! let train = array![[1.0], [2.0], [f64::NAN], [4.0]];
//! let fitted = SimpleImputer::new().fit(&train).unwrap();
//! assert_eq!(fitted.statistics(), &[2.0]);
//! let filled = fitted.transform(&array![[f64::NAN]]).unwrap();
//! assert_eq!(filled[[0, 0]], 2.0);
//! ```

use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Serializable parameters for a fitted SimpleImputer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimpleImputerParams {
    /// Fill value for each feature.
    pub statistics: Vec<f64>,
}

/// Median imputer (unfitted).
#[derive(Clone, Debug, Default)]
pub struct SimpleImputer;

impl SimpleImputer {
    pub fn new() -> Self {
        Self
    }
}

/// Median of one column, ignoring `NaN`s. An all-missing column gets 0.
fn column_median(column: ArrayView1<f64>) -> f64 {
    let mut present: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
    if present.is_empty() {
        return 0.0;
    }
    present.sort_by(f64::total_cmp);
    let n = present.len();
    if n % 2 == 0 {
        (present[n / 2 - 1] + present[n / 2]) / 2.0
    } else {
        present[n / 2]
    }
}

impl Transformer for SimpleImputer {
    type Input = Array2<f64>;
    type Output = Array2<f64>;
    type Params = SimpleImputerParams;
    type Fitted = FittedSimpleImputer;

    fn fit(&self, data: &Self::Input) -> Result<Self::Fitted, PreprocessingError> {
        if data.nrows() == 0 {
            return Err(PreprocessingError::EmptyData(
                "Cannot fit SimpleImputer on empty data".to_string(),
            ));
        }

        let statistics = data
            .axis_iter(Axis(1))
            .map(column_median)
            .collect();

        Ok(FittedSimpleImputer { statistics })
    }
}

/// Fitted SimpleImputer ready for inference.
#[derive(Clone, Debug, PartialEq)]
pub struct FittedSimpleImputer {
    statistics: Vec<f64>,
}

impl FittedSimpleImputer {
    /// Fill values for each feature.
    pub fn statistics(&self) -> &[f64] {
        &self.statistics
    }
}

impl FittedTransformer for FittedSimpleImputer {
    type Input = Array2<f64>;
    type Output = Array2<f64>;
    type Params = SimpleImputerParams;

    fn transform(&self, data: &Self::Input) -> Result<Self::Output, PreprocessingError> {
        if data.ncols() != self.statistics.len() {
            return Err(PreprocessingError::FeatureMismatch {
                expected_features: self.statistics.len(),
                got_features: data.ncols(),
            });
        }

        let mut result = data.clone();
        for mut row in result.rows_mut() {
            for (v, &fill) in row.iter_mut().zip(&self.statistics) {
                if v.is_nan() {
                    *v = fill;
                }
            }
        }
        Ok(result)
    }

    fn extract_params(&self) -> Self::Params {
        SimpleImputerParams {
            statistics: self.statistics.clone(),
        }
    }

    fn from_params(params: Self::Params) -> Result<Self, PreprocessingError> {
        if params.statistics.iter().any(|s| !s.is_finite()) {
            return Err(PreprocessingError::InvalidParameter(
                "imputer statistics must be finite".to_string(),
            ));
        }
        Ok(Self {
            statistics: params.statistics,
        })
    }

    fn n_features_in(&self) -> usize {
        self.statistics.len()
    }
}
