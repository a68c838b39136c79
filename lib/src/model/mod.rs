//! Classification models.
//!
//! Unfitted models carry hyperparameters and implement [`Classifier`];
//! fitting returns a [`FittedModel`], which only knows how to predict and
//! holds no training state. Fitted models are plain data and persist as
//! [`ArtifactKind::Model`] artifacts.

pub mod logistic;
mod network;
pub mod tree;

pub use logistic::{FittedLogisticRegression, LogisticRegression};
pub use network::{NetworkModel, NetworkModelPayload};
pub use tree::{Criterion, DecisionTree, FittedDecisionTree};

use crate::preprocessing::PreprocessingError;
use crate::serialization::{ArtifactError, ArtifactKind, ArtifactObject};
use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Feature mismatch: expected {expected} features, got {got}")]
    FeatureMismatch { expected: usize, got: usize },

    #[error("{features} feature rows but {labels} labels")]
    LabelCount { features: usize, labels: usize },

    #[error("label {label} is not a class index below {n_classes}")]
    InvalidLabel { label: f64, n_classes: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Preprocessing(#[from] PreprocessingError),
}

/// An unfitted classifier.
pub trait Classifier {
    /// Display name, including hyperparameters that distinguish grid points.
    fn name(&self) -> String;

    /// Fit on features `x` and labels `y` in `0..n_classes`.
    fn fit(&self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<FittedModel, ModelError>;
}

/// A fitted classifier of any supported family.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FittedModel {
    LogisticRegression(FittedLogisticRegression),
    DecisionTree(FittedDecisionTree),
}

impl FittedModel {
    /// Predicted class index for every row.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>, ModelError> {
        check_features(x, self.n_features())?;
        Ok(match self {
            FittedModel::LogisticRegression(m) => m.predict(x),
            FittedModel::DecisionTree(m) => m.predict(x),
        })
    }

    pub fn n_features(&self) -> usize {
        match self {
            FittedModel::LogisticRegression(m) => m.n_features(),
            FittedModel::DecisionTree(m) => m.n_features(),
        }
    }

    pub fn n_classes(&self) -> usize {
        match self {
            FittedModel::LogisticRegression(m) => m.n_classes(),
            FittedModel::DecisionTree(m) => m.n_classes(),
        }
    }

    /// Structural checks for a model read back from disk.
    pub(crate) fn check_loaded(&self) -> Result<(), ArtifactError> {
        match self {
            FittedModel::LogisticRegression(m) => m.check_shapes(),
            FittedModel::DecisionTree(m) => m.check_nodes(),
        }
        .map_err(ArtifactError::Corrupt)
    }

    pub fn family(&self) -> &'static str {
        match self {
            FittedModel::LogisticRegression(_) => "Logistic Regression",
            FittedModel::DecisionTree(_) => "Decision Tree",
        }
    }
}

impl ArtifactObject for FittedModel {
    const KIND: ArtifactKind = ArtifactKind::Model;
    type Payload = FittedModel;

    fn to_payload(&self) -> Self::Payload {
        self.clone()
    }

    fn from_payload(payload: Self::Payload) -> Result<Self, ArtifactError> {
        payload.check_loaded()?;
        Ok(payload)
    }
}

pub(crate) fn check_features(x: &Array2<f64>, expected: usize) -> Result<(), ModelError> {
    if x.ncols() != expected {
        return Err(ModelError::FeatureMismatch {
            expected,
            got: x.ncols(),
        });
    }
    Ok(())
}

/// Common checks before fitting.
pub(crate) fn check_training_data(
    x: &Array2<f64>,
    y: &[usize],
    n_classes: usize,
) -> Result<(), ModelError> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(ModelError::EmptyData(format!(
            "cannot fit on a {}x{} matrix",
            x.nrows(),
            x.ncols()
        )));
    }
    if x.nrows() != y.len() {
        return Err(ModelError::LabelCount {
            features: x.nrows(),
            labels: y.len(),
        });
    }
    if let Some(&bad) = y.iter().find(|&&label| label >= n_classes) {
        return Err(ModelError::InvalidLabel {
            label: bad as f64,
            n_classes,
        });
    }
    Ok(())
}

/// Split a transformed matrix into features and the trailing label column.
pub fn split_features_labels(
    arr: &Array2<f64>,
    n_classes: usize,
) -> Result<(Array2<f64>, Vec<usize>), ModelError> {
    if arr.ncols() < 2 {
        return Err(ModelError::EmptyData(
            "matrix needs at least one feature column and a label column".to_string(),
        ));
    }
    let last = arr.ncols() - 1;
    let x = arr.slice(s![.., ..last]).to_owned();
    let y = arr
        .column(last)
        .iter()
        .map(|&label| {
            if label.fract() == 0.0 && label >= 0.0 && label < n_classes as f64 {
                Ok(label as usize)
            } else {
                Err(ModelError::InvalidLabel { label, n_classes })
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((x, y))
}

/// Index of the largest value; the first one wins ties.
pub(crate) fn argmax<'a, I: IntoIterator<Item = &'a f64>>(values: I) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (i, &v) in values.into_iter().enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}
