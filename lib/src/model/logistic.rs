//! Multinomial logistic regression.
//!
//! Trained with full-batch gradient descent on the mean cross-entropy loss
//! plus an L2 penalty on the weights (the intercepts are not penalized).
//! Parameters start at zero, so training is deterministic.

use super::{argmax, check_features, check_training_data, Classifier, FittedModel, ModelError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Hyperparameters for [`LogisticRegression`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegressionConfig {
    pub learning_rate: f64,
    pub max_iter: usize,
    /// L2 penalty strength.
    pub l2: f64,
    /// Stop once the largest gradient component falls below this value.
    pub tol: f64,
}

impl Default for LogisticRegressionConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_iter: 1000,
            l2: 1e-4,
            tol: 1e-6,
        }
    }
}

/// Unfitted logistic regression.
///
/// # Example
/// ```
/// use ndarray::array;
/// use netsentry::model::{Classifier, LogisticRegression};
///
/// let x = array![[-2.0], [-1.0], [1.0], [2.0]];
/// let model = LogisticRegression::new().fit(&x, &[0, 0, 1, 1], 2).unwrap();
/// assert_eq!(model.predict(&array![[-3.0], [3.0]]).unwrap(), vec![0, 1]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct LogisticRegression {
    config: LogisticRegressionConfig,
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn learning_rate(mut self, learning_rate: f64) -> Self {
        self.config.learning_rate = learning_rate;
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.config.max_iter = max_iter;
        self
    }

    pub fn l2(mut self, l2: f64) -> Self {
        self.config.l2 = l2;
        self
    }

    pub fn tol(mut self, tol: f64) -> Self {
        self.config.tol = tol;
        self
    }

    pub fn config(&self) -> &LogisticRegressionConfig {
        &self.config
    }

    fn check_config(&self) -> Result<(), ModelError> {
        let c = &self.config;
        if !(c.learning_rate > 0.0 && c.learning_rate.is_finite()) {
            return Err(ModelError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                c.learning_rate
            )));
        }
        if c.l2 < 0.0 || !c.l2.is_finite() {
            return Err(ModelError::InvalidParameter(format!(
                "l2 must be non-negative, got {}",
                c.l2
            )));
        }
        Ok(())
    }
}

/// Row-wise softmax of `logits`, in place.
fn softmax_rows(logits: &mut Array2<f64>) {
    for mut row in logits.rows_mut() {
        let max = row.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
}

impl Classifier for LogisticRegression {
    fn name(&self) -> String {
        "Logistic Regression".to_string()
    }

    fn fit(&self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<FittedModel, ModelError> {
        self.check_config()?;
        check_training_data(x, y, n_classes)?;

        let (n, d) = x.dim();
        let k = n_classes.max(1);
        let mut one_hot = Array2::<f64>::zeros((n, k));
        for (row, &label) in y.iter().enumerate() {
            one_hot[[row, label]] = 1.0;
        }

        let mut weights = Array2::<f64>::zeros((d, k));
        let mut intercepts = Array1::<f64>::zeros(k);
        let scale = 1.0 / n as f64;
        let lr = self.config.learning_rate;

        let mut iterations = 0;
        for _ in 0..self.config.max_iter {
            iterations += 1;
            let mut probs = x.dot(&weights) + &intercepts;
            softmax_rows(&mut probs);
            let residual = probs - &one_hot;

            let grad_w = x.t().dot(&residual) * scale + &weights * self.config.l2;
            let grad_b = residual.sum_axis(Axis(0)) * scale;

            weights.scaled_add(-lr, &grad_w);
            intercepts.scaled_add(-lr, &grad_b);

            let largest = grad_w
                .iter()
                .chain(grad_b.iter())
                .fold(0.0f64, |a, &g| a.max(g.abs()));
            if largest < self.config.tol {
                break;
            }
        }
        debug!(iterations, n_features = d, n_classes = k, "logistic regression fitted");

        Ok(FittedModel::LogisticRegression(FittedLogisticRegression {
            weights,
            intercepts,
        }))
    }
}

/// Fitted logistic regression: `argmax(x · W + b)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedLogisticRegression {
    /// `n_features × n_classes`.
    weights: Array2<f64>,
    intercepts: Array1<f64>,
}

impl FittedLogisticRegression {
    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    pub fn intercepts(&self) -> &Array1<f64> {
        &self.intercepts
    }

    pub fn n_features(&self) -> usize {
        self.weights.nrows()
    }

    pub fn n_classes(&self) -> usize {
        self.weights.ncols()
    }

    /// Check that a loaded model has one intercept per class.
    pub(crate) fn check_shapes(&self) -> Result<(), String> {
        if self.weights.ncols() == 0 || self.weights.nrows() == 0 {
            return Err(format!(
                "logistic regression weights are {}x{}",
                self.weights.nrows(),
                self.weights.ncols()
            ));
        }
        if self.intercepts.len() != self.weights.ncols() {
            return Err(format!(
                "{} intercepts for {} classes",
                self.intercepts.len(),
                self.weights.ncols()
            ));
        }
        Ok(())
    }

    /// Class probabilities, one row per sample.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, ModelError> {
        check_features(x, self.n_features())?;
        let mut probs = x.dot(&self.weights) + &self.intercepts;
        softmax_rows(&mut probs);
        Ok(probs)
    }

    pub(crate) fn predict(&self, x: &Array2<f64>) -> Vec<usize> {
        let logits = x.dot(&self.weights) + &self.intercepts;
        logits.rows().into_iter().map(|row| argmax(row.iter())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn three_blobs() -> (Array2<f64>, Vec<usize>) {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.05],
            [1.0, 1.0],
            [1.05, 0.95],
            [-1.0, 1.0],
            [-0.95, 1.05]
        ];
        (x, vec![0, 0, 1, 1, 2, 2])
    }

    #[test]
    fn test_separates_three_classes() {
        let (x, y) = three_blobs();
        let model = LogisticRegression::new().fit(&x, &y, 3).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
        assert_eq!(model.n_classes(), 3);
        assert_eq!(model.n_features(), 2);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (x, y) = three_blobs();
        let FittedModel::LogisticRegression(model) =
            LogisticRegression::new().fit(&x, &y, 3).unwrap()
        else {
            panic!("expected logistic regression");
        };
        let probs = model.predict_proba(&x).unwrap();
        for row in probs.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_deterministic() {
        let (x, y) = three_blobs();
        let a = LogisticRegression::new().max_iter(50).fit(&x, &y, 3).unwrap();
        let b = LogisticRegression::new().max_iter(50).fit(&x, &y, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_iterations_predicts_first_class() {
        let (x, y) = three_blobs();
        let model = LogisticRegression::new().max_iter(0).fit(&x, &y, 3).unwrap();
        assert!(model.predict(&x).unwrap().iter().all(|&c| c == 0));
    }

    #[test]
    fn test_invalid_learning_rate() {
        let (x, y) = three_blobs();
        let result = LogisticRegression::new().learning_rate(0.0).fit(&x, &y, 3);
        assert!(matches!(result, Err(ModelError::InvalidParameter(_))));
    }

    #[test]
    fn test_feature_mismatch() {
        let (x, y) = three_blobs();
        let model = LogisticRegression::new().fit(&x, &y, 3).unwrap();
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(ModelError::FeatureMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn test_mismatched_intercepts_rejected_on_load() {
        use crate::serialization::{ArtifactError, ArtifactObject};

        let model = FittedModel::LogisticRegression(FittedLogisticRegression {
            weights: Array2::zeros((2, 3)),
            intercepts: Array1::zeros(2),
        });
        let bytes = model.to_artifact_bytes().unwrap();
        assert!(matches!(
            FittedModel::from_artifact_bytes(&bytes),
            Err(ArtifactError::Corrupt(_))
        ));
    }
}
