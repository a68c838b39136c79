//! Model training and selection.
//!
//! Every candidate family comes with a small hyperparameter grid. Each grid
//! point is scored by stratified k-fold cross-validation accuracy on the
//! training split; the best point is refit on the whole training split and
//! scored on the test split. The family with the highest test accuracy wins,
//! ties going to the earlier family.

use crate::context::RunContext;
use crate::error::{PipelineError, Stage, StageError, StageResultExt};
use crate::metrics::{accuracy, ClassificationReport, EvaluationReport};
use crate::model::{
    split_features_labels, Classifier, Criterion, DecisionTree, FittedModel, LogisticRegression,
    ModelError, NetworkModel,
};
use crate::preprocessing::{FittedLabelEncoder, FittedNumericPipeline};
use crate::serialization::{load_matrix, ArtifactObject};
use ndarray::{Array2, Axis};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// One grid point of a candidate family.
#[derive(Clone, Debug)]
pub enum Candidate {
    LogisticRegression(LogisticRegression),
    DecisionTree(DecisionTree),
}

impl Classifier for Candidate {
    fn name(&self) -> String {
        match self {
            Candidate::LogisticRegression(m) => m.name(),
            Candidate::DecisionTree(m) => m.name(),
        }
    }

    fn fit(&self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<FittedModel, ModelError> {
        match self {
            Candidate::LogisticRegression(m) => m.fit(x, y, n_classes),
            Candidate::DecisionTree(m) => m.fit(x, y, n_classes),
        }
    }
}

/// A model family and the grid points to search.
#[derive(Clone, Debug)]
pub struct CandidateGrid {
    pub family: String,
    pub points: Vec<Candidate>,
}

/// Decision tree over every split criterion, and logistic regression with
/// its defaults.
pub fn default_candidates() -> Vec<CandidateGrid> {
    vec![
        CandidateGrid {
            family: "Decision Tree".to_string(),
            points: Criterion::ALL
                .iter()
                .map(|&c| Candidate::DecisionTree(DecisionTree::new().criterion(c)))
                .collect(),
        },
        CandidateGrid {
            family: "Logistic Regression".to_string(),
            points: vec![Candidate::LogisticRegression(
                LogisticRegression::new().max_iter(500),
            )],
        },
    ]
}

/// Stratified, unshuffled folds as `(train_rows, validation_rows)` pairs.
///
/// Rows are grouped by label and dealt to the folds in turn, so every fold
/// holds each class in proportion and fold sizes differ by at most one.
/// Rows keep their original order inside a fold.
pub fn stratified_kfold_indices(y: &[usize], k: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
    let n = y.len();
    let k = k.min(n);
    if k < 2 {
        return Vec::new();
    }
    let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (row, &label) in y.iter().enumerate() {
        by_class.entry(label).or_default().push(row);
    }
    let mut fold_of = vec![0; n];
    for (i, &row) in by_class.values().flatten().enumerate() {
        fold_of[row] = i % k;
    }
    (0..k)
        .map(|fold| {
            let (validation, train): (Vec<usize>, Vec<usize>) =
                (0..n).partition(|&r| fold_of[r] == fold);
            (train, validation)
        })
        .collect()
}

/// Mean validation accuracy over the folds. With fewer than two rows the
/// model is scored on its own training data.
pub fn cross_val_accuracy<C: Classifier>(
    candidate: &C,
    x: &Array2<f64>,
    y: &[usize],
    n_classes: usize,
    folds: usize,
) -> Result<f64, ModelError> {
    let splits = stratified_kfold_indices(y, folds);
    if splits.is_empty() {
        let model = candidate.fit(x, y, n_classes)?;
        return Ok(accuracy(y, &model.predict(x)?));
    }

    let mut total = 0.0;
    for (train_rows, valid_rows) in &splits {
        let x_train = x.select(Axis(0), train_rows);
        let y_train: Vec<usize> = train_rows.iter().map(|&r| y[r]).collect();
        let x_valid = x.select(Axis(0), valid_rows);
        let y_valid: Vec<usize> = valid_rows.iter().map(|&r| y[r]).collect();

        let model = candidate.fit(&x_train, &y_train, n_classes)?;
        total += accuracy(&y_valid, &model.predict(&x_valid)?);
    }
    Ok(total / splits.len() as f64)
}

/// Outcome of the grid search for one family.
#[derive(Clone, Debug)]
pub struct TrainedCandidate {
    pub family: String,
    /// Name of the winning grid point.
    pub best_point: String,
    pub cv_accuracy: f64,
    pub test_accuracy: f64,
    pub model: FittedModel,
}

/// Train and test split matrices with their labels.
pub struct Splits<'a> {
    pub x_train: &'a Array2<f64>,
    pub y_train: &'a [usize],
    pub x_test: &'a Array2<f64>,
    pub y_test: &'a [usize],
    pub n_classes: usize,
}

/// Grid-search every family, refit its best point and score it on the
/// test split. Results keep the order of `grids`.
pub fn evaluate_models(
    splits: &Splits<'_>,
    grids: &[CandidateGrid],
    folds: usize,
) -> Result<Vec<TrainedCandidate>, ModelError> {
    let mut results = Vec::with_capacity(grids.len());
    for grid in grids {
        if grid.points.is_empty() {
            return Err(ModelError::InvalidParameter(format!(
                "{} has an empty parameter grid",
                grid.family
            )));
        }

        let scores = grid
            .points
            .par_iter()
            .map(|point| {
                cross_val_accuracy(point, splits.x_train, splits.y_train, splits.n_classes, folds)
            })
            .collect::<Result<Vec<f64>, _>>()?;

        let mut best = 0;
        for (i, &score) in scores.iter().enumerate() {
            debug!(family = %grid.family, point = %grid.points[i].name(), cv_accuracy = score, "grid point scored");
            if score > scores[best] {
                best = i;
            }
        }

        let point = &grid.points[best];
        let model = point.fit(splits.x_train, splits.y_train, splits.n_classes)?;
        let test_accuracy = accuracy(splits.y_test, &model.predict(splits.x_test)?);
        info!(
            family = %grid.family,
            best_point = %point.name(),
            cv_accuracy = scores[best],
            test_accuracy,
            "candidate evaluated"
        );

        results.push(TrainedCandidate {
            family: grid.family.clone(),
            best_point: point.name(),
            cv_accuracy: scores[best],
            test_accuracy,
            model,
        });
    }
    Ok(results)
}

/// Highest test accuracy; the first candidate wins ties.
pub fn select_best(candidates: &[TrainedCandidate]) -> Option<&TrainedCandidate> {
    candidates.iter().fold(None, |best, c| match best {
        Some(b) if b.test_accuracy >= c.test_accuracy => Some(b),
        _ => Some(c),
    })
}

/// Files and scores produced by a training run.
#[derive(Clone, Debug)]
pub struct ModelTrainerArtifact {
    pub best_model: String,
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    pub model_file: PathBuf,
    pub report_file: PathBuf,
}

/// The training stage.
pub struct ModelTrainer<'a> {
    ctx: &'a RunContext,
    folds: usize,
    candidates: Vec<CandidateGrid>,
}

/// Fluent builder for [`ModelTrainer`].
///
/// Defaults:
/// - `folds`: 3
/// - `candidates`: [`default_candidates`]
pub struct ModelTrainerBuilder<'a> {
    ctx: &'a RunContext,
    folds: usize,
    candidates: Vec<CandidateGrid>,
}

impl<'a> ModelTrainerBuilder<'a> {
    pub fn new(ctx: &'a RunContext) -> Self {
        Self {
            ctx,
            folds: 3,
            candidates: default_candidates(),
        }
    }

    pub fn folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    pub fn candidates(mut self, candidates: Vec<CandidateGrid>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn build(self) -> ModelTrainer<'a> {
        ModelTrainer {
            ctx: self.ctx,
            folds: self.folds,
            candidates: self.candidates,
        }
    }
}

impl<'a> ModelTrainer<'a> {
    pub fn builder(ctx: &'a RunContext) -> ModelTrainerBuilder<'a> {
        ModelTrainerBuilder::new(ctx)
    }

    pub fn new(ctx: &'a RunContext) -> Self {
        Self::builder(ctx).build()
    }

    /// Train candidates on the transformed arrays, write the report of the
    /// best one and persist it as a [`NetworkModel`].
    pub fn initiate_model_trainer(&self) -> Result<ModelTrainerArtifact, StageError> {
        let span = self.ctx.stage_span(Stage::Training);
        let _enter = span.enter();
        self.run().stage(Stage::Training)
    }

    fn run(&self) -> Result<ModelTrainerArtifact, PipelineError> {
        let config = self.ctx.config();
        let transformation = &config.transformation;

        let encoder = FittedLabelEncoder::load_from_file(&transformation.target_object)?;
        let n_classes = encoder.n_classes();
        let train_arr = load_matrix(&transformation.transformed_train_data)?;
        let test_arr = load_matrix(&transformation.transformed_test_data)?;
        let (x_train, y_train) = split_features_labels(&train_arr, n_classes)?;
        let (x_test, y_test) = split_features_labels(&test_arr, n_classes)?;
        info!(
            train_rows = x_train.nrows(),
            test_rows = x_test.nrows(),
            n_features = x_train.ncols(),
            "transformed arrays loaded"
        );

        let splits = Splits {
            x_train: &x_train,
            y_train: &y_train,
            x_test: &x_test,
            y_test: &y_test,
            n_classes,
        };
        let trained = evaluate_models(&splits, &self.candidates, self.folds)?;
        let best = select_best(&trained).ok_or_else(|| {
            ModelError::InvalidParameter("no candidate models configured".to_string())
        })?;

        let train_pred = best.model.predict(&x_train)?;
        let test_pred = best.model.predict(&x_test)?;
        let train_report = ClassificationReport::from_predictions(&y_train, &train_pred, encoder.classes());
        let test_report = ClassificationReport::from_predictions(&y_test, &test_pred, encoder.classes());
        let train_accuracy = train_report.accuracy();
        let test_accuracy = test_report.accuracy();

        let report_file = config.evaluation.evaluation_report.clone();
        EvaluationReport::new(train_report, test_report).write_yaml(&report_file)?;
        info!(
            model = %best.best_point,
            accuracy = %format!("{:.4}", best.test_accuracy),
            "best model selected"
        );

        let preprocessor = FittedNumericPipeline::load_from_file(&transformation.transformer_object)?;
        let network_model = NetworkModel::new(preprocessor, best.model.clone(), encoder)?;
        let model_file = config.training.model_output.clone();
        network_model.save_to_file(&model_file)?;
        info!(path = %model_file.display(), "trained model saved");

        Ok(ModelTrainerArtifact {
            best_model: best.best_point.clone(),
            train_accuracy,
            test_accuracy,
            model_file,
            report_file,
        })
    }
}
