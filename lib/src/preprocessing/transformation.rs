//! The transformation stage.

use crate::context::RunContext;
use crate::dataset::{Column, Dataset};
use crate::error::{PipelineError, Stage, StageError, StageResultExt};
use crate::preprocessing::encoding::{column_labels, FittedLabelEncoder, LabelEncoder};
use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::numeric::{build_pipeline, FittedNumericPipeline};
use crate::serialization::{save_matrix, ArtifactObject};
use ndarray::{concatenate, Array2, Axis};
use std::path::PathBuf;
use tracing::info;

/// Files written by a transformation run.
#[derive(Clone, Debug)]
pub struct TransformationArtifact {
    pub transformed_train_file: PathBuf,
    pub transformed_test_file: PathBuf,
    pub transformer_object: PathBuf,
    pub target_object: PathBuf,
}

/// Split `dataset` into features and the target column.
pub fn split_target(dataset: &Dataset, target: &str) -> Result<(Dataset, Column), PreprocessingError> {
    dataset
        .split_off(target)
        .map_err(|_| PreprocessingError::MissingColumn(target.to_string()))
}

/// Append encoded labels as the trailing column.
pub fn append_labels(features: &Array2<f64>, labels: &[usize]) -> Result<Array2<f64>, PreprocessingError> {
    if features.nrows() != labels.len() {
        return Err(PreprocessingError::InvalidShape {
            expected: format!("{} labels", features.nrows()),
            got: format!("{}", labels.len()),
        });
    }
    let y = Array2::from_shape_fn((labels.len(), 1), |(row, _)| labels[row] as f64);
    concatenate(Axis(1), &[features.view(), y.view()]).map_err(|e| {
        PreprocessingError::InvalidShape {
            expected: "matching row counts".to_string(),
            got: e.to_string(),
        }
    })
}

/// Fitted state produced from the training split.
pub struct FittedTransformers {
    pub preprocessor: FittedNumericPipeline,
    pub encoder: FittedLabelEncoder,
}

impl FittedTransformers {
    /// Fit both transformers on training features and labels only.
    pub fn fit(features: &Dataset, target: &Column) -> Result<Self, PreprocessingError> {
        let preprocessor = build_pipeline(features)?;
        let encoder = LabelEncoder::new().fit(&column_labels(target)?)?;
        Ok(Self {
            preprocessor,
            encoder,
        })
    }

    /// Features and encoded labels as one matrix, label last.
    pub fn transform(&self, features: &Dataset, target: &Column) -> Result<Array2<f64>, PreprocessingError> {
        let x = self.preprocessor.transform(features)?;
        let y = self.encoder.transform(&column_labels(target)?)?;
        append_labels(&x, &y)
    }
}

pub struct DataTransformer<'a> {
    ctx: &'a RunContext,
}

impl<'a> DataTransformer<'a> {
    pub fn new(ctx: &'a RunContext) -> Self {
        Self { ctx }
    }

    /// Fit on the validated train split, transform both splits and persist
    /// the matrices and the fitted transformers.
    pub fn initiate_transformation(&self) -> Result<TransformationArtifact, StageError> {
        let span = self.ctx.stage_span(Stage::Transformation);
        let _enter = span.enter();
        self.run().stage(Stage::Transformation)
    }

    fn run(&self) -> Result<TransformationArtifact, PipelineError> {
        let config = self.ctx.config();
        let target = &config.training.target_columns;
        let settings = &config.transformation;

        let train = Dataset::read_csv(&config.validation.valid_train_file_path)?;
        let test = Dataset::read_csv(&config.validation.valid_test_file_path)?;

        let (train_features, train_target) = split_target(&train, target)?;
        let (test_features, test_target) = split_target(&test, target)?;

        let fitted = FittedTransformers::fit(&train_features, &train_target)?;
        info!(
            n_features = fitted.preprocessor.n_features(),
            classes = ?fitted.encoder.classes(),
            "transformers fitted on training split"
        );

        let train_arr = fitted.transform(&train_features, &train_target)?;
        let test_arr = fitted.transform(&test_features, &test_target)?;

        save_matrix(&settings.transformed_train_data, &train_arr)?;
        save_matrix(&settings.transformed_test_data, &test_arr)?;
        fitted.preprocessor.save_to_file(&settings.transformer_object)?;
        fitted.encoder.save_to_file(&settings.target_object)?;
        info!(
            train_shape = ?train_arr.shape(),
            test_shape = ?test_arr.shape(),
            "transformed arrays and objects saved"
        );

        Ok(TransformationArtifact {
            transformed_train_file: settings.transformed_train_data.clone(),
            transformed_test_file: settings.transformed_test_data.clone(),
            transformer_object: settings.transformer_object.clone(),
            target_object: settings.target_object.clone(),
        })
    }
}
