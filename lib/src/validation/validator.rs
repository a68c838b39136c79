//! The validation stage.

use super::drift::{detect_drift, DriftReport};
use super::error::ValidationError;
use super::validate_column_count;
use crate::context::RunContext;
use crate::dataset::Dataset;
use crate::error::{Stage, StageError, StageResultExt};
use crate::schema::Schema;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Outputs of a successful validation run.
#[derive(Clone, Debug)]
pub struct ValidationArtifact {
    /// `true` iff no column drifted.
    pub drift_status: bool,
    pub report: DriftReport,
    pub report_file: PathBuf,
    pub valid_train_file: PathBuf,
    pub valid_test_file: PathBuf,
}

pub struct DataValidator<'a> {
    ctx: &'a RunContext,
    schema: Schema,
}

impl<'a> DataValidator<'a> {
    /// Load the configured schema.
    pub fn new(ctx: &'a RunContext) -> Result<Self, StageError> {
        let schema = Schema::load(&ctx.config().validation.schema_file).stage(Stage::Validation)?;
        Ok(Self { ctx, schema })
    }

    pub fn with_schema(ctx: &'a RunContext, schema: Schema) -> Self {
        Self { ctx, schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Fail with [`ValidationError::ColumnCount`] unless `dataset` has as many
    /// columns as the schema.
    pub fn check_columns(&self, dataset: &Dataset, name: &str) -> Result<(), ValidationError> {
        if validate_column_count(dataset, &self.schema) {
            return Ok(());
        }
        let err = ValidationError::ColumnCount {
            dataset: name.to_string(),
            expected: self.schema.len(),
            actual: dataset.n_columns(),
        };
        error!("{err}");
        Err(err)
    }

    /// Check both splits, test for drift, write the report and the
    /// validated copies.
    ///
    /// Drift does not fail the stage; it is returned in the artifact.
    pub fn initiate_validation(&self) -> Result<ValidationArtifact, StageError> {
        let span = self.ctx.stage_span(Stage::Validation);
        let _enter = span.enter();

        let paths = &self.ctx.config().file_paths;
        let settings = &self.ctx.config().validation;

        let train = Dataset::read_csv(&paths.train_data).stage(Stage::Validation)?;
        let test = Dataset::read_csv(&paths.test_data).stage(Stage::Validation)?;
        info!(
            train_rows = train.n_rows(),
            test_rows = test.n_rows(),
            "loaded train and test splits"
        );

        self.check_columns(&train, "train").stage(Stage::Validation)?;
        self.check_columns(&test, "test").stage(Stage::Validation)?;

        let report =
            detect_drift(&train, &test, settings.drift_threshold).stage(Stage::Validation)?;
        report
            .write_yaml(&settings.report_file)
            .stage(Stage::Validation)?;
        info!(path = %settings.report_file.display(), "drift report written");

        let drift_status = report.status();
        if !drift_status {
            warn!(
                columns = ?report.drifted_columns(),
                "drift detected between train and test splits"
            );
        }

        train
            .write_csv(&settings.valid_train_file_path)
            .stage(Stage::Validation)?;
        test.write_csv(&settings.valid_test_file_path)
            .stage(Stage::Validation)?;
        info!("validated train and test data saved");

        Ok(ValidationArtifact {
            drift_status,
            report,
            report_file: settings.report_file.clone(),
            valid_train_file: settings.valid_train_file_path.clone(),
            valid_test_file: settings.valid_test_file_path.clone(),
        })
    }
}
