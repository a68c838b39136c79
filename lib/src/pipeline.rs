//! Stage sequencing.
//!
//! Each function runs one stage against a [`RunContext`]; [`run`] chains
//! them. Stages are strictly sequential and the first failure aborts the
//! run.

use crate::context::RunContext;
use crate::dataset::{Column, Dataset};
use crate::error::{Stage, StageError, StageResultExt};
use crate::ingestion::{DataIngestion, IngestionArtifact};
use crate::model::NetworkModel;
use crate::preprocessing::{DataTransformer, TransformationArtifact};
use crate::serialization::ArtifactObject;
use crate::store::{open_store, DocumentStore, NetworkDataHandler};
use crate::trainer::{ModelTrainer, ModelTrainerArtifact};
use crate::validation::{DataValidator, ValidationArtifact};
use std::path::{Path, PathBuf};
use tracing::info;

/// Name of the column [`predict`] appends.
pub const PREDICTION_COLUMN: &str = "prediction";

/// Optional stages of a full run. Validation and transformation always run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub with_ingestion: bool,
    pub with_training: bool,
}

#[derive(Clone, Debug)]
pub struct RunSummary {
    pub ingestion: Option<IngestionArtifact>,
    pub validation: ValidationArtifact,
    pub transformation: TransformationArtifact,
    pub training: Option<ModelTrainerArtifact>,
}

/// Open the store named by the URI in `db.uri_env_key`.
pub fn open_configured_store(ctx: &RunContext, stage: Stage) -> Result<Box<dyn DocumentStore>, StageError> {
    let uri = ctx.configuration().db_uri().stage(stage)?;
    open_store(&uri).stage(stage)
}

pub fn ingest(ctx: &RunContext, store: &dyn DocumentStore) -> Result<IngestionArtifact, StageError> {
    DataIngestion::new(ctx, store).initiate_ingestion()
}

pub fn validate(ctx: &RunContext) -> Result<ValidationArtifact, StageError> {
    DataValidator::new(ctx)?.initiate_validation()
}

pub fn transform(ctx: &RunContext) -> Result<TransformationArtifact, StageError> {
    DataTransformer::new(ctx).initiate_transformation()
}

pub fn train(ctx: &RunContext) -> Result<ModelTrainerArtifact, StageError> {
    ModelTrainer::new(ctx).initiate_model_trainer()
}

/// Run the pipeline. Ingestion reads from `store`, or from the configured
/// store when `store` is `None`.
pub fn run(
    ctx: &RunContext,
    options: RunOptions,
    store: Option<&dyn DocumentStore>,
) -> Result<RunSummary, StageError> {
    let ingestion = if options.with_ingestion {
        let artifact = match store {
            Some(store) => ingest(ctx, store)?,
            None => {
                let store = open_configured_store(ctx, Stage::Ingestion)?;
                ingest(ctx, store.as_ref())?
            }
        };
        info!("data ingestion completed");
        Some(artifact)
    } else {
        None
    };

    let validation = validate(ctx)?;
    info!(drift_status = validation.drift_status, "data validation completed");

    let transformation = transform(ctx)?;
    info!("data transformation completed");

    let training = if options.with_training {
        let artifact = train(ctx)?;
        info!(
            model = %artifact.best_model,
            test_accuracy = artifact.test_accuracy,
            "model training completed"
        );
        Some(artifact)
    } else {
        None
    };

    Ok(RunSummary {
        ingestion,
        validation,
        transformation,
        training,
    })
}

/// Load a CSV file and insert its rows into `database.collection`.
pub fn push(
    store: Box<dyn DocumentStore>,
    csv: &Path,
    database: &str,
    collection: &str,
    batch_size: usize,
) -> Result<usize, StageError> {
    let records = NetworkDataHandler::csv_to_records(csv).stage(Stage::Push)?;
    NetworkDataHandler::new(store)
        .insert_records(&records, database, collection, batch_size)
        .stage(Stage::Push)
}

#[derive(Clone, Debug)]
pub struct PredictionArtifact {
    pub rows: usize,
    pub output_file: PathBuf,
}

/// Score a raw CSV file with the trained model and write it back with a
/// [`PREDICTION_COLUMN`] of decoded labels. A target column, if present, is
/// ignored for scoring and kept in the output.
pub fn predict(ctx: &RunContext, input: &Path, output: &Path) -> Result<PredictionArtifact, StageError> {
    let span = ctx.stage_span(Stage::Prediction);
    let _enter = span.enter();

    let config = ctx.config();
    let model = NetworkModel::load_from_file(&config.training.model_output).stage(Stage::Prediction)?;
    let data = Dataset::read_csv(input).stage(Stage::Prediction)?;
    let features = data.without_column(&config.training.target_columns);

    let (labels, _) = model.predict(&features).stage(Stage::Prediction)?;
    let scored = data
        .with_column(Column::categorical(PREDICTION_COLUMN, labels.into_iter().map(Some)))
        .stage(Stage::Prediction)?;
    scored.write_csv(output).stage(Stage::Prediction)?;
    info!(
        rows = scored.n_rows(),
        output = %output.display(),
        "predictions written"
    );

    Ok(PredictionArtifact {
        rows: scored.n_rows(),
        output_file: output.to_path_buf(),
    })
}
