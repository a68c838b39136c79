//! Crate-level error types.
//!
//! Every module owns a narrow error enum. [`PipelineError`] unifies them and
//! [`StageError`] tags a failure with the stage it came from, which is the
//! only context `main` reports.

use crate::config::ConfigError;
use crate::dataset::DatasetError;
use crate::model::ModelError;
use crate::preprocessing::PreprocessingError;
use crate::serialization::ArtifactError;
use crate::store::StoreError;
use crate::validation::{StatisticalError, ValidationError};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Any failure inside a pipeline stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Statistical(#[from] StatisticalError),

    #[error(transparent)]
    Preprocessing(#[from] PreprocessingError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to encode report {path}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Pipeline stages, used to locate failures and name tracing spans.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Ingestion,
    Validation,
    Transformation,
    Training,
    Push,
    Prediction,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Ingestion => "ingestion",
            Stage::Validation => "validation",
            Stage::Transformation => "transformation",
            Stage::Training => "training",
            Stage::Push => "push",
            Stage::Prediction => "prediction",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A [`PipelineError`] tagged with the stage that raised it.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: PipelineError,
}

impl StageError {
    pub fn new(stage: Stage, source: impl Into<PipelineError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}

/// Attach a stage to any error convertible into [`PipelineError`].
pub trait StageResultExt<T> {
    fn stage(self, stage: Stage) -> Result<T, StageError>;
}

impl<T, E: Into<PipelineError>> StageResultExt<T> for Result<T, E> {
    fn stage(self, stage: Stage) -> Result<T, StageError> {
        self.map_err(|e| StageError::new(stage, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_display() {
        let err = StageError::new(
            Stage::Validation,
            ValidationError::ColumnCount {
                dataset: "test".into(),
                expected: 40,
                actual: 39,
            },
        );
        let msg = err.to_string();
        assert!(msg.starts_with("validation stage failed: test dataframe"));
    }

    #[test]
    fn test_stage_ext_wraps_module_errors() {
        let result: Result<(), ConfigError> = Err(ConfigError::MissingSection("db".into()));
        let err = result.stage(Stage::Ingestion).unwrap_err();
        assert_eq!(err.stage, Stage::Ingestion);
        assert!(matches!(
            err.source,
            PipelineError::Config(ConfigError::MissingSection(_))
        ));
    }

    #[test]
    fn test_io_error_names_path() {
        let err = PipelineError::io(
            "/tmp/report.yaml",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/report.yaml"));
    }
}
