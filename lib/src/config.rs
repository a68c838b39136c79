//! Pipeline configuration.
//!
//! The configuration is a YAML document with one section per stage:
//!
//! ```yaml
//! db:
//!   database: network_security
//!   collection: intrusion_records
//!   uri_env_key: MONGO_URI
//! file_paths:
//!   feature_store: artifacts/feature_store/network.csv
//!   train_data: artifacts/ingested/train.csv
//!   test_data: artifacts/ingested/test.csv
//! training:
//!   test_size: 0.2
//!   random_state: 42
//!   target_columns: Result
//!   model_output: artifacts/model/model.bin
//! validation:
//!   schema_file: config/schema.yaml
//!   report_file: artifacts/validation/drift_report.yaml
//!   drift_threshold: 0.05
//!   valid_train_file_path: artifacts/validation/train.csv
//!   valid_test_file_path: artifacts/validation/test.csv
//! transformation:
//!   transformed_train_data: artifacts/transformed/train.bin
//!   transformed_test_data: artifacts/transformed/test.bin
//!   transformer_object: artifacts/transformed/preprocessor.bin
//!   target_object: artifacts/transformed/target_encoder.bin
//! evaluation:
//!   evaluation_report: artifacts/evaluation/report.yaml
//! ```
//!
//! The document is parsed once into a typed [`PipelineConfig`] and also kept
//! raw so that any value can be looked up with [`Configuration::get`].

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading configuration or schema documents.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed document {origin}: {source}")]
    Malformed {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("malformed schema {origin}: {reason}")]
    MalformedSchema { origin: String, reason: String },

    #[error("missing configuration section: {0}")]
    MissingSection(String),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("environment variable {0} is not set")]
    MissingEnv(String),
}

/// Read a YAML file into a string, distinguishing "absent" from other I/O failures.
pub(crate) fn read_document(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound(path.to_path_buf())
        } else {
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// Document-store connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DbConfig {
    pub database: String,
    pub collection: String,
    /// Name of the environment variable that holds the store URI.
    pub uri_env_key: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FilePaths {
    pub feature_store: PathBuf,
    pub train_data: PathBuf,
    pub test_data: PathBuf,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    #[serde(default = "default_random_state")]
    pub random_state: u64,
    /// Name of the label column.
    pub target_columns: String,
    pub model_output: PathBuf,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub schema_file: PathBuf,
    pub report_file: PathBuf,
    #[serde(default = "default_drift_threshold")]
    pub drift_threshold: f64,
    pub valid_train_file_path: PathBuf,
    pub valid_test_file_path: PathBuf,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransformationConfig {
    pub transformed_train_data: PathBuf,
    pub transformed_test_data: PathBuf,
    pub transformer_object: PathBuf,
    pub target_object: PathBuf,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub evaluation_report: PathBuf,
}

/// Typed view of the whole configuration document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub db: Option<DbConfig>,
    pub file_paths: FilePaths,
    pub training: TrainingConfig,
    pub validation: ValidationConfig,
    pub transformation: TransformationConfig,
    pub evaluation: EvaluationConfig,
}

fn default_test_size() -> f64 {
    0.2
}

fn default_random_state() -> u64 {
    42
}

fn default_drift_threshold() -> f64 {
    0.05
}

impl PipelineConfig {
    /// Range checks that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_open_unit("training.test_size", self.training.test_size)?;
        check_open_unit("validation.drift_threshold", self.validation.drift_threshold)?;
        if self.training.target_columns.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "training.target_columns".into(),
                reason: "must name a column".into(),
            });
        }
        Ok(())
    }

    pub fn db(&self) -> Result<&DbConfig, ConfigError> {
        self.db
            .as_ref()
            .ok_or_else(|| ConfigError::MissingSection("db".into()))
    }
}

/// Check that a probability lies strictly between 0 and 1.
pub fn check_open_unit(key: &str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("{value} is not in (0, 1)"),
        })
    }
}

/// Loaded configuration: typed sections plus the raw document.
#[derive(Clone, Debug)]
pub struct Configuration {
    origin: String,
    raw: Value,
    pipeline: PipelineConfig,
}

impl Configuration {
    /// Load and validate a YAML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = read_document(path)?;
        Self::parse(&text, path.display().to_string())
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Self::parse(text, "<memory>".to_string())
    }

    fn parse(text: &str, origin: String) -> Result<Self, ConfigError> {
        let malformed = |source| ConfigError::Malformed {
            origin: origin.clone(),
            source,
        };
        let raw: Value = serde_yaml::from_str(text).map_err(malformed)?;
        let pipeline: PipelineConfig = serde_yaml::from_value(raw.clone()).map_err(malformed)?;
        pipeline.validate()?;
        Ok(Self {
            origin,
            raw,
            pipeline,
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn pipeline(&self) -> &PipelineConfig {
        &self.pipeline
    }

    pub fn section(&self, section: &str) -> Option<&Mapping> {
        self.raw.get(section).and_then(Value::as_mapping)
    }

    /// Raw value lookup: `get("validation", "drift_threshold")`.
    pub fn get(&self, section: &str, key: &str) -> Option<&Value> {
        self.section(section).and_then(|s| s.get(key))
    }

    /// Document-store URI, read from the environment variable named by
    /// `db.uri_env_key`.
    pub fn db_uri(&self) -> Result<String, ConfigError> {
        let key = &self.pipeline.db()?.uri_env_key;
        std::env::var(key).map_err(|_| ConfigError::MissingEnv(key.clone()))
    }
}
