//! # netsentry
//!
//! A batch pipeline for network-intrusion data. Records are pulled from a
//! document store, checked against a declarative schema, tested for drift
//! between the train and test splits, turned into numeric feature matrices
//! and used to train and select a classifier.
//!
//! ## Core Design Principles
//!
//! - **Fit/transform separation**: every transformer learns its statistics
//!   from the training split only; the fitted form is frozen and reused for
//!   test and inference data.
//! - **Typed columns**: a column's kind is inferred once when a table is
//!   read and carried with it, so later stages never re-guess types.
//! - **Explicit context**: configuration and the run id travel in a
//!   [`RunContext`] instead of global state.
//! - **Tagged artifacts**: fitted objects are persisted in a versioned
//!   envelope that names what it contains.
//!
//! ## Quick Start
//!
//! ```no_run
//! use netsentry::config::Configuration;
//! use netsentry::context::RunContext;
//! use netsentry::pipeline::{self, RunOptions};
//!
//! let ctx = RunContext::new(Configuration::load("config/config.yaml")?);
//! let options = RunOptions { with_ingestion: false, with_training: true };
//! let summary = pipeline::run(&ctx, options, None)?;
//! println!("drift free: {}", summary.validation.drift_status);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Module Structure
//!
//! - `cli` : command-line interface
//! - `config` : YAML configuration and typed sections
//! - `context` : per-run context and tracing setup
//! - `dataset` : typed tables, CSV and document conversion
//! - `schema` : declarative column schema
//! - `store` : document store backends and batched push
//! - `ingestion` : store to feature store and train/test split
//! - `validation` : column-count checks and KS drift detection
//! - `preprocessing` : imputation, scaling, label encoding, transformation stage
//! - `model` : classifiers and the deployable [`NetworkModel`](model::NetworkModel)
//! - `trainer` : grid search, model selection and persistence
//! - `metrics` : classification reports
//! - `serialization` : artifact envelope and matrix files
//! - `pipeline` : stage sequencing

/// Command-line interface of the `netsentry` binary.
pub mod cli;

/// Pipeline configuration.
pub mod config;

/// Per-run context and logging setup.
pub mod context;

/// Typed tabular data.
pub mod dataset;

/// Error types shared across stages.
pub mod error;

/// Reading records from the document store.
pub mod ingestion;

/// Classification metrics and evaluation reports.
pub mod metrics;

/// Classifiers and the deployable model bundle.
pub mod model;

/// Stage orchestration.
pub mod pipeline;

/// Data preprocessing transformers for ML pipelines.
pub mod preprocessing;

/// Declarative column schema.
pub mod schema;

/// Artifact persistence.
pub mod serialization;

/// Document store access.
pub mod store;

/// Model training and selection.
pub mod trainer;

/// Schema and drift validation.
pub mod validation;

pub use context::RunContext;
pub use error::{PipelineError, Stage, StageError};
