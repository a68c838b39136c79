//! Command-line interface.
//!
//! ```bash
//! netsentry run --with-training
//! netsentry validate --config config/config.yaml
//! netsentry push data/network.csv --database network_security --collection intrusion_records
//! netsentry predict data/new.csv --output predictions.csv
//! ```

use crate::config::{ConfigError, Configuration};
use crate::context::RunContext;
use crate::error::{Stage, StageError};
use crate::pipeline::{self, RunOptions};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Batch pipeline for network-intrusion data
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "netsentry")]
#[command(version)]
#[command(about = "Validate, transform and model network-intrusion records")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Pipeline configuration file
    #[arg(short, long, global = true, default_value = "config/config.yaml")]
    pub config: PathBuf,

    /// Log level used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Validate and transform, optionally ingesting first and training after
    Run(RunArgs),

    /// Pull the collection into the feature store and split it
    Ingest,

    /// Check the splits against the schema and test for drift
    Validate,

    /// Fit the preprocessing on the train split and transform both splits
    Transform,

    /// Train candidate models and save the best one
    Train,

    /// Insert the rows of a CSV file into the document store
    Push(PushArgs),

    /// Score a CSV file with the trained model
    Predict(PredictArgs),
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct RunArgs {
    #[arg(long)]
    pub with_ingestion: bool,

    #[arg(long)]
    pub with_training: bool,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct PushArgs {
    /// CSV file to load
    pub csv: PathBuf,

    /// Target database, defaults to `db.database`
    #[arg(long)]
    pub database: Option<String>,

    /// Target collection, defaults to `db.collection`
    #[arg(long)]
    pub collection: Option<String>,

    #[arg(long, default_value_t = 10_000)]
    pub batch_size: usize,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct PredictArgs {
    /// CSV file of raw records
    pub input: PathBuf,

    /// Where to write the scored records
    #[arg(short, long)]
    pub output: PathBuf,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Stage(#[from] StageError),
}

pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Load the configuration and execute the command.
pub fn run_command(cli: Cli) -> Result<(), CliError> {
    let ctx = RunContext::new(Configuration::load(&cli.config)?);

    match cli.command {
        Command::Run(args) => {
            let options = RunOptions {
                with_ingestion: args.with_ingestion,
                with_training: args.with_training,
            };
            let summary = pipeline::run(&ctx, options, None)?;
            if let Some(training) = &summary.training {
                info!(model = %training.best_model, path = %training.model_file.display(), "model ready");
            }
        }
        Command::Ingest => {
            let store = pipeline::open_configured_store(&ctx, Stage::Ingestion)?;
            pipeline::ingest(&ctx, store.as_ref())?;
        }
        Command::Validate => {
            pipeline::validate(&ctx)?;
        }
        Command::Transform => {
            pipeline::transform(&ctx)?;
        }
        Command::Train => {
            pipeline::train(&ctx)?;
        }
        Command::Push(args) => {
            let (database, collection) = push_target(&ctx, &args)?;
            let store = pipeline::open_configured_store(&ctx, Stage::Push)?;
            let inserted = pipeline::push(store, &args.csv, &database, &collection, args.batch_size)?;
            info!(inserted, database = %database, collection = %collection, "push finished");
        }
        Command::Predict(args) => {
            pipeline::predict(&ctx, &args.input, &args.output)?;
        }
    }

    ctx.finish();
    Ok(())
}

fn push_target(ctx: &RunContext, args: &PushArgs) -> Result<(String, String), ConfigError> {
    match (&args.database, &args.collection) {
        (Some(database), Some(collection)) => Ok((database.clone(), collection.clone())),
        (database, collection) => {
            let db = ctx.config().db()?;
            Ok((
                database.clone().unwrap_or_else(|| db.database.clone()),
                collection.clone().unwrap_or_else(|| db.collection.clone()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = parse_args(["netsentry", "validate"]).unwrap();
        assert_eq!(cli.command, Command::Validate);
        assert_eq!(cli.config, PathBuf::from("config/config.yaml"));
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_run_flags() {
        let cli = parse_args(["netsentry", "run", "--with-training", "--config", "c.yaml"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Run(RunArgs {
                with_ingestion: false,
                with_training: true
            })
        );
        assert_eq!(cli.config, PathBuf::from("c.yaml"));
    }

    #[test]
    fn test_push_args() {
        let cli = parse_args([
            "netsentry",
            "push",
            "data.csv",
            "--database",
            "network_security",
            "--batch-size",
            "500",
        ])
        .unwrap();
        match cli.command {
            Command::Push(args) => {
                assert_eq!(args.csv, PathBuf::from("data.csv"));
                assert_eq!(args.database.as_deref(), Some("network_security"));
                assert_eq!(args.collection, None);
                assert_eq!(args.batch_size, 500);
            }
            other => panic!("expected push, got {other:?}"),
        }
    }

    #[test]
    fn test_predict_requires_output() {
        assert!(parse_args(["netsentry", "predict", "in.csv"]).is_err());
        let cli = parse_args(["netsentry", "predict", "in.csv", "-o", "out.csv"]).unwrap();
        assert!(matches!(cli.command, Command::Predict(ref a) if a.output == PathBuf::from("out.csv")));
    }

    #[test]
    fn test_missing_config_file() {
        let cli = parse_args(["netsentry", "validate", "--config", "/nonexistent/netsentry.yaml"]).unwrap();
        assert!(matches!(
            run_command(cli),
            Err(CliError::Config(ConfigError::NotFound(_)))
        ));
    }
}
