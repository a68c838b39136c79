//! The ingestion stage: pull every record from the configured collection,
//! export it to the feature store and split it into train and test files.

use crate::config::ConfigError;
use crate::context::RunContext;
use crate::dataset::{Dataset, Document};
use crate::error::{PipelineError, Stage, StageError, StageResultExt};
use crate::store::{DocumentStore, StoreError, ID_FIELD};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing::info;

#[derive(Clone, Debug)]
pub struct IngestionArtifact {
    pub feature_store_file: PathBuf,
    pub train_file: PathBuf,
    pub test_file: PathBuf,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Shuffled train/test row indices.
///
/// The test split gets `ceil(test_size * n)` rows and the train split the
/// rest. The same seed always yields the same split.
pub fn train_test_indices(
    n: usize,
    test_size: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>), ConfigError> {
    let n_test = (test_size * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(ConfigError::InvalidValue {
            key: "training.test_size".to_string(),
            reason: format!("{test_size} leaves an empty split of {n} rows"),
        });
    }
    let mut rows: Vec<usize> = (0..n).collect();
    rows.shuffle(&mut StdRng::seed_from_u64(seed));
    let train = rows.split_off(n_test);
    Ok((train, rows))
}

pub struct DataIngestion<'a> {
    ctx: &'a RunContext,
    store: &'a dyn DocumentStore,
}

impl<'a> DataIngestion<'a> {
    pub fn new(ctx: &'a RunContext, store: &'a dyn DocumentStore) -> Self {
        Self { ctx, store }
    }

    /// Read the whole collection into a dataset, without the store's `_id`.
    pub fn read_collection(&self) -> Result<Dataset, PipelineError> {
        let db = self.ctx.config().db()?;
        let mut docs: Vec<Document> = self.store.find(&db.database, &db.collection, &Document::new())?;
        if docs.is_empty() {
            return Err(StoreError::EmptyCollection {
                database: db.database.clone(),
                collection: db.collection.clone(),
            }
            .into());
        }
        for doc in &mut docs {
            doc.remove(ID_FIELD);
        }
        let dataset = Dataset::from_records(&docs)?;
        info!(
            database = %db.database,
            collection = %db.collection,
            rows = dataset.n_rows(),
            columns = dataset.n_columns(),
            "collection read"
        );
        Ok(dataset)
    }

    pub fn initiate_ingestion(&self) -> Result<IngestionArtifact, StageError> {
        let span = self.ctx.stage_span(Stage::Ingestion);
        let _enter = span.enter();
        self.run().stage(Stage::Ingestion)
    }

    fn run(&self) -> Result<IngestionArtifact, PipelineError> {
        let config = self.ctx.config();
        let paths = &config.file_paths;

        let dataset = self.read_collection()?;
        dataset.write_csv(&paths.feature_store)?;
        info!(path = %paths.feature_store.display(), "feature store exported");

        let (train_rows, test_rows) = train_test_indices(
            dataset.n_rows(),
            config.training.test_size,
            config.training.random_state,
        )?;
        let train = dataset.select_rows(&train_rows);
        let test = dataset.select_rows(&test_rows);
        train.write_csv(&paths.train_data)?;
        test.write_csv(&paths.test_data)?;
        info!(
            train_rows = train.n_rows(),
            test_rows = test.n_rows(),
            train = %paths.train_data.display(),
            test = %paths.test_data.display(),
            "train and test splits written"
        );

        Ok(IngestionArtifact {
            feature_store_file: paths.feature_store.clone(),
            train_file: paths.train_data.clone(),
            test_file: paths.test_data.clone(),
            train_rows: train.n_rows(),
            test_rows: test.n_rows(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sizes() {
        let (train, test) = train_test_indices(10, 0.2, 42).unwrap();
        assert_eq!(test.len(), 2);
        assert_eq!(train.len(), 8);

        let (_, test) = train_test_indices(11, 0.2, 42).unwrap();
        assert_eq!(test.len(), 3);
    }

    #[test]
    fn test_split_is_a_partition() {
        let (train, test) = train_test_indices(25, 0.3, 7).unwrap();
        let mut all: Vec<usize> = train.iter().chain(&test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..25).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_seeded() {
        assert_eq!(
            train_test_indices(50, 0.2, 42).unwrap(),
            train_test_indices(50, 0.2, 42).unwrap()
        );
        assert_ne!(
            train_test_indices(50, 0.2, 42).unwrap(),
            train_test_indices(50, 0.2, 43).unwrap()
        );
    }

    #[test]
    fn test_split_needs_two_rows() {
        assert!(train_test_indices(1, 0.2, 0).is_err());
        assert!(train_test_indices(0, 0.2, 0).is_err());
    }
}
