//! Pushing raw CSV data into the document store.

use super::{DocumentStore, StoreError};
use crate::dataset::{Dataset, DatasetError, Document};
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

/// How often and how patiently a failed batch is retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

/// Loads CSV files and inserts them into a collection in batches.
#[derive(Debug)]
pub struct NetworkDataHandler {
    store: Box<dyn DocumentStore>,
    retry: RetryPolicy,
}

impl NetworkDataHandler {
    pub fn new(store: Box<dyn DocumentStore>) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Read a CSV file into one document per row.
    pub fn csv_to_records<P: AsRef<Path>>(path: P) -> Result<Vec<Document>, DatasetError> {
        let records = Dataset::read_csv(path.as_ref())?.to_records();
        info!(
            path = %path.as_ref().display(),
            records = records.len(),
            "converted CSV rows to records"
        );
        Ok(records)
    }

    /// Insert `records` in batches of `batch_size` and return how many were
    /// stored.
    ///
    /// A batch rejected for duplicate keys keeps its partial insert and is
    /// not retried. Any other failure is retried up to the policy's attempt
    /// count, sleeping between attempts; a batch that exhausts its attempts
    /// is skipped.
    pub fn insert_records(
        &self,
        records: &[Document],
        database: &str,
        collection: &str,
        batch_size: usize,
    ) -> Result<usize, StoreError> {
        if batch_size == 0 {
            return Err(StoreError::InvalidBatchSize);
        }
        let total_batches = records.len().div_ceil(batch_size);
        let mut total_inserted = 0;

        for (i, batch) in records.chunks(batch_size).enumerate() {
            let batch_no = i + 1;
            let mut attempt = 0;
            loop {
                match self.store.insert_many(database, collection, batch) {
                    Ok(inserted) => {
                        total_inserted += inserted;
                        info!(batch = batch_no, total_batches, inserted, "batch inserted");
                        break;
                    }
                    Err(StoreError::DuplicateKey {
                        inserted,
                        duplicates,
                    }) => {
                        total_inserted += inserted;
                        warn!(batch = batch_no, inserted, duplicates, "duplicate keys in batch");
                        break;
                    }
                    Err(e) => {
                        attempt += 1;
                        error!(batch = batch_no, attempt, "insert failed: {e}");
                        if attempt >= self.retry.max_attempts {
                            error!(
                                batch = batch_no,
                                "giving up on batch after {attempt} attempts"
                            );
                            break;
                        }
                        thread::sleep(self.retry.backoff);
                    }
                }
            }
        }

        info!(
            database,
            collection,
            total_inserted,
            "records pushed to store"
        );
        Ok(total_inserted)
    }
}
