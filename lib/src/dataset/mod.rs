//! Tabular datasets.
//!
//! A [`Dataset`] is an immutable table of named, typed [`Column`]s. It is
//! produced once by ingestion (CSV or document-store records) and consumed
//! by validation and transformation; those stages build new tables or
//! matrices instead of mutating it.
//!
//! # Example
//!
//! ```no_run
//! use netsentry::dataset::Dataset;
//!
//! let train = Dataset::read_csv("artifacts/train.csv")?;
//! let (features, target) = train.split_off("Result")?;
//! assert_eq!(features.n_rows(), target.len());
//! # Ok::<(), netsentry::dataset::DatasetError>(())
//! ```

mod column;
mod io;
mod records;

pub use column::{is_missing_token, Column, ColumnKind, ColumnValues, MISSING_TOKENS};
pub use records::Document;

use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building, reading or writing datasets.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("CSV error in {origin}: {source}")]
    Csv {
        origin: String,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("column {column} has {got} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        got: usize,
    },

    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("column not found: {0}")]
    ColumnNotFound(String),
}

/// Immutable table of typed columns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Dataset {
    /// Build a dataset, checking column lengths and name uniqueness.
    pub fn new(columns: Vec<Column>) -> Result<Self, DatasetError> {
        let n_rows = columns.first().map_or(0, Column::len);
        let mut seen = HashSet::new();
        for column in &columns {
            if column.len() != n_rows {
                return Err(DatasetError::LengthMismatch {
                    column: column.name().to_string(),
                    expected: n_rows,
                    got: column.len(),
                });
            }
            if !seen.insert(column.name()) {
                return Err(DatasetError::DuplicateColumn(column.name().to_string()));
            }
        }
        Ok(Self { columns, n_rows })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// A copy without the named column. Unknown names leave the table as is.
    pub fn without_column(&self, name: &str) -> Dataset {
        Dataset {
            columns: self
                .columns
                .iter()
                .filter(|c| c.name() != name)
                .cloned()
                .collect(),
            n_rows: self.n_rows,
        }
    }

    /// Split into `(features, target)` by removing the named column.
    pub fn split_off(&self, target: &str) -> Result<(Dataset, Column), DatasetError> {
        let column = self
            .column(target)
            .cloned()
            .ok_or_else(|| DatasetError::ColumnNotFound(target.to_string()))?;
        Ok((self.without_column(target), column))
    }

    /// A copy with `column` appended.
    pub fn with_column(&self, column: Column) -> Result<Dataset, DatasetError> {
        let mut columns = self.columns.clone();
        columns.push(column);
        Dataset::new(columns)
    }

    /// Rows picked by index, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Dataset {
        Dataset {
            columns: self.columns.iter().map(|c| c.select(rows)).collect(),
            n_rows: rows.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::new(vec![
            Column::float("duration", vec![1.0, 2.0, f64::NAN]),
            Column::categorical("protocol", [Some("tcp"), Some("udp"), None]),
            Column::categorical("label", [Some("normal"), Some("attack"), Some("normal")]),
        ])
        .unwrap()
    }

    #[test]
    fn test_new_rejects_ragged_columns() {
        let result = Dataset::new(vec![
            Column::float("a", vec![1.0, 2.0]),
            Column::float("b", vec![1.0]),
        ]);
        assert!(matches!(
            result,
            Err(DatasetError::LengthMismatch {
                expected: 2,
                got: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_new_rejects_duplicate_names() {
        let result = Dataset::new(vec![
            Column::float("a", vec![1.0]),
            Column::float("a", vec![2.0]),
        ]);
        assert!(matches!(result, Err(DatasetError::DuplicateColumn(_))));
    }

    #[test]
    fn test_split_off_target() {
        let (features, target) = sample().split_off("label").unwrap();
        assert_eq!(features.column_names(), vec!["duration", "protocol"]);
        assert_eq!(target.name(), "label");
        assert_eq!(target.len(), 3);
    }

    #[test]
    fn test_split_off_missing_target() {
        let result = sample().split_off("class");
        assert!(matches!(result, Err(DatasetError::ColumnNotFound(_))));
    }

    #[test]
    fn test_with_column_appends() {
        let extended = sample()
            .with_column(Column::categorical("prediction", [Some("a"), Some("b"), Some("c")]))
            .unwrap();
        assert_eq!(extended.column_names().last(), Some(&"prediction"));
        assert!(sample().with_column(Column::float("label", vec![0.0; 3])).is_err());
    }

    #[test]
    fn test_select_rows_keeps_schema() {
        let picked = sample().select_rows(&[1]);
        assert_eq!(picked.n_rows(), 1);
        assert_eq!(picked.n_columns(), 3);
        assert_eq!(
            picked.column("label").unwrap().render(0).as_deref(),
            Some("attack")
        );
    }
}
