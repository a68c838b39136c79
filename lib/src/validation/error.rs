//! Error types for validation and drift testing.

use crate::dataset::ColumnKind;
use thiserror::Error;

/// Structural problems with a dataset.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{dataset} dataframe does not contain all required columns: expected {expected}, found {actual}")]
    ColumnCount {
        dataset: String,
        expected: usize,
        actual: usize,
    },

    #[error("{dataset} dataframe has no column {column}")]
    MissingColumn { dataset: String, column: String },
}

/// Failures of the two-sample test itself.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatisticalError {
    #[error("column {column}: {side} sample has no non-missing values")]
    EmptySample { column: String, side: &'static str },

    #[error("column {column}: cannot compare {base} values with {current} values")]
    IncompatibleKinds {
        column: String,
        base: ColumnKind,
        current: ColumnKind,
    },
}
