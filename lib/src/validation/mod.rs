//! Structural validation and drift detection.
//!
//! Validation checks that each split has as many columns as the schema and
//! compares every training column with its test counterpart using a
//! two-sample Kolmogorov-Smirnov test.

mod drift;
mod error;
pub mod ks;
mod validator;

pub use drift::{detect_drift, write_drift_report, ColumnDrift, DriftReport};
pub use error::{StatisticalError, ValidationError};
pub use validator::{DataValidator, ValidationArtifact};

use crate::dataset::Dataset;
use crate::schema::Schema;
use tracing::info;

/// `true` iff the dataset has exactly as many columns as the schema.
pub fn validate_column_count(dataset: &Dataset, schema: &Schema) -> bool {
    info!(
        required = schema.len(),
        actual = dataset.n_columns(),
        "checking column count"
    );
    dataset.n_columns() == schema.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;
    use crate::schema::ColumnSpec;

    fn schema(n: usize) -> Schema {
        Schema::new(
            (0..n)
                .map(|i| ColumnSpec {
                    name: format!("c{i}"),
                    declared_type: Some("int64".into()),
                })
                .collect(),
        )
    }

    fn dataset(n: usize) -> Dataset {
        Dataset::new((0..n).map(|i| Column::float(format!("c{i}"), vec![1.0])).collect()).unwrap()
    }

    #[test]
    fn test_column_count_matches() {
        assert!(validate_column_count(&dataset(40), &schema(40)));
        assert!(!validate_column_count(&dataset(39), &schema(40)));
        assert!(!validate_column_count(&dataset(41), &schema(40)));
    }

    #[test]
    fn test_names_are_not_enforced() {
        let ds = Dataset::new(vec![Column::float("other", vec![1.0])]).unwrap();
        assert!(validate_column_count(&ds, &schema(1)));
    }
}
