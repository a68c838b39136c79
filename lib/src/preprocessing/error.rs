//! Error types for preprocessing operations.

use crate::dataset::ColumnKind;
use thiserror::Error;

/// Error type for preprocessing operations.
#[derive(Debug, Error)]
pub enum PreprocessingError {
    /// Shape mismatch between expected and actual matrix dimensions.
    #[error("Invalid shape: expected {expected}, got {got}")]
    InvalidShape { expected: String, got: String },

    /// Invalid hyperparameter or argument value.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Empty data provided where non-empty was required.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Feature dimension mismatch.
    #[error("Feature mismatch: expected {expected_features} features, got {got_features}")]
    FeatureMismatch {
        expected_features: usize,
        got_features: usize,
    },

    /// A label that was not seen while fitting.
    #[error("Unknown category: {0:?} was not seen during fit")]
    UnknownCategory(String),

    /// A fitted column is absent from the input.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A fitted column is present but no longer numeric.
    #[error("Column {column} has kind {kind}, expected a numeric column")]
    InvalidColumnKind { column: String, kind: ColumnKind },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_shape() {
        let err = PreprocessingError::InvalidShape {
            expected: "(2, 3)".to_string(),
            got: "(3, 2)".to_string(),
        };
        assert!(err.to_string().contains("Invalid shape"));
    }

    #[test]
    fn test_error_display_empty_data() {
        let err = PreprocessingError::EmptyData("no rows".to_string());
        assert!(err.to_string().contains("Empty data"));
    }

    #[test]
    fn test_error_display_feature_mismatch() {
        let err = PreprocessingError::FeatureMismatch {
            expected_features: 5,
            got_features: 3,
        };
        assert_eq!(
            err.to_string(),
            "Feature mismatch: expected 5 features, got 3"
        );
    }

    #[test]
    fn test_error_display_unknown_category() {
        let err = PreprocessingError::UnknownCategory("unknown".to_string());
        assert!(err.to_string().contains("\"unknown\""));
    }

    #[test]
    fn test_error_display_invalid_kind() {
        let err = PreprocessingError::InvalidColumnKind {
            column: "protocol".to_string(),
            kind: ColumnKind::Categorical,
        };
        assert!(err.to_string().contains("categorical"));
    }

    #[test]
    fn test_error_is_std_error() {
        let err = PreprocessingError::InvalidParameter("test".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
