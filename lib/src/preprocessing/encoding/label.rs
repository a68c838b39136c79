//! Label encoding for target labels.
//!
//! Maps target labels to integer indices (0, 1, 2, ...).

use crate::dataset::Column;
use crate::preprocessing::error::PreprocessingError;
use crate::serialization::{ArtifactError, ArtifactKind, ArtifactObject};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Label encoder for a single target column.
///
/// Classes are the distinct training labels in sorted order. When every
/// label parses as a number they are ordered numerically (so `-1` comes
/// before `1`), otherwise lexicographically.
///
/// # Example
/// ```
/// use netsentry::preprocessing::LabelEncoder;
///
/// let fitted = LabelEncoder::new().fit(&["normal", "attack", "normal"]).unwrap();
/// assert_eq!(fitted.classes(), &["attack", "normal"]);
/// assert_eq!(fitted.transform(&["normal"]).unwrap(), vec![1]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct LabelEncoder;

impl LabelEncoder {
    /// Create a new LabelEncoder.
    pub fn new() -> Self {
        Self
    }

    /// Fit the encoder to the labels and return the fitted encoder.
    pub fn fit<S: AsRef<str>>(&self, labels: &[S]) -> Result<FittedLabelEncoder, PreprocessingError> {
        if labels.is_empty() {
            return Err(PreprocessingError::EmptyData(
                "Cannot fit LabelEncoder on empty data".to_string(),
            ));
        }

        let distinct: BTreeSet<&str> = labels.iter().map(AsRef::as_ref).collect();
        let mut classes: Vec<String> = distinct.into_iter().map(str::to_string).collect();
        sort_classes(&mut classes);

        Ok(FittedLabelEncoder::with_classes(classes))
    }

    /// Fit and transform in one step.
    pub fn fit_transform<S: AsRef<str>>(
        &self,
        labels: &[S],
    ) -> Result<(FittedLabelEncoder, Vec<usize>), PreprocessingError> {
        let fitted = self.fit(labels)?;
        let encoded = fitted.transform(labels)?;
        Ok((fitted, encoded))
    }
}

/// Numeric order when every class is a number, lexicographic otherwise.
fn sort_classes(classes: &mut [String]) {
    let numeric: Option<Vec<f64>> = classes.iter().map(|c| c.trim().parse().ok()).collect();
    if let Some(values) = numeric {
        let mut paired: Vec<(f64, String)> = values.into_iter().zip(classes.iter().cloned()).collect();
        paired.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        for (slot, (_, class)) in classes.iter_mut().zip(paired) {
            *slot = class;
        }
    } else {
        classes.sort();
    }
}

/// Serializable parameters for a fitted LabelEncoder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoderParams {
    /// Unique classes in sorted order.
    pub classes: Vec<String>,
}

/// Fitted LabelEncoder ready for inference.
#[derive(Clone, Debug, PartialEq)]
pub struct FittedLabelEncoder {
    /// Unique classes in sorted order.
    classes: Vec<String>,
    /// Mapping from class to index.
    class_to_idx: HashMap<String, usize>,
}

impl FittedLabelEncoder {
    fn with_classes(classes: Vec<String>) -> Self {
        let class_to_idx = classes
            .iter()
            .enumerate()
            .map(|(idx, class)| (class.clone(), idx))
            .collect();
        Self {
            classes,
            class_to_idx,
        }
    }

    /// Get the unique classes.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Get the number of classes.
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Index of one label.
    pub fn encode(&self, label: &str) -> Result<usize, PreprocessingError> {
        self.class_to_idx
            .get(label)
            .copied()
            .ok_or_else(|| PreprocessingError::UnknownCategory(label.to_string()))
    }

    /// Transform labels to encoded indices.
    pub fn transform<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<usize>, PreprocessingError> {
        labels.iter().map(|l| self.encode(l.as_ref())).collect()
    }

    /// Inverse transform encoded indices back to original labels.
    pub fn inverse_transform(&self, indices: &[usize]) -> Result<Vec<String>, PreprocessingError> {
        indices
            .iter()
            .map(|&idx| {
                self.classes.get(idx).cloned().ok_or_else(|| {
                    PreprocessingError::InvalidParameter(format!(
                        "Index {} out of bounds ({} classes)",
                        idx,
                        self.classes.len()
                    ))
                })
            })
            .collect()
    }

    /// Extract parameters for serialization.
    pub fn extract_params(&self) -> LabelEncoderParams {
        LabelEncoderParams {
            classes: self.classes.clone(),
        }
    }

    /// Reconstruct from parameters.
    pub fn from_params(params: LabelEncoderParams) -> Result<Self, PreprocessingError> {
        if params.classes.is_empty() {
            return Err(PreprocessingError::EmptyData(
                "LabelEncoder needs at least one class".to_string(),
            ));
        }
        let fitted = Self::with_classes(params.classes);
        if fitted.class_to_idx.len() != fitted.classes.len() {
            return Err(PreprocessingError::InvalidParameter(
                "LabelEncoder classes must be distinct".to_string(),
            ));
        }
        Ok(fitted)
    }
}

impl ArtifactObject for FittedLabelEncoder {
    const KIND: ArtifactKind = ArtifactKind::Encoder;
    type Payload = LabelEncoderParams;

    fn to_payload(&self) -> Self::Payload {
        self.extract_params()
    }

    fn from_payload(payload: Self::Payload) -> Result<Self, ArtifactError> {
        Self::from_params(payload).map_err(|e| ArtifactError::Corrupt(e.to_string()))
    }
}

/// Target cells rendered as labels. Missing cells are rejected.
pub fn column_labels(column: &Column) -> Result<Vec<String>, PreprocessingError> {
    (0..column.len())
        .map(|row| {
            column.render(row).ok_or_else(|| {
                PreprocessingError::InvalidParameter(format!(
                    "target column {} has a missing value at row {}",
                    column.name(),
                    row
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_encoder_basic() {
        let labels = ["normal", "attack", "normal"];
        let fitted = LabelEncoder::new().fit(&labels).unwrap();

        assert_eq!(fitted.n_classes(), 2);
        assert_eq!(fitted.classes(), &["attack", "normal"]);
        assert_eq!(fitted.transform(&labels).unwrap(), vec![1, 0, 1]);
    }

    #[test]
    fn test_label_encoder_numeric_order() {
        let labels = ["1", "-1", "10", "2"];
        let fitted = LabelEncoder::new().fit(&labels).unwrap();
        assert_eq!(fitted.classes(), &["-1", "1", "2", "10"]);
    }

    #[test]
    fn test_label_encoder_inverse() {
        let labels = ["dos", "probe", "normal", "dos"];
        let (fitted, encoded) = LabelEncoder::new().fit_transform(&labels).unwrap();
        let recovered = fitted.inverse_transform(&encoded).unwrap();
        assert_eq!(recovered, labels);
    }

    #[test]
    fn test_label_encoder_unknown_error() {
        let fitted = LabelEncoder::new().fit(&["normal", "attack"]).unwrap();
        assert!(matches!(
            fitted.transform(&["unknown"]),
            Err(PreprocessingError::UnknownCategory(label)) if label == "unknown"
        ));
    }

    #[test]
    fn test_label_encoder_inverse_out_of_range() {
        let fitted = LabelEncoder::new().fit(&["a", "b"]).unwrap();
        assert!(fitted.inverse_transform(&[2]).is_err());
    }

    #[test]
    fn test_label_encoder_params_roundtrip() {
        let fitted = LabelEncoder::new().fit(&["b", "a", "c"]).unwrap();
        let loaded = FittedLabelEncoder::from_params(fitted.extract_params()).unwrap();
        assert_eq!(loaded, fitted);
    }

    #[test]
    fn test_label_encoder_artifact_kind() {
        let fitted = LabelEncoder::new().fit(&["normal", "attack"]).unwrap();
        let bytes = fitted.to_artifact_bytes().unwrap();
        assert_eq!(FittedLabelEncoder::from_artifact_bytes(&bytes).unwrap(), fitted);

        let as_pipeline = crate::preprocessing::FittedNumericPipeline::from_artifact_bytes(&bytes);
        assert!(matches!(as_pipeline, Err(ArtifactError::KindMismatch { .. })));
    }

    #[test]
    fn test_label_encoder_rejects_duplicate_params() {
        let params = LabelEncoderParams {
            classes: vec!["a".into(), "a".into()],
        };
        assert!(FittedLabelEncoder::from_params(params).is_err());
    }

    #[test]
    fn test_label_encoder_empty_data() {
        let labels: [&str; 0] = [];
        assert!(LabelEncoder::new().fit(&labels).is_err());
    }

    #[test]
    fn test_column_labels() {
        let col = Column::integer("Result", vec![Some(-1), Some(1)]);
        assert_eq!(column_labels(&col).unwrap(), vec!["-1", "1"]);

        let missing = Column::categorical("label", [Some("x"), None]);
        assert!(column_labels(&missing).is_err());
    }
}
