use super::{FittedModel, ModelError};
use crate::dataset::Dataset;
use crate::preprocessing::{
    FittedLabelEncoder, FittedNumericPipeline, LabelEncoderParams, NumericPipelineParams,
};
use crate::serialization::{ArtifactError, ArtifactKind, ArtifactObject};
use serde::{Deserialize, Serialize};

/// Fitted preprocessing, classifier and label decoding bundled for
/// prediction on raw feature tables.
#[derive(Clone, Debug, PartialEq)]
pub struct NetworkModel {
    preprocessor: FittedNumericPipeline,
    model: FittedModel,
    encoder: FittedLabelEncoder,
}

impl NetworkModel {
    pub fn new(
        preprocessor: FittedNumericPipeline,
        model: FittedModel,
        encoder: FittedLabelEncoder,
    ) -> Result<Self, ModelError> {
        if model.n_features() != preprocessor.n_features() {
            return Err(ModelError::FeatureMismatch {
                expected: preprocessor.n_features(),
                got: model.n_features(),
            });
        }
        if model.n_classes() > encoder.n_classes() {
            return Err(ModelError::InvalidParameter(format!(
                "model predicts {} classes but the encoder knows {}",
                model.n_classes(),
                encoder.n_classes()
            )));
        }
        Ok(Self {
            preprocessor,
            model,
            encoder,
        })
    }

    pub fn preprocessor(&self) -> &FittedNumericPipeline {
        &self.preprocessor
    }

    pub fn model(&self) -> &FittedModel {
        &self.model
    }

    pub fn encoder(&self) -> &FittedLabelEncoder {
        &self.encoder
    }

    /// Transform raw features, predict, and decode.
    ///
    /// Returns `(labels, encoded)`, one entry per row.
    pub fn predict(&self, features: &Dataset) -> Result<(Vec<String>, Vec<usize>), ModelError> {
        let x = self.preprocessor.transform(features)?;
        let encoded = self.model.predict(&x)?;
        let labels = self.encoder.inverse_transform(&encoded)?;
        Ok((labels, encoded))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkModelPayload {
    pub preprocessor: NumericPipelineParams,
    pub model: FittedModel,
    pub encoder: LabelEncoderParams,
}

impl ArtifactObject for NetworkModel {
    const KIND: ArtifactKind = ArtifactKind::NetworkModel;
    type Payload = NetworkModelPayload;

    fn to_payload(&self) -> Self::Payload {
        NetworkModelPayload {
            preprocessor: self.preprocessor.extract_params(),
            model: self.model.clone(),
            encoder: self.encoder.extract_params(),
        }
    }

    fn from_payload(payload: Self::Payload) -> Result<Self, ArtifactError> {
        let corrupt = |e: &dyn std::fmt::Display| ArtifactError::Corrupt(e.to_string());
        let preprocessor =
            FittedNumericPipeline::from_params(payload.preprocessor).map_err(|e| corrupt(&e))?;
        let encoder = FittedLabelEncoder::from_params(payload.encoder).map_err(|e| corrupt(&e))?;
        payload.model.check_loaded()?;
        Self::new(preprocessor, payload.model, encoder).map_err(|e| corrupt(&e))
    }
}
