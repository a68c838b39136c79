//! Data preprocessing transformers.
//!
//! Transformers follow a two-phase API:
//!
//! - [`Transformer`]: unfitted, carries hyperparameters, learns from
//!   training data in `fit`.
//! - [`FittedTransformer`]: frozen learned parameters, ready for inference
//!   and serialization.
//!
//! # Available Transformers
//!
//! - [`SimpleImputer`]: fill missing values with the column median
//! - [`StandardScaler`]: z-score normalization
//! - [`Pipeline`]: chain transformers
//! - [`LabelEncoder`]: map target labels to `0..k`
//!
//! [`build_pipeline`] fits the numeric feature preprocessing on a
//! [`Dataset`](crate::dataset::Dataset) and [`DataTransformer`] runs the
//! whole transformation stage.
//!
//! # Example
//!
//! ```
//! use netsentry::dataset::{Column, Dataset};
//! use netsentry::preprocessing::build_pipeline;
//!
//! let train = Dataset::new(vec![
//!     Column::float("duration", vec![1.0, 2.0, f64::NAN, 4.0]),
//!     Column::categorical("protocol", [Some("tcp"), Some("udp"), Some("tcp"), None]),
//! ])?;
//! let fitted = build_pipeline(&train)?;
//! assert_eq!(fitted.columns(), &["duration"]);
//! let x = fitted.transform(&train)?;
//! assert_eq!(x.shape(), &[4, 1]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod encoding;
pub mod error;
pub mod imputation;
pub mod numeric;
pub mod pipeline;
pub mod scaling;
pub mod traits;
mod transformation;

pub use encoding::{column_labels, FittedLabelEncoder, LabelEncoder, LabelEncoderParams};
pub use error::PreprocessingError;
pub use imputation::{FittedSimpleImputer, SimpleImputer, SimpleImputerParams};
pub use numeric::{build_pipeline, FittedNumericPipeline, NumericPipelineParams};
pub use pipeline::{FittedPipeline, Pipeline, PipelineParams};
pub use scaling::{FittedStandardScaler, StandardScaler, StandardScalerParams};
pub use traits::{FittedTransformer, Transformer};
pub use transformation::{
    append_labels, split_target, DataTransformer, FittedTransformers, TransformationArtifact,
};
