//! Target encoding.
//!
//! ## LabelEncoder
//! Encodes target labels to integers (for classification targets). Labels
//! are handled as text, so numeric codes (`-1`, `1`) and names (`normal`,
//! `attack`) go through the same encoder.

mod label;

pub use label::{column_labels, FittedLabelEncoder, LabelEncoder, LabelEncoderParams};
