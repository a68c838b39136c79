//! Scaling transformers for feature normalization.
//!
//! | Transformer | Description |
//! |-------------|-------------|
//! | [`StandardScaler`] | Z-score normalization (mean=0, std=1) |

pub mod standard;

pub use standard::{FittedStandardScaler, StandardScaler, StandardScalerParams};
