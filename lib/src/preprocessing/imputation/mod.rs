//! Imputation transformers for handling missing values.
//!
//! | Transformer | Description |
//! |-------------|-------------|
//! | [`SimpleImputer`] | Impute with the column median |

pub mod simple;

pub use simple::{FittedSimpleImputer, SimpleImputer, SimpleImputerParams};
