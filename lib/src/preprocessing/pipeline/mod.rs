//! Pipeline utilities for chaining transformers.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Pipeline`] | Chain transformers sequentially |

#[allow(clippy::module_inception)]
pub mod pipeline;

pub use pipeline::{
    FittedPipeline, Pipeline, PipelineParams, PipelineStep, PipelineStepEnum, PipelineStepParams,
};
