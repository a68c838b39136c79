//! Benchmark utilities for netsentry.
//!
//! - Synthetic network-traffic tables with a controllable shift
//! - Timing helpers and summary statistics

pub mod data;
pub mod utils;

pub use data::SyntheticTraffic;
pub use utils::{benchmark_with_warmup, time_fn, BenchmarkStats};
