//! Per-run context.
//!
//! A [`RunContext`] is built once in `main` and passed by reference to every
//! stage. It carries the configuration, a run id that tags every log line of
//! the run, and the wall-clock start used for the final timing line.

use crate::config::{Configuration, PipelineConfig};
use crate::error::Stage;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use tracing::{info, info_span, Span};
use uuid::Uuid;

pub struct RunContext {
    configuration: Configuration,
    run_id: Uuid,
    started_at: DateTime<Utc>,
    clock: Instant,
}

impl RunContext {
    pub fn new(configuration: Configuration) -> Self {
        let ctx = Self {
            configuration,
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            clock: Instant::now(),
        };
        info!(
            run_id = %ctx.run_id,
            config = ctx.configuration.origin(),
            "run started"
        );
        ctx
    }

    /// Typed configuration sections.
    pub fn config(&self) -> &PipelineConfig {
        self.configuration.pipeline()
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Span for one stage; enter it for the duration of the stage.
    pub fn stage_span(&self, stage: Stage) -> Span {
        info_span!("stage", name = stage.name(), run_id = %self.run_id)
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Log the total run time and consume the context.
    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        info!(
            run_id = %self.run_id,
            elapsed_ms = elapsed.as_millis() as u64,
            "run finished"
        );
        elapsed
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over `level`.
pub fn init_tracing(level: &str) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| format!("{level},netsentry={level}"));
    // A second call, as in tests, leaves the first subscriber in place.
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::SAMPLE;

    #[test]
    fn test_context_exposes_config() {
        let ctx = RunContext::new(Configuration::from_yaml_str(SAMPLE).unwrap());
        assert_eq!(ctx.config().training.target_columns, "Result");
        assert!(ctx.started_at() <= Utc::now());
        assert_ne!(ctx.run_id(), Uuid::nil());
    }

    #[test]
    fn test_stage_span_enters() {
        init_tracing("debug");
        let ctx = RunContext::new(Configuration::from_yaml_str(SAMPLE).unwrap());
        let span = ctx.stage_span(Stage::Validation);
        let _guard = span.enter();
        info!("inside stage");
        let elapsed = ctx.finish();
        assert!(elapsed < Duration::from_secs(60));
    }
}
