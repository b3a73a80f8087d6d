//! Structured logging configuration.
//!
//! `init_logging` and `init_json_logging` wire up a `tracing_subscriber`
//! registry filtered by `RUST_LOG` (defaulting to `INFO`), mirroring the
//! conventions used across this crate's reference material. A span filter
//! silences the high-frequency reconciler replay span, which otherwise
//! floods logs at debug level whenever the order-consistency layer re-applies
//! a remote execution snapshot.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub const RECONCILER_REPLAY_SPAN_NAME: &str = "reconciler_replay";

/// Initializes human-readable logging.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(ReplaySpanFilter)
        .init()
}

/// Initializes JSON logging, suited to log aggregators.
pub fn init_json_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
        .with(ReplaySpanFilter)
        .init()
}

struct ReplaySpanFilter;

impl<S> tracing_subscriber::layer::Layer<S> for ReplaySpanFilter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn event_enabled(
        &self,
        _: &tracing::Event<'_>,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) -> bool {
        match ctx.lookup_current() {
            Some(span) => span.name() != RECONCILER_REPLAY_SPAN_NAME,
            None => true,
        }
    }
}
