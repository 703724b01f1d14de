use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::fetcher::{METRIC_FETCH_MS, METRIC_WINDOW_HIT, METRIC_WINDOW_MISS};
use crate::application::mutations::{METRIC_OPTIMISTIC_APPLY, METRIC_ROLLBACK};
use crate::cache::{METRIC_EVICT, METRIC_FETCH_DISCARDED, METRIC_RECONCILE_FAILED, METRIC_RECONCILE_MS};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register units and help text for every metric the crate emits.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_WINDOW_HIT,
            Unit::Count,
            "Page reads served from a fresh cached window."
        );
        describe_counter!(
            METRIC_WINDOW_MISS,
            Unit::Count,
            "Page reads that required a window fetch."
        );
        describe_histogram!(
            METRIC_FETCH_MS,
            Unit::Milliseconds,
            "Window fetch latency in milliseconds."
        );
        describe_counter!(
            METRIC_EVICT,
            Unit::Count,
            "Cached windows evicted due to capacity."
        );
        describe_counter!(
            METRIC_FETCH_DISCARDED,
            Unit::Count,
            "Fetch results discarded because a newer fetch or mutation superseded them."
        );
        describe_counter!(
            METRIC_OPTIMISTIC_APPLY,
            Unit::Count,
            "Optimistic mutations applied to the cache, labelled by kind."
        );
        describe_counter!(
            METRIC_ROLLBACK,
            Unit::Count,
            "Optimistic mutations rolled back after a server failure, labelled by kind."
        );
        describe_histogram!(
            METRIC_RECONCILE_MS,
            Unit::Milliseconds,
            "Reconcile pass latency in milliseconds."
        );
        describe_counter!(
            METRIC_RECONCILE_FAILED,
            Unit::Count,
            "Reconcile refetches that failed and kept the optimistic state."
        );
    });
}
