use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

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
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
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

/// Register descriptions for the item cache counters. Safe to call repeatedly.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "stockroom_item_cache_hit_total",
            Unit::Count,
            "Item reads answered from the cache substrate."
        );
        describe_counter!(
            "stockroom_item_cache_miss_total",
            Unit::Count,
            "Item reads that fell through to the item store."
        );
        describe_counter!(
            "stockroom_item_cache_write_total",
            Unit::Count,
            "Item views written to the cache after a read miss or an update."
        );
        describe_counter!(
            "stockroom_item_cache_invalidate_total",
            Unit::Count,
            "Cache entries removed after an item was deleted."
        );
        describe_counter!(
            "stockroom_item_cache_evict_total",
            Unit::Count,
            "Entries evicted from the in-memory substrate due to capacity."
        );
        describe_counter!(
            "stockroom_item_cache_error_total",
            Unit::Count,
            "Cache substrate failures absorbed by the coordinator, labelled by op."
        );
    });
}
