//! Prometheus Metrics Module
//!
//! Exposes application metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Refreshes**: Aggregator runs by trigger, skipped runs, run duration
//! - **Feeds**: Per-feed fetch failures by error kind
//! - **Events**: Dashboard events delivered and dropped by event name
//! - **Viewers**: Open connections and dashboard memberships
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the HTTP server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Subsequent calls return the handle created by the first one.
///
/// # Panics
///
/// Panics if another global metrics recorder is already installed.
#[allow(clippy::expect_used)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    // Refresh counters
    describe_counter!(
        "dashboard_ticker_refreshes_total",
        "Total ticker refreshes by trigger"
    );
    describe_counter!(
        "dashboard_ticker_refreshes_skipped_total",
        "Scheduled refreshes skipped because one was already running"
    );
    describe_counter!(
        "dashboard_ticker_refresh_failures_total",
        "Ticker refreshes that failed as a whole"
    );

    // Feed counters
    describe_counter!(
        "dashboard_ticker_feed_failures_total",
        "Feed fetches that contributed no items, by error kind"
    );

    // Event counters
    describe_counter!(
        "dashboard_ticker_events_sent_total",
        "Dashboard events queued to viewers"
    );
    describe_counter!(
        "dashboard_ticker_events_dropped_total",
        "Dashboard events dropped because a viewer queue was full"
    );

    // Viewer gauges
    describe_gauge!(
        "dashboard_ticker_connections",
        "Number of open viewer connections"
    );
    describe_gauge!(
        "dashboard_ticker_subscriptions",
        "Number of (connection, dashboard) memberships"
    );
    describe_gauge!(
        "dashboard_ticker_scheduler_period_seconds",
        "Current refresh scheduler period"
    );

    // Latency histograms
    describe_histogram!(
        "dashboard_ticker_refresh_duration_seconds",
        "Time to fetch, merge and publish one dashboard's ticker"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// What started a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// Recurring scheduler tick.
    Scheduled,
    /// Out-of-cycle request (feed or config change, API call).
    OnDemand,
}

impl RefreshTrigger {
    /// Label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::OnDemand => "on_demand",
        }
    }
}

/// Record a completed refresh and its duration.
pub fn record_refresh(trigger: RefreshTrigger, duration: Duration) {
    counter!(
        "dashboard_ticker_refreshes_total",
        "trigger" => trigger.as_str()
    )
    .increment(1);
    histogram!(
        "dashboard_ticker_refresh_duration_seconds",
        "trigger" => trigger.as_str()
    )
    .record(duration.as_secs_f64());
}

/// Record a scheduled refresh skipped because the dashboard was busy.
pub fn record_refresh_skipped() {
    counter!("dashboard_ticker_refreshes_skipped_total").increment(1);
}

/// Record a refresh that failed as a whole.
pub fn record_refresh_failure() {
    counter!("dashboard_ticker_refresh_failures_total").increment(1);
}

/// Record a feed that contributed no items.
pub fn record_feed_failure(error_type: &'static str) {
    counter!(
        "dashboard_ticker_feed_failures_total",
        "error_type" => error_type
    )
    .increment(1);
}

/// Record events queued to viewers.
pub fn record_events_sent(event: &'static str, count: u64) {
    counter!(
        "dashboard_ticker_events_sent_total",
        "event" => event
    )
    .increment(count);
}

/// Record events dropped because a viewer queue was full.
pub fn record_events_dropped(event: &'static str, count: u64) {
    counter!(
        "dashboard_ticker_events_dropped_total",
        "event" => event
    )
    .increment(count);
}

/// Update the open connection count.
#[allow(clippy::cast_precision_loss)]
pub fn set_connections(count: usize) {
    gauge!("dashboard_ticker_connections").set(count as f64);
}

/// Update the membership count.
#[allow(clippy::cast_precision_loss)]
pub fn set_subscriptions(count: usize) {
    gauge!("dashboard_ticker_subscriptions").set(count as f64);
}

/// Update the scheduler period.
pub fn set_scheduler_period(period: Duration) {
    gauge!("dashboard_ticker_scheduler_period_seconds").set(period.as_secs_f64());
}

// =============================================================================
// Tests
// =============================================================================
