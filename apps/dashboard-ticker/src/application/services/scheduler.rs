//! Refresh Scheduler
//!
//! Single recurring driver that keeps every enabled dashboard's ticker
//! within its staleness budget.
//!
//! # Lifecycle
//!
//! ```text
//!           start                 rearm (period changed)
//!   Idle ──────────► Running ◄──────────────┐
//!    ▲                  │  └─────────────────┘
//!    └──────────────────┘
//!           stop
//! ```
//!
//! The period is the smallest refresh interval among dashboards with the
//! ticker enabled and at least one feed, or the configured default when no
//! dashboard qualifies. The first tick fires as soon as the scheduler
//! starts. After a rearm the next tick lands one new period after the last
//! one, or right away if that moment has already passed.
//!
//! Refreshes started by a tick run as their own tasks. Replacing the timer
//! on rearm leaves them running; only [`RefreshScheduler::stop`] abandons
//! them.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::aggregator::TickerAggregator;
use super::error::TickerError;
use super::ticker_cache::TickerCache;
use crate::application::ports::TickerSource;
use crate::domain::dashboard::DashboardId;
use crate::infrastructure::metrics;

/// Upper bound on the slack applied when deciding whether a dashboard is
/// due.
///
/// A dashboard counts as due once its interval minus the slack has elapsed
/// since its last refresh started, so ticks landing a few milliseconds
/// early still pick it up. The slack is a tenth of the interval, capped at
/// this value.
pub const DUE_TOLERANCE: Duration = Duration::from_secs(1);

/// Time that must pass since the last refresh before a dashboard is due.
#[must_use]
pub fn due_after(interval: Duration) -> Duration {
    interval.saturating_sub((interval / 10).min(DUE_TOLERANCE))
}

/// Outcome of one scheduler tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Dashboards whose interval had elapsed.
    pub due: usize,
    /// Due dashboards refreshed successfully.
    pub refreshed: usize,
    /// Due dashboards skipped because a refresh was already running.
    pub skipped: usize,
    /// Due dashboards whose refresh failed.
    pub failed: usize,
}

// =============================================================================
// Scheduler Core
// =============================================================================

struct SchedulerCore {
    source: Arc<dyn TickerSource>,
    aggregator: Arc<TickerAggregator>,
    cache: Arc<TickerCache>,
    default_period: Duration,
    last_tick: Mutex<Option<Instant>>,
    /// Cancelled by `stop`; replaced so a restart begins with a live one.
    abandon: Mutex<CancellationToken>,
}

/// How one scheduled refresh ended.
enum Outcome {
    Refreshed,
    Busy,
    Failed(TickerError),
    Abandoned,
}

impl SchedulerCore {
    async fn period(&self) -> Duration {
        match self.source.minimum_enabled_refresh_interval().await {
            Ok(Some(interval)) => interval,
            Ok(None) => self.default_period,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read refresh intervals, using default period");
                self.default_period
            }
        }
    }

    async fn due_dashboards(&self) -> Result<Vec<DashboardId>, TickerError> {
        let candidates = self.source.list_ticker_enabled_with_feeds().await?;
        let now = Instant::now();
        let mut due = Vec::with_capacity(candidates.len());

        for dashboard in candidates {
            let config = match self.source.get_config(&dashboard).await {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(dashboard = %dashboard, error = %e, "Skipping dashboard");
                    continue;
                }
            };

            let budget = due_after(config.refresh_interval());
            let is_due = self
                .cache
                .last_refresh(&dashboard)
                .is_none_or(|last| now.saturating_duration_since(last) >= budget);

            if is_due {
                due.push(dashboard);
            }
        }

        Ok(due)
    }

    async fn tick(&self) -> TickReport {
        let due = match self.due_dashboards().await {
            Ok(due) => due,
            Err(e) => {
                tracing::warn!(error = %e, "Scheduler tick could not list dashboards");
                return TickReport::default();
            }
        };

        let mut report = TickReport {
            due: due.len(),
            ..TickReport::default()
        };

        if due.is_empty() {
            tracing::trace!("No dashboards due");
            return report;
        }

        // Detached tasks: dropping the handles, as an aborted loop does,
        // leaves the refreshes running.
        let abandon = self.abandon.lock().clone();
        let tasks = due.into_iter().map(|dashboard| {
            let aggregator = Arc::clone(&self.aggregator);
            let abandon = abandon.clone();
            tokio::spawn(async move {
                let outcome = tokio::select! {
                    () = abandon.cancelled() => Outcome::Abandoned,
                    refreshed = aggregator.try_refresh(&dashboard) => match refreshed {
                        Some(Ok(_)) => Outcome::Refreshed,
                        Some(Err(e)) => Outcome::Failed(e),
                        None => Outcome::Busy,
                    },
                };
                (dashboard, outcome)
            })
        });

        for joined in join_all(tasks.collect::<Vec<_>>()).await {
            match joined {
                Ok((_, Outcome::Refreshed)) => report.refreshed += 1,
                Ok((dashboard, Outcome::Busy)) => {
                    tracing::debug!(dashboard = %dashboard, "Refresh already running, skipped");
                    report.skipped += 1;
                }
                Ok((dashboard, Outcome::Failed(e))) => {
                    tracing::warn!(dashboard = %dashboard, error = %e, "Scheduled refresh failed");
                    report.failed += 1;
                }
                Ok((dashboard, Outcome::Abandoned)) => {
                    tracing::debug!(dashboard = %dashboard, "Scheduled refresh abandoned");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Scheduled refresh task panicked");
                    report.failed += 1;
                }
            }
        }

        tracing::debug!(
            due = report.due,
            refreshed = report.refreshed,
            skipped = report.skipped,
            failed = report.failed,
            "Scheduler tick complete"
        );
        report
    }

    /// When a rearmed loop should fire first.
    fn next_tick(&self, period: Duration) -> Instant {
        let now = Instant::now();
        let last = *self.last_tick.lock();
        last.map_or(now, |last| (last + period).max(now))
    }

    fn abandon_refreshes(&self) {
        let previous = std::mem::replace(&mut *self.abandon.lock(), CancellationToken::new());
        previous.cancel();
    }
}

// =============================================================================
// Refresh Scheduler
// =============================================================================

struct RunningLoop {
    period: Duration,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl RunningLoop {
    fn halt(self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

/// Owned recurring refresh driver.
pub struct RefreshScheduler {
    core: Arc<SchedulerCore>,
    running: Mutex<Option<RunningLoop>>,
}

impl RefreshScheduler {
    /// Create an idle scheduler.
    ///
    /// `default_period` is used whenever no dashboard qualifies for polling.
    #[must_use]
    pub fn new(
        source: Arc<dyn TickerSource>,
        aggregator: Arc<TickerAggregator>,
        cache: Arc<TickerCache>,
        default_period: Duration,
    ) -> Self {
        Self {
            core: Arc::new(SchedulerCore {
                source,
                aggregator,
                cache,
                default_period,
                last_tick: Mutex::new(None),
                abandon: Mutex::new(CancellationToken::new()),
            }),
            running: Mutex::new(None),
        }
    }

    /// Start ticking, replacing any loop already running.
    ///
    /// The first tick fires immediately. Returns the chosen period.
    pub async fn start(&self) -> Duration {
        let period = self.core.period().await;
        self.install(period, true);
        tracing::info!(period_ms = duration_ms(period), "Refresh scheduler started");
        period
    }

    /// Stop ticking. In-flight refreshes started by a tick are abandoned.
    pub fn stop(&self) {
        if let Some(running) = self.running.lock().take() {
            running.halt();
            self.core.abandon_refreshes();
            tracing::info!("Refresh scheduler stopped");
        }
    }

    /// Re-read the minimum interval and restart with it if it changed.
    ///
    /// Does nothing while idle. Refreshes already running are left alone.
    /// Returns the period in effect afterwards.
    pub async fn rearm(&self) -> Option<Duration> {
        let current = self.period()?;
        let wanted = self.core.period().await;

        if wanted == current {
            return Some(current);
        }

        // Stopped while the store was being read.
        if !self.is_running() {
            return None;
        }

        self.install(wanted, false);
        tracing::info!(
            from_ms = duration_ms(current),
            to_ms = duration_ms(wanted),
            "Refresh scheduler rearmed"
        );
        Some(wanted)
    }

    /// Whether the recurring loop is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Current period, `None` while idle.
    #[must_use]
    pub fn period(&self) -> Option<Duration> {
        self.running.lock().as_ref().map(|r| r.period)
    }

    /// Run one tick now, independently of the recurring loop.
    ///
    /// Refreshes every due dashboard concurrently and waits for them all.
    pub async fn tick(&self) -> TickReport {
        self.core.tick().await
    }

    fn install(&self, period: Duration, fire_immediately: bool) {
        let first = if fire_immediately {
            Instant::now()
        } else {
            self.core.next_tick(period)
        };
        let cancel = CancellationToken::new();
        let core = Arc::clone(&self.core);
        let handle = tokio::spawn(run_loop(core, first, period, cancel.clone()));

        metrics::set_scheduler_period(period);

        let previous = self.running.lock().replace(RunningLoop {
            period,
            cancel,
            handle,
        });
        if let Some(previous) = previous {
            previous.halt();
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.halt();
        }
        self.core.abandon_refreshes();
    }
}

async fn run_loop(
    core: Arc<SchedulerCore>,
    first: Instant,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval_at(first, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            fired = interval.tick() => {
                *core.last_tick.lock() = Some(fired);
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = core.tick() => {}
                }
            }
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// =============================================================================
// Tests
// =============================================================================
