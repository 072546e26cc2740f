//! Shared fixtures for integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use dashboard_ticker::application::dto::{NewDashboard, NewFeed};
use dashboard_ticker::application::ports::{
    DashboardRepository, FeedFetcher, FetchError, TickerSource,
};
use dashboard_ticker::infrastructure::broadcast::EventReceiver;
use dashboard_ticker::{
    AppState, BroadcastGateway, DashboardId, EventEnvelope, FeedSource, InMemoryDashboardStore,
    RawEntry, TickerService, TickerSettings,
};

/// How one feed URL behaves when fetched.
#[derive(Debug, Clone)]
pub enum Script {
    Entries(Vec<RawEntry>),
    /// Answers with the entries after a pause.
    Delayed(Duration, Vec<RawEntry>),
    Fail,
    Hang,
}

/// Fetcher answering from per-URL scripts; unknown URLs yield no entries.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn script(&self, url: &str, script: Script) {
        self.scripts.lock().insert(url.to_string(), script);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Most fetches that were ever running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn answer(&self, url: &str) -> Result<Vec<RawEntry>, FetchError> {
        let script = self.scripts.lock().get(url).cloned();
        match script {
            Some(Script::Entries(entries)) => Ok(entries),
            Some(Script::Delayed(delay, entries)) => {
                tokio::time::sleep(delay).await;
                Ok(entries)
            }
            Some(Script::Fail) => Err(FetchError::Status { status: 500 }),
            Some(Script::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
            None => Ok(Vec::new()),
        }
    }
}

/// Decrements the in-flight count even when the fetch is cancelled.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl FeedFetcher for ScriptedFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<RawEntry>, FetchError> {
        self.calls.lock().push(source.url.clone());
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        self.answer(&source.url).await
    }
}

pub fn entry(guid: &str, title: &str, published: &str) -> RawEntry {
    RawEntry {
        guid: Some(guid.to_string()),
        link: Some(format!("https://news.example.com/{guid}")),
        title: Some(title.to_string()),
        published: Some(published.to_string()),
    }
}

/// Fully wired engine over the in-memory store.
pub struct Harness {
    pub store: Arc<InMemoryDashboardStore>,
    pub gateway: Arc<BroadcastGateway>,
    pub fetcher: Arc<ScriptedFetcher>,
    pub service: Arc<TickerService>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_buffer(64)
    }

    pub fn with_buffer(connection_buffer: usize) -> Self {
        let store = Arc::new(InMemoryDashboardStore::new());
        let gateway = Arc::new(BroadcastGateway::new(connection_buffer));
        let fetcher = Arc::new(ScriptedFetcher::default());
        let source: Arc<dyn TickerSource> = store.clone();

        let service = Arc::new(TickerService::new(
            source,
            fetcher.clone(),
            gateway.clone(),
            TickerSettings {
                fetch_timeout: Duration::from_millis(200),
                default_refresh_interval: Duration::from_secs(300),
            },
        ));

        Self {
            store,
            gateway,
            fetcher,
            service,
        }
    }

    pub fn app_state(&self) -> Arc<AppState> {
        let repository: Arc<dyn DashboardRepository> = self.store.clone();
        Arc::new(AppState::new(
            self.service.clone(),
            repository,
            self.gateway.clone(),
            CancellationToken::new(),
        ))
    }

    pub async fn create_dashboard(&self, id: &str) -> DashboardId {
        self.store
            .create_dashboard(NewDashboard {
                id: id.to_string(),
                name: Some(id.to_string()),
                description: None,
            })
            .await
            .unwrap()
            .id
    }

    pub async fn add_feed(&self, dashboard: &DashboardId, url: &str) -> FeedSource {
        self.store
            .create_feed(
                dashboard,
                NewFeed {
                    name: None,
                    url: url.to_string(),
                    logo: None,
                },
            )
            .await
            .unwrap()
    }
}

/// Next event for a connection, failing the test after two seconds.
pub async fn next_event(rx: &mut EventReceiver) -> EventEnvelope {
    let envelope = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("connection closed");
    (*envelope).clone()
}

/// Whether nothing is queued for a connection.
pub fn is_drained(rx: &mut EventReceiver) -> bool {
    rx.try_recv().is_err()
}
