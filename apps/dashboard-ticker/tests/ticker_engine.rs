//! Ticker Engine Integration Tests
//!
//! Aggregation, caching and broadcast across the in-memory store, the
//! broadcast gateway and scripted or HTTP-served feeds.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{Harness, Script, entry, is_drained, next_event};
use dashboard_ticker::application::dto::NewContent;
use dashboard_ticker::application::ports::{DashboardRepository, TickerSource};
use dashboard_ticker::{ConfigUpdate, DashboardEvent, DashboardId, TickerItem};

fn titles(items: &[TickerItem]) -> Vec<&str> {
    items.iter().map(|i| i.title.as_str()).collect()
}

fn ticker_of(event: &DashboardEvent) -> &[TickerItem] {
    match event {
        DashboardEvent::Ticker(items) => items,
        other => panic!("expected ticker:update, got {}", other.name()),
    }
}

#[tokio::test]
async fn timed_out_feed_does_not_block_the_others() {
    let h = Harness::new();
    let lobby = h.create_dashboard("lobby").await;
    h.add_feed(&lobby, "https://a.example.com/rss").await;
    h.add_feed(&lobby, "https://b.example.com/rss").await;

    h.fetcher.script(
        "https://a.example.com/rss",
        Script::Entries(vec![
            entry("a1", "A one", "2024-03-01T10:00:00Z"),
            entry("a2", "A two", "2024-03-01T12:00:00Z"),
            entry("a3", "A three", "2024-03-01T11:00:00Z"),
        ]),
    );
    h.fetcher.script("https://b.example.com/rss", Script::Hang);

    let (conn, mut rx) = h.gateway.connect();
    h.service.subscribe(conn, &lobby).await.unwrap();
    for _ in 0..3 {
        next_event(&mut rx).await;
    }

    let items = tokio::time::timeout(Duration::from_secs(2), h.service.refresh_now(&lobby))
        .await
        .expect("refresh must finish within the fetch timeout")
        .unwrap();

    assert_eq!(titles(&items), vec!["A two", "A three", "A one"]);
    assert_eq!(h.service.current_ticker_items(&lobby), items);

    let pushed = next_event(&mut rx).await;
    assert_eq!(pushed.dashboard, lobby);
    assert_eq!(ticker_of(&pushed.event), items.as_slice());
}

#[tokio::test]
async fn failing_feed_is_skipped() {
    let h = Harness::new();
    let lobby = h.create_dashboard("lobby").await;
    h.add_feed(&lobby, "https://ok.example.com/rss").await;
    h.add_feed(&lobby, "https://down.example.com/rss").await;

    h.fetcher.script(
        "https://ok.example.com/rss",
        Script::Entries(vec![entry("x", "Still here", "2024-03-01T10:00:00Z")]),
    );
    h.fetcher.script("https://down.example.com/rss", Script::Fail);

    let items = h.service.refresh_now(&lobby).await.unwrap();
    assert_eq!(titles(&items), vec!["Still here"]);
}

#[tokio::test]
async fn max_items_keeps_only_the_newest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/news.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<?xml version="1.0"?>
            <rss version="2.0"><channel><title>News</title>
              <item><title>Old</title><guid>1</guid><pubDate>Mon, 01 Jan 2024 08:00:00 GMT</pubDate></item>
              <item><title>Newest</title><guid>2</guid><pubDate>Mon, 01 Jan 2024 12:00:00 GMT</pubDate></item>
              <item><title>Middle</title><guid>3</guid><pubDate>Mon, 01 Jan 2024 10:00:00 GMT</pubDate></item>
            </channel></rss>"#,
        ))
        .mount(&server)
        .await;

    let store = std::sync::Arc::new(dashboard_ticker::InMemoryDashboardStore::new());
    let gateway = std::sync::Arc::new(dashboard_ticker::BroadcastGateway::new(16));
    let fetcher = std::sync::Arc::new(
        dashboard_ticker::HttpFeedFetcher::new("dashboard-ticker/test", Duration::from_secs(5))
            .unwrap(),
    );
    let service = dashboard_ticker::TickerService::new(
        store.clone(),
        fetcher,
        gateway,
        dashboard_ticker::TickerSettings::default(),
    );

    let default = DashboardId::default_dashboard();
    store
        .update_config(
            &default,
            ConfigUpdate {
                max_ticker_items: Some(1),
                ..ConfigUpdate::default()
            },
        )
        .await
        .unwrap();
    store
        .create_feed(
            &default,
            dashboard_ticker::application::dto::NewFeed {
                name: Some("News".to_string()),
                url: format!("{}/news.xml", server.uri()),
                logo: None,
            },
        )
        .await
        .unwrap();

    let items = service.refresh_now(&default).await.unwrap();

    assert_eq!(titles(&items), vec!["Newest"]);
    assert_eq!(items[0].feed_name, "News");
}

#[tokio::test]
async fn disabling_the_ticker_broadcasts_an_empty_list() {
    let h = Harness::new();
    let lobby = h.create_dashboard("lobby").await;
    h.add_feed(&lobby, "https://a.example.com/rss").await;
    h.fetcher.script(
        "https://a.example.com/rss",
        Script::Entries(vec![entry("a1", "A one", "2024-03-01T10:00:00Z")]),
    );
    h.service.refresh_now(&lobby).await.unwrap();

    let (conn, mut rx) = h.gateway.connect();
    h.service.subscribe(conn, &lobby).await.unwrap();
    let replay = next_event(&mut rx).await;
    assert_eq!(ticker_of(&replay.event).len(), 1);
    next_event(&mut rx).await;
    next_event(&mut rx).await;

    let update = ConfigUpdate {
        ticker_enabled: Some(false),
        ..ConfigUpdate::default()
    };
    let config = h.store.update_config(&lobby, update).await.unwrap();
    h.service
        .on_config_changed(&lobby, &update, &config)
        .await
        .unwrap();

    assert!(ticker_of(&next_event(&mut rx).await.event).is_empty());
    match next_event(&mut rx).await.event {
        DashboardEvent::Config(pushed) => assert!(!pushed.ticker_enabled),
        other => panic!("expected config:update, got {}", other.name()),
    }
    assert!(h.service.current_ticker_items(&lobby).is_empty());
}

#[tokio::test]
async fn back_to_back_refreshes_see_the_latest_feed_set() {
    let h = Harness::new();
    let lobby = h.create_dashboard("lobby").await;
    h.add_feed(&lobby, "https://a.example.com/rss").await;
    h.fetcher.script(
        "https://a.example.com/rss",
        Script::Entries(vec![entry("a1", "A one", "2024-03-01T10:00:00Z")]),
    );
    h.fetcher.script(
        "https://b.example.com/rss",
        Script::Entries(vec![entry("b1", "B one", "2024-03-01T11:00:00Z")]),
    );

    let service = h.service.clone();
    let target = lobby.clone();
    let first = tokio::spawn(async move { service.refresh_now(&target).await });
    h.add_feed(&lobby, "https://b.example.com/rss").await;
    let second = h.service.refresh_now(&lobby).await.unwrap();
    first.await.unwrap().unwrap();

    assert_eq!(titles(&second), vec!["B one", "A one"]);
    assert_eq!(titles(&h.service.current_ticker_items(&lobby)), vec!["B one", "A one"]);
}

#[tokio::test]
async fn subscribe_replays_ticker_content_then_config() {
    let h = Harness::new();
    let lobby = h.create_dashboard("lobby").await;
    h.store
        .create_content(
            &lobby,
            NewContent {
                url: "https://intranet.example.com/menu".to_string(),
                title: Some("Menu".to_string()),
                kind: None,
            },
        )
        .await
        .unwrap();

    let (conn, mut rx) = h.gateway.connect();
    tokio_test::assert_ok!(h.service.subscribe(conn, &lobby).await);

    let names: Vec<&str> = [
        next_event(&mut rx).await,
        next_event(&mut rx).await,
        next_event(&mut rx).await,
    ]
    .iter()
    .map(|e| e.event.name())
    .collect();
    assert_eq!(names, vec!["ticker:update", "content:update", "config:update"]);
    assert!(is_drained(&mut rx));
}

#[tokio::test]
async fn unknown_dashboard_subscribe_reports_error_to_requester_only() {
    let h = Harness::new();
    let ghost = DashboardId::new("ghost");

    let (conn, mut rx) = h.gateway.connect();
    tokio_test::assert_err!(h.service.subscribe(conn, &ghost).await);

    let event = next_event(&mut rx).await;
    assert_eq!(event.dashboard, ghost);
    assert_eq!(event.event, DashboardEvent::load_failed());
    assert!(h.gateway.viewers(&ghost).is_empty());
}

#[tokio::test]
async fn events_stay_within_their_dashboard() {
    let h = Harness::new();
    let lobby = h.create_dashboard("lobby").await;
    let kitchen = h.create_dashboard("kitchen").await;
    h.add_feed(&kitchen, "https://k.example.com/rss").await;
    h.fetcher.script(
        "https://k.example.com/rss",
        Script::Entries(vec![entry("k1", "Kitchen news", "2024-03-01T10:00:00Z")]),
    );

    let (lobby_conn, mut lobby_rx) = h.gateway.connect();
    h.service.subscribe(lobby_conn, &lobby).await.unwrap();
    for _ in 0..3 {
        next_event(&mut lobby_rx).await;
    }

    let (kitchen_conn, mut kitchen_rx) = h.gateway.connect();
    h.service.subscribe(kitchen_conn, &kitchen).await.unwrap();
    for _ in 0..3 {
        next_event(&mut kitchen_rx).await;
    }

    h.service.refresh_now(&kitchen).await.unwrap();
    h.service.publish_content(&kitchen).await.unwrap();

    assert_eq!(next_event(&mut kitchen_rx).await.event.name(), "ticker:update");
    assert_eq!(next_event(&mut kitchen_rx).await.event.name(), "content:update");
    assert!(is_drained(&mut lobby_rx));
    assert!(h.service.current_ticker_items(&lobby).is_empty());
}

#[tokio::test]
async fn stalled_viewer_does_not_block_others() {
    let h = Harness::with_buffer(1);
    let lobby = h.create_dashboard("lobby").await;

    let (stalled, _stalled_rx) = h.gateway.connect();
    let (reader, mut reader_rx) = h.gateway.connect();
    h.service.subscribe(stalled, &lobby).await.unwrap();
    h.service.subscribe(reader, &lobby).await.unwrap();
    while reader_rx.try_recv().is_ok() {}

    for _ in 0..5 {
        h.service.publish_content(&lobby).await.unwrap();
        assert_eq!(next_event(&mut reader_rx).await.event.name(), "content:update");
    }

    assert!(h.gateway.is_connected(stalled));
}

#[tokio::test]
async fn deleting_a_dashboard_empties_its_ticker() {
    let h = Harness::new();
    let lobby = h.create_dashboard("lobby").await;
    h.add_feed(&lobby, "https://a.example.com/rss").await;
    h.fetcher.script(
        "https://a.example.com/rss",
        Script::Entries(vec![entry("a1", "A one", "2024-03-01T10:00:00Z")]),
    );
    h.service.refresh_now(&lobby).await.unwrap();
    assert_eq!(h.service.current_ticker_items(&lobby).len(), 1);

    h.store.delete_dashboard(&lobby).await.unwrap();
    h.service.on_dashboard_deleted(&lobby).await;

    assert!(h.service.current_ticker_items(&lobby).is_empty());
    assert!(h.store.list_feed_sources(&lobby).await.unwrap().is_empty());
}

#[tokio::test]
async fn scheduler_tick_refreshes_due_dashboards() {
    let h = Harness::new();
    let lobby = h.create_dashboard("lobby").await;
    let idle = h.create_dashboard("idle").await;
    h.add_feed(&lobby, "https://a.example.com/rss").await;
    h.fetcher.script(
        "https://a.example.com/rss",
        Script::Entries(vec![entry("a1", "A one", "2024-03-01T10:00:00Z")]),
    );

    let report = h.service.scheduler().tick().await;
    assert_eq!(report.due, 1);
    assert_eq!(report.refreshed, 1);
    assert_eq!(h.service.current_ticker_items(&lobby).len(), 1);
    assert!(h.service.current_ticker_items(&idle).is_empty());

    let again = h.service.scheduler().tick().await;
    assert_eq!(again.due, 0);
    assert_eq!(h.fetcher.calls().len(), 1);
}

#[tokio::test]
async fn timed_out_feed_drops_its_previous_items() {
    let h = Harness::new();
    let lobby = h.create_dashboard("lobby").await;
    h.add_feed(&lobby, "https://a.example.com/rss").await;
    h.add_feed(&lobby, "https://b.example.com/rss").await;
    h.fetcher.script(
        "https://a.example.com/rss",
        Script::Entries(vec![
            entry("a1", "A one", "2024-03-01T10:00:00Z"),
            entry("a2", "A two", "2024-03-01T12:00:00Z"),
        ]),
    );
    h.fetcher.script(
        "https://b.example.com/rss",
        Script::Entries(vec![entry("b1", "B one", "2024-03-01T11:00:00Z")]),
    );

    let first = h.service.refresh_now(&lobby).await.unwrap();
    assert_eq!(titles(&first), vec!["A two", "B one", "A one"]);

    h.fetcher.script("https://b.example.com/rss", Script::Hang);
    let second = h.service.refresh_now(&lobby).await.unwrap();

    assert_eq!(titles(&second), vec!["A two", "A one"]);
    assert_eq!(h.service.current_ticker_items(&lobby), second);
}

#[tokio::test]
async fn clear_while_fetching_keeps_the_ticker_empty() {
    let h = Harness::new();
    let lobby = h.create_dashboard("lobby").await;
    h.add_feed(&lobby, "https://a.example.com/rss").await;
    h.fetcher.script(
        "https://a.example.com/rss",
        Script::Delayed(
            Duration::from_millis(150),
            vec![entry("a1", "A one", "2024-03-01T10:00:00Z")],
        ),
    );

    let (conn, mut rx) = h.gateway.connect();
    h.service.subscribe(conn, &lobby).await.unwrap();
    for _ in 0..3 {
        next_event(&mut rx).await;
    }

    let service = h.service.clone();
    let target = lobby.clone();
    let refreshing = tokio::spawn(async move { service.refresh_now(&target).await });
    while h.fetcher.calls().is_empty() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    h.service.clear_ticker(&lobby);

    let items = refreshing.await.unwrap().unwrap();

    assert!(items.is_empty());
    assert!(h.service.current_ticker_items(&lobby).is_empty());
    assert!(ticker_of(&next_event(&mut rx).await.event).is_empty());
    assert!(is_drained(&mut rx));
}

#[tokio::test]
async fn overlapping_refreshes_run_one_at_a_time() {
    let h = Harness::new();
    let lobby = h.create_dashboard("lobby").await;
    h.add_feed(&lobby, "https://a.example.com/rss").await;
    h.fetcher.script(
        "https://a.example.com/rss",
        Script::Delayed(
            Duration::from_millis(30),
            vec![entry("a1", "A one", "2024-03-01T10:00:00Z")],
        ),
    );

    let refreshes = (0..4).map(|_| {
        let service = h.service.clone();
        let target = lobby.clone();
        tokio::spawn(async move { service.refresh_now(&target).await })
    });
    let (results, report) = tokio::join!(
        futures::future::join_all(refreshes),
        h.service.scheduler().tick()
    );

    for result in results {
        assert_eq!(titles(&result.unwrap().unwrap()), vec!["A one"]);
    }
    assert_eq!(h.fetcher.peak_in_flight(), 1);
    // Queued refreshes all fetch; the tick only does if it got the token.
    assert_eq!(h.fetcher.calls().len(), 4 + report.refreshed);
}

#[tokio::test]
async fn recreated_dashboard_starts_clean() {
    let h = Harness::new();
    let lobby = h.create_dashboard("lobby").await;
    h.add_feed(&lobby, "https://a.example.com/rss").await;
    h.fetcher.script(
        "https://a.example.com/rss",
        Script::Entries(vec![entry("a1", "A one", "2024-03-01T10:00:00Z")]),
    );
    h.service.refresh_now(&lobby).await.unwrap();

    let (old_viewer, mut old_rx) = h.gateway.connect();
    h.service.subscribe(old_viewer, &lobby).await.unwrap();
    for _ in 0..3 {
        next_event(&mut old_rx).await;
    }

    h.store.delete_dashboard(&lobby).await.unwrap();
    h.service.on_dashboard_deleted(&lobby).await;

    assert!(ticker_of(&next_event(&mut old_rx).await.event).is_empty());
    assert!(h.gateway.viewers(&lobby).is_empty());
    assert!(h.gateway.is_connected(old_viewer));
    assert!(h.service.ticker_snapshot(&lobby).refreshed_at.is_none());

    let lobby = h.create_dashboard("lobby").await;
    h.add_feed(&lobby, "https://b.example.com/rss").await;
    h.fetcher.script(
        "https://b.example.com/rss",
        Script::Entries(vec![entry("b1", "B one", "2024-03-01T11:00:00Z")]),
    );
    h.service.refresh_now(&lobby).await.unwrap();
    h.service.publish_content(&lobby).await.unwrap();

    assert!(is_drained(&mut old_rx));

    let (new_viewer, mut new_rx) = h.gateway.connect();
    h.service.subscribe(new_viewer, &lobby).await.unwrap();
    assert_eq!(titles(ticker_of(&next_event(&mut new_rx).await.event)), vec!["B one"]);
}
