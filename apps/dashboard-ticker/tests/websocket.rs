//! WebSocket Integration Tests
//!
//! Serves the router on an ephemeral port and talks to it with a real
//! WebSocket client.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use common::Harness;
use dashboard_ticker::application::dto::NewContent;
use dashboard_ticker::application::ports::DashboardRepository;
use dashboard_ticker::router;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve(h: &Harness) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(h.app_state());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    client
}

async fn send(client: &mut Client, message: Value) {
    client
        .send(Message::text(message.to_string()))
        .await
        .unwrap();
}

async fn next_json(client: &mut Client) -> Value {
    loop {
        let frame = timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for frame")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn wait_for_viewers(h: &Harness, expected: usize) {
    for _ in 0..100 {
        if h.gateway.stats().subscriptions.membership_count == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("viewer count never reached {expected}");
}

#[tokio::test]
async fn request_replays_state_then_streams_updates() {
    let h = Harness::new();
    let addr = serve(&h).await;
    let mut client = connect(addr).await;

    send(&mut client, json!({"type": "dashboard:request"})).await;

    let ticker = next_json(&mut client).await;
    assert_eq!(ticker["dashboard"], "default");
    assert_eq!(ticker["event"], "ticker:update");
    assert_eq!(ticker["data"], json!([]));
    assert_eq!(next_json(&mut client).await["event"], "content:update");
    let config = next_json(&mut client).await;
    assert_eq!(config["event"], "config:update");
    assert_eq!(config["data"]["tickerEnabled"], true);

    let default = dashboard_ticker::DashboardId::default_dashboard();
    h.store
        .create_content(
            &default,
            NewContent {
                url: "https://intranet.example.com/menu".to_string(),
                title: Some("Menu".to_string()),
                kind: None,
            },
        )
        .await
        .unwrap();
    h.service.publish_content(&default).await.unwrap();

    let content = next_json(&mut client).await;
    assert_eq!(content["event"], "content:update");
    assert_eq!(content["data"][0]["title"], "Menu");
}

#[tokio::test]
async fn unknown_dashboard_gets_an_error_event() {
    let h = Harness::new();
    let addr = serve(&h).await;
    let mut client = connect(addr).await;

    send(
        &mut client,
        json!({"type": "dashboard:request", "dashboard": "ghost"}),
    )
    .await;

    let error = next_json(&mut client).await;
    assert_eq!(error["dashboard"], "ghost");
    assert_eq!(error["event"], "dashboard:error");
    assert_eq!(error["data"]["error"], "Failed to load dashboard data");
}

#[tokio::test]
async fn leave_and_disconnect_drop_memberships() {
    let h = Harness::new();
    let addr = serve(&h).await;
    let mut client = connect(addr).await;

    send(&mut client, json!({"type": "dashboard:request"})).await;
    for _ in 0..3 {
        next_json(&mut client).await;
    }
    wait_for_viewers(&h, 1).await;

    send(&mut client, json!({"type": "dashboard:leave"})).await;
    wait_for_viewers(&h, 0).await;

    send(&mut client, json!({"type": "dashboard:request"})).await;
    for _ in 0..3 {
        next_json(&mut client).await;
    }
    wait_for_viewers(&h, 1).await;

    client.close(None).await.unwrap();
    wait_for_viewers(&h, 0).await;
    assert_eq!(h.gateway.stats().connections, 0);
}
