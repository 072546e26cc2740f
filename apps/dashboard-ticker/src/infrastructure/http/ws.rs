//! WebSocket viewer endpoint.
//!
//! Each socket is registered with the broadcast gateway for its lifetime.
//! Viewers select dashboards with `dashboard:request` / `dashboard:leave`
//! messages and receive [`EventEnvelope`](crate::domain::event::EventEnvelope)
//! JSON frames for every dashboard they joined.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use super::api::dashboard_or_default;
use super::state::SharedState;
use crate::domain::subscription::ConnectionId;

/// Viewer to server message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Join a dashboard and receive its current state.
    #[serde(rename = "dashboard:request")]
    Request {
        /// Dashboard id; missing means `default`.
        #[serde(default)]
        dashboard: Option<String>,
    },
    /// Stop receiving a dashboard's events.
    #[serde(rename = "dashboard:leave")]
    Leave {
        /// Dashboard id; missing means `default`.
        #[serde(default)]
        dashboard: Option<String>,
    },
}

pub(super) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: SharedState) {
    let (connection, mut events) = state.gateway.connect();
    let (mut sink, mut stream) = socket.split();

    tracing::info!(connection, "Viewer connected");

    loop {
        tokio::select! {
            () = state.shutdown.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            event = events.recv() => {
                let Some(envelope) = event else { break };
                let text = match serde_json::to_string(envelope.as_ref()) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(connection, error = %e, "Failed to encode event");
                        continue;
                    }
                };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    handle_client_message(&state, connection, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(connection, error = %e, "WebSocket receive failed");
                    break;
                }
            },
        }
    }

    let left = state.gateway.disconnect(connection);
    tracing::info!(connection, dashboards = left.len(), "Viewer disconnected");
}

async fn handle_client_message(state: &SharedState, connection: ConnectionId, text: &str) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(connection, error = %e, "Ignoring malformed viewer message");
            return;
        }
    };

    match message {
        ClientMessage::Request { dashboard } => {
            let dashboard = dashboard_or_default(dashboard.as_deref());
            // Failures are already reported to the viewer as `dashboard:error`.
            let _ = state.service.subscribe(connection, &dashboard).await;
        }
        ClientMessage::Leave { dashboard } => {
            let dashboard = dashboard_or_default(dashboard.as_deref());
            if !state.service.unsubscribe(connection, &dashboard) {
                tracing::debug!(connection, dashboard = %dashboard, "Leave for unjoined dashboard");
            }
        }
    }
}
