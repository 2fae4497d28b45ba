//! WebSocket protocol for `/stream` (§4.9, §6).
//!
//! Each session tracks its own subscriptions twice: once in the shared
//! `SubscriptionRegistry` (which decides, cheaply, whether *any*
//! subscription on this session matches an event) and once in a local
//! map held by this module (which re-evaluates `strym_stream::matches`
//! per subscription so each match can carry its own `subscription_id` in
//! the `log` message, per scenario 4 in the spec).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, Query, State};
use axum::response::Response;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use strym_auth::ApiKeyValidator;
use strym_core::{Filters, LogEvent};
use strym_stream::registry::Transport;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::state::AppState;

const PING_INTERVAL: Duration = Duration::from_secs(30);
const PONG_DEADLINE: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    api_key: Option<String>,
}

pub async fn stream(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    ConnectInfo(_addr): ConnectInfo<SocketAddr>,
    Query(query): Query<StreamQuery>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.api_key))
}

struct SubEntry {
    filters: Filters,
    paused: bool,
}

struct WsTransport {
    tx: mpsc::UnboundedSender<Message>,
    subscriptions: Arc<Mutex<HashMap<String, SubEntry>>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&self, event: &LogEvent) -> Result<(), ()> {
        let matches: Vec<String> = {
            let subs = self.subscriptions.lock().expect("ws subscription map poisoned");
            subs.iter()
                .filter(|(_, entry)| !entry.paused && strym_stream::matches(event, &entry.filters))
                .map(|(id, _)| id.clone())
                .collect()
        };

        for subscription_id in matches {
            let payload = json!({
                "type": "log",
                "subscription_id": subscription_id,
                "data": event,
            });
            if self.tx.send(Message::Text(payload.to_string())).is_err() {
                return Err(());
            }
        }

        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Subscribe {
        #[serde(default)]
        subscription_id: Option<String>,
        #[serde(default)]
        filters: Filters,
    },
    Unsubscribe {
        subscription_id: String,
    },
    Pause {
        subscription_id: String,
    },
    Resume {
        subscription_id: String,
    },
    Pong {
        #[serde(default)]
        timestamp: Option<Value>,
    },
}

#[derive(Serialize)]
struct Connected {
    #[serde(rename = "type")]
    kind: &'static str,
    session_id: String,
    server_time: chrono::DateTime<Utc>,
}

async fn handle_socket(socket: WebSocket, state: AppState, api_key: Option<String>) {
    if state.validator.validate(api_key.as_deref()).is_err() {
        let mut socket = socket;
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: 4001,
                reason: "invalid or missing api key".into(),
            })))
            .await;
        return;
    }

    let session_id = Uuid::now_v7().to_string();
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                break;
            }
        }
    });

    let subscriptions: Arc<Mutex<HashMap<String, SubEntry>>> = Arc::new(Mutex::new(HashMap::new()));
    let transport = Arc::new(WsTransport { tx: tx.clone(), subscriptions: Arc::clone(&subscriptions) });
    state.registry.register(session_id.clone(), transport);

    let connected = Connected { kind: "connected", session_id: session_id.clone(), server_time: Utc::now() };
    if tx.send(Message::Text(serde_json::to_string(&connected).unwrap())).is_err() {
        state.registry.deregister(&session_id);
        return;
    }

    let last_pong = Arc::new(Mutex::new(Instant::now()));
    let mut ping_ticker = tokio::time::interval(PING_INTERVAL);
    ping_ticker.tick().await; // first tick fires immediately; discard it

    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_message(&text, &session_id, &state, &subscriptions, &tx, &last_pong);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
            _ = ping_ticker.tick() => {
                let elapsed = last_pong.lock().expect("last_pong lock poisoned").elapsed();
                if elapsed > PONG_DEADLINE {
                    break;
                }
                let ping = json!({"type": "ping", "timestamp": Utc::now()});
                if tx.send(Message::Text(ping.to_string())).is_err() {
                    break;
                }
            }
        }
    }

    state.registry.deregister(&session_id);
    drop(tx);
    let _ = writer.await;
}

fn handle_client_message(
    text: &str,
    session_id: &str,
    state: &AppState,
    subscriptions: &Arc<Mutex<HashMap<String, SubEntry>>>,
    tx: &mpsc::UnboundedSender<Message>,
    last_pong: &Arc<Mutex<Instant>>,
) {
    let parsed: Result<ClientMessage, _> = serde_json::from_str(text);
    let raw_type = serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(str::to_string));

    match parsed {
        Ok(ClientMessage::Subscribe { subscription_id, filters }) => {
            let subscription_id = subscription_id.unwrap_or_else(|| Uuid::now_v7().to_string());
            state.registry.subscribe(session_id, subscription_id.clone(), filters.clone());
            subscriptions
                .lock()
                .expect("ws subscription map poisoned")
                .insert(subscription_id.clone(), SubEntry { filters: filters.clone(), paused: false });

            send(tx, json!({"type": "subscribed", "subscription_id": subscription_id, "filters": filters}));
        }
        Ok(ClientMessage::Unsubscribe { subscription_id }) => {
            state.registry.unsubscribe(session_id, &subscription_id);
            subscriptions.lock().expect("ws subscription map poisoned").remove(&subscription_id);
            send(tx, json!({"type": "unsubscribed", "subscription_id": subscription_id}));
        }
        Ok(ClientMessage::Pause { subscription_id }) => {
            state.registry.set_paused(session_id, &subscription_id, true);
            if let Some(entry) = subscriptions.lock().expect("ws subscription map poisoned").get_mut(&subscription_id) {
                entry.paused = true;
            }
            send(tx, json!({"type": "paused", "subscription_id": subscription_id}));
        }
        Ok(ClientMessage::Resume { subscription_id }) => {
            state.registry.set_paused(session_id, &subscription_id, false);
            if let Some(entry) = subscriptions.lock().expect("ws subscription map poisoned").get_mut(&subscription_id) {
                entry.paused = false;
            }
            send(tx, json!({"type": "resumed", "subscription_id": subscription_id}));
        }
        Ok(ClientMessage::Pong { .. }) => {
            *last_pong.lock().expect("last_pong lock poisoned") = Instant::now();
        }
        Err(_) => {
            let message_type = raw_type.unwrap_or_else(|| "unknown".to_string());
            send(
                tx,
                json!({
                    "type": "error",
                    "code": "UNKNOWN_MESSAGE_TYPE",
                    "message": format!("unknown message type: {message_type}"),
                }),
            );
        }
    }
}

fn send(tx: &mpsc::UnboundedSender<Message>, value: Value) {
    let _ = tx.send(Message::Text(value.to_string()));
}
