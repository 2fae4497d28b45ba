use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use reqwest::StatusCode;
use serde_json::{json, Value};
use strym_api::Config;
use tokio_tungstenite::tungstenite::Message as WsMessage;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(api_key: &str) -> Self {
        let config = Config {
            app_name: "strym-test".to_string(),
            debug: true,
            database_url: None,
            database_pool_size: 5,
            redis_url: None,
            api_key: api_key.to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
        };

        let app = strym_api::build_app(config).await.expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{addr}");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>())
                .await
                .unwrap();
        });

        Self { base_url, handle }
    }

    fn ws_url(&self, api_key: &str) -> String {
        format!("ws://{}/stream?api_key={}", self.base_url.trim_start_matches("http://"), api_key)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn sample_log(source_app: &str) -> Value {
    json!({
        "source": {"app_id": source_app, "host": "test-host", "instance_id": null},
        "severity": "error",
        "message": "something broke",
        "metadata": {},
    })
}

#[tokio::test]
async fn health_check_requires_no_auth() {
    let server = TestServer::spawn("secret-key").await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{}/health", server.base_url)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn missing_api_key_is_rejected() {
    let server = TestServer::spawn("secret-key").await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{}/logs", server.base_url)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["type"], "AuthenticationError");
}

#[tokio::test]
async fn ingest_then_query_round_trip() {
    let server = TestServer::spawn("secret-key").await;
    let client = reqwest::Client::new();

    let ingest_resp = client
        .post(format!("{}/logs", server.base_url))
        .header("X-API-Key", "secret-key")
        .json(&sample_log("checkout-service"))
        .send()
        .await
        .unwrap();
    assert_eq!(ingest_resp.status(), StatusCode::CREATED);
    let receipt: Value = ingest_resp.json().await.unwrap();
    let id = receipt["id"].as_str().unwrap().to_string();

    let query_resp = client
        .get(format!("{}/logs?source_app=checkout-service", server.base_url))
        .header("X-API-Key", "secret-key")
        .send()
        .await
        .unwrap();
    assert_eq!(query_resp.status(), StatusCode::OK);
    let page: Value = query_resp.json().await.unwrap();
    assert_eq!(page["logs"][0]["id"], id);

    let get_resp = client
        .get(format!("{}/logs/{id}", server.base_url))
        .header("X-API-Key", "secret-key")
        .send()
        .await
        .unwrap();
    assert_eq!(get_resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn ingest_accepts_missing_source_host() {
    let server = TestServer::spawn("secret-key").await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/logs", server.base_url))
        .header("X-API-Key", "secret-key")
        .json(&json!({"source": {"app_id": "api"}, "severity": "info", "message": "ok"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn query_rejects_unrecognized_severity() {
    let server = TestServer::spawn("secret-key").await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/logs?severity=trace", server.base_url))
        .header("X-API-Key", "secret-key")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["type"], "ValidationError");
}

#[tokio::test]
async fn bulk_ingest_reports_partial_failure() {
    let server = TestServer::spawn("secret-key").await;
    let client = reqwest::Client::new();

    let mut good = sample_log("batch-service");
    let mut bad = sample_log("batch-service");
    bad["message"] = json!("");
    good["message"] = json!("ok entry");

    let resp = client
        .post(format!("{}/logs/bulk", server.base_url))
        .header("X-API-Key", "secret-key")
        .json(&json!([good, bad]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["accepted"], 1);
    assert_eq!(body["rejected"], 1);
    assert_eq!(body["errors"][0]["index"], 1);
}

#[tokio::test]
async fn search_finds_ingested_message() {
    let server = TestServer::spawn("secret-key").await;
    let client = reqwest::Client::new();

    let mut entry = sample_log("search-service");
    entry["message"] = json!("payment gateway timed out");

    client
        .post(format!("{}/logs", server.base_url))
        .header("X-API-Key", "secret-key")
        .json(&entry)
        .send()
        .await
        .unwrap();

    let resp = client
        .get(format!("{}/logs/search?q=timed out", server.base_url))
        .header("X-API-Key", "secret-key")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    assert!(body["total"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn stats_summary_reflects_ingested_logs() {
    let server = TestServer::spawn("secret-key").await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/logs", server.base_url))
        .header("X-API-Key", "secret-key")
        .json(&sample_log("stats-service"))
        .send()
        .await
        .unwrap();

    let resp = client
        .get(format!("{}/stats/summary?source_app=stats-service", server.base_url))
        .header("X-API-Key", "secret-key")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["total_logs"], 1);
    assert!(body["logs_per_second"]["avg"].is_number());
}

#[tokio::test]
async fn rate_limit_breach_returns_429_with_headers() {
    let server = TestServer::spawn("secret-key").await;
    let client = reqwest::Client::new();

    let mut last_status = StatusCode::OK;
    let mut last_resp = None;
    for _ in 0..105 {
        let resp = client
            .get(format!("{}/logs", server.base_url))
            .header("X-API-Key", "secret-key")
            .send()
            .await
            .unwrap();
        last_status = resp.status();
        if last_status == StatusCode::TOO_MANY_REQUESTS {
            last_resp = Some(resp);
            break;
        }
    }

    assert_eq!(last_status, StatusCode::TOO_MANY_REQUESTS);
    let resp = last_resp.expect("expected a 429 before exhausting attempts");
    assert!(resp.headers().contains_key("Retry-After"));
    assert_eq!(resp.headers().get("X-RateLimit-Remaining").unwrap(), "0");
}

#[tokio::test]
async fn websocket_rejects_invalid_api_key() {
    let server = TestServer::spawn("secret-key").await;
    let url = server.ws_url("wrong-key");

    let (mut socket, _) = tokio_tungstenite::connect_async(&url).await.expect("handshake should succeed");
    let close = tokio::time::timeout(Duration::from_secs(2), socket.next())
        .await
        .expect("timed out waiting for close")
        .expect("stream ended without a message");
    match close.unwrap() {
        WsMessage::Close(Some(frame)) => assert_eq!(frame.code, 4001u16.into()),
        other => panic!("expected a close frame, got {other:?}"),
    }
}

#[tokio::test]
async fn websocket_subscribe_receives_matching_log() {
    let server = TestServer::spawn("secret-key").await;
    let url = server.ws_url("secret-key");

    let (mut socket, _) = tokio_tungstenite::connect_async(&url).await.expect("handshake failed");

    let connected = socket.next().await.unwrap().unwrap();
    let connected: Value = serde_json::from_str(connected.to_text().unwrap()).unwrap();
    assert_eq!(connected["type"], "connected");

    socket
        .send(WsMessage::Text(
            json!({"type": "subscribe", "subscription_id": "sub-1", "filters": {"source_app": "live-service"}}).to_string(),
        ))
        .await
        .unwrap();

    let subscribed = socket.next().await.unwrap().unwrap();
    let subscribed: Value = serde_json::from_str(subscribed.to_text().unwrap()).unwrap();
    assert_eq!(subscribed["type"], "subscribed");
    assert_eq!(subscribed["subscription_id"], "sub-1");

    let client = reqwest::Client::new();
    client
        .post(format!("{}/logs", server.base_url))
        .header("X-API-Key", "secret-key")
        .json(&sample_log("live-service"))
        .send()
        .await
        .unwrap();

    let log_msg = tokio::time::timeout(Duration::from_secs(2), socket.next())
        .await
        .expect("timed out waiting for fanout")
        .unwrap()
        .unwrap();
    let log_msg: Value = serde_json::from_str(log_msg.to_text().unwrap()).unwrap();
    assert_eq!(log_msg["type"], "log");
    assert_eq!(log_msg["subscription_id"], "sub-1");
    assert_eq!(log_msg["data"]["source"]["app_id"], "live-service");
}

#[tokio::test]
async fn websocket_unknown_message_type_returns_error_without_disconnect() {
    let server = TestServer::spawn("secret-key").await;
    let url = server.ws_url("secret-key");

    let (mut socket, _) = tokio_tungstenite::connect_async(&url).await.expect("handshake failed");
    let _connected = socket.next().await.unwrap().unwrap();

    socket.send(WsMessage::Text(json!({"type": "frobnicate"}).to_string())).await.unwrap();

    let error_msg = socket.next().await.unwrap().unwrap();
    let error_msg: Value = serde_json::from_str(error_msg.to_text().unwrap()).unwrap();
    assert_eq!(error_msg["type"], "error");
    assert_eq!(error_msg["code"], "UNKNOWN_MESSAGE_TYPE");

    socket
        .send(WsMessage::Text(json!({"type": "subscribe", "filters": {}}).to_string()))
        .await
        .unwrap();
    let subscribed = socket.next().await.unwrap().unwrap();
    let subscribed: Value = serde_json::from_str(subscribed.to_text().unwrap()).unwrap();
    assert_eq!(subscribed["type"], "subscribed");
}
