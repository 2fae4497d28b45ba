//! In-process router checks: drive `build_app`'s `Router` directly with
//! `tower::ServiceExt::oneshot`, no bound socket involved. Complements
//! `black_box_api.rs`, which exercises the same routes over a real
//! listener and a WebSocket client.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use strym_api::Config;
use tower::ServiceExt;

fn config() -> Config {
    Config {
        app_name: "strym-test".to_string(),
        debug: true,
        database_url: None,
        database_pool_size: 5,
        redis_url: None,
        api_key: "secret-key".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_oneshot_requires_no_auth() {
    let app = strym_api::build_app(config()).await.unwrap();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn ingest_oneshot_rejects_missing_api_key() {
    let app = strym_api::build_app(config()).await.unwrap();

    let payload = json!({
        "source": {"app_id": "api"},
        "severity": "info",
        "message": "ok",
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/logs")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn ingest_oneshot_accepts_missing_source_host() {
    let app = strym_api::build_app(config()).await.unwrap();

    let payload = json!({
        "source": {"app_id": "api"},
        "severity": "info",
        "message": "ok",
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/logs")
                .header("content-type", "application/json")
                .header("X-API-Key", "secret-key")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}
