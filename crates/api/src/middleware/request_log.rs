//! Request logging, skipping `/health` (§11, mirrors the original's
//! `RequestLoggingMiddleware`). Log level follows the response status:
//! 5xx is an error, 4xx a warning, everything else info.

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request};
use axum::middleware::Next;
use axum::response::Response;

pub async fn request_logging_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    if path == "/health" {
        return next.run(req).await;
    }

    let method = req.method().clone();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

    if status >= 500 {
        tracing::error!(%method, %path, status, duration_ms, client_ip = %addr.ip(), "request failed");
    } else if status >= 400 {
        tracing::warn!(%method, %path, status, duration_ms, client_ip = %addr.ip(), "request rejected");
    } else {
        tracing::info!(%method, %path, status, duration_ms, client_ip = %addr.ip(), "request handled");
    }

    response
}
