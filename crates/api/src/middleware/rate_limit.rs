//! Per-remote-IP sliding-window rate limiter (§4.9 Rate limiting).
//!
//! First request in a 60s bucket sets the counter with a TTL; later
//! requests in the same bucket increment it. A cache backend outage makes
//! `incr_with_ttl` return `None`, which this middleware treats as
//! fail-open (§4.2, §7).

use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use strym_infra::cache::{rate_limit_key, CacheStore, RATE_LIMIT_WINDOW};

use crate::error::ApiError;
use crate::state::AppState;

const LIMIT: u64 = 100;

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    if req.uri().path() == "/health" {
        return next.run(req).await;
    }

    let key = rate_limit_key(&addr.ip().to_string());
    let Some(count) = state.cache.incr_with_ttl(&key, RATE_LIMIT_WINDOW).await else {
        // Cache backend unreachable: fail open (§4.2).
        return next.run(req).await;
    };

    if count > LIMIT {
        let retry_after = state
            .cache
            .ttl(&key)
            .await
            .map(|d| d.as_secs().max(1))
            .unwrap_or(RATE_LIMIT_WINDOW.as_secs());

        let mut response = ApiError(strym_core::AppError::RateLimit { retry_after }).into_response();
        let headers = response.headers_mut();
        headers.insert("X-RateLimit-Limit", HeaderValue::from(LIMIT));
        headers.insert("X-RateLimit-Remaining", HeaderValue::from(0u64));
        headers.insert("X-RateLimit-Reset", HeaderValue::from(reset_epoch(retry_after)));
        headers.insert("Retry-After", HeaderValue::from(retry_after));
        return response;
    }

    let mut response = next.run(req).await;
    let remaining = LIMIT.saturating_sub(count);
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(LIMIT));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(remaining));
    response
}

fn reset_epoch(retry_after: u64) -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
        + retry_after
}
