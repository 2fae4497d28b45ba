//! Shared-secret API key gate (§4.9 Authentication). Applied to every
//! route except `/health`.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use strym_auth::ApiKeyValidator;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn auth_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if req.uri().path() == "/health" {
        return next.run(req).await;
    }

    let provided = req.headers().get("X-API-Key").and_then(|v| v.to_str().ok());

    match state.validator.validate(provided) {
        Ok(()) => next.run(req).await,
        Err(err) => ApiError(strym_core::AppError::authentication(err.to_string())).into_response(),
    }
}
