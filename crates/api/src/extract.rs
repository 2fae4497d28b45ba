//! A `Json<T>` extractor whose rejection renders the `{"error": {...}}`
//! envelope instead of axum's plain-text default, so a malformed body or
//! an unrecognized `severity` literal surfaces as a `ValidationError`
//! (§6, §7, scenario 2).

use axum::extract::{FromRequest, Request};
use axum::response::Response;
use serde::de::DeserializeOwned;

use crate::error::validation_response;

pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(validation_response(rejection.to_string())),
        }
    }
}
