//! JSON body extractor that rejects with [`ApiError`].
//!
//! Unlike `axum::Json`, `JsonBody<T>` does not require a `Content-Type`
//! header and reports every decoding problem as `400 INVALID_INPUT` in the
//! same JSON shape as other API errors.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Extractor for a JSON request body.
///
/// # Example
///
/// ```rust,ignore
/// async fn create_book(JsonBody(new): JsonBody<NewBook>) -> ApiResult<impl IntoResponse> {
///     // new is a fully decoded NewBook
/// }
/// ```
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::invalid_input(format!("Failed to read request body: {}", e)))?;

        let value = serde_json::from_slice(&bytes)?;
        Ok(JsonBody(value))
    }
}
