//! HTTP surface of the credential boundary.
//!
//! - `POST /api/screen` – `{ "address": <string> }` in, verdict JSON out
//! - `GET /health` – liveness
//! - `GET /version` – crate version
//!
//! Callers never send a credential. Any `Authorization` header on the
//! inbound request is ignored.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

use veria_screening::{ErrorEnvelope, NetworkFailure, ScreeningError, ScreeningVerdict};

use crate::boundary::CredentialBoundary;

pub fn routes() -> Router<Arc<CredentialBoundary>> {
    Router::new()
        .route("/api/screen", post(post_screen))
        .route("/health", get(get_health))
        .route("/version", get(get_version))
}

/// `POST /api/screen`: screens one address with the server-held credential.
///
/// The body is read raw so that a missing or malformed `address` produces
/// a `ValidationError` envelope rather than a framework rejection.
#[instrument(skip_all)]
pub async fn post_screen(
    State(boundary): State<Arc<CredentialBoundary>>,
    raw_body: Bytes,
) -> Result<Json<ScreeningVerdict>, ApiError> {
    let verdict = boundary.handle(&raw_body).await?;
    Ok(Json(verdict))
}

#[instrument(skip_all)]
pub async fn get_health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy"
    }))
}

#[instrument(skip_all)]
pub async fn get_version() -> impl IntoResponse {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// A screening failure on its way out of the boundary.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub ScreeningError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ScreeningError::Validation(_) => StatusCode::BAD_REQUEST,
            ScreeningError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ScreeningError::Network(NetworkFailure::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            ScreeningError::Network(_) | ScreeningError::Auth | ScreeningError::Protocol(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, Json(ErrorEnvelope::from_error(&self.0))).into_response();
        if let ScreeningError::RateLimited {
            retry_after: Some(retry_after),
        } = self.0
        {
            if let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
