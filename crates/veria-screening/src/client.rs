//! HTTP client for the remote screening service.
//!
//! Request: `POST <endpoint>` with `{"input": <address>}` and
//! `Authorization: Bearer <credential>`. A 2xx body must decode into a
//! [`ScreeningVerdict`]; every other outcome maps onto [`ScreeningError`].

use reqwest::header::{HeaderMap, ACCEPT, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::ServiceConfig;
use crate::error::{ConfigError, ScreeningError};
use crate::types::{Address, Credential, ScreeningVerdict};

#[derive(Serialize)]
struct ScreenRequest<'a> {
    input: &'a str,
}

#[derive(Clone, Debug)]
pub struct ScreeningClient {
    http: Client,
    endpoint: Url,
}

impl ScreeningClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, ConfigError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| ConfigError::InvalidValue {
            name: "service.endpoint",
            reason: e.to_string(),
        })?;
        let timeout = Duration::from_secs(config.timeout_secs);
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        debug!(
            timeout_secs = config.timeout_secs,
            "Screening client initialized"
        );

        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Issues exactly one screening request for `address`.
    ///
    /// The credential travels only in the `Authorization` header.
    pub async fn screen(
        &self,
        address: &Address,
        credential: &Credential,
    ) -> Result<ScreeningVerdict, ScreeningError> {
        debug!(address = %address.fingerprint(), "Sending screening request");

        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(credential.expose_secret())
            .header(ACCEPT, "application/json")
            .json(&ScreenRequest {
                input: address.as_str(),
            })
            .send()
            .await
            .map_err(|e| ScreeningError::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            let err = error_for_status(status, response.headers());
            warn!(
                status = status.as_u16(),
                kind = %err.kind(),
                address = %address.fingerprint(),
                "Screening service returned an error status"
            );
            return Err(err);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ScreeningError::from_reqwest(&e))?;

        debug!(body_len = body.len(), "Received screening response");

        ScreeningVerdict::from_slice(&body)
    }
}

fn error_for_status(status: StatusCode, headers: &HeaderMap) -> ScreeningError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ScreeningError::Auth,
        StatusCode::TOO_MANY_REQUESTS => ScreeningError::RateLimited {
            retry_after: retry_after(headers),
        },
        other => ScreeningError::Protocol(format!("unexpected status {}", other.as_u16())),
    }
}

/// Parses a delta-seconds `Retry-After` header. HTTP-date values are ignored.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
