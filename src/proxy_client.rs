//! Screener that goes through a credential boundary over HTTP.
//!
//! This is what a client-side process uses: it knows the boundary's URL and
//! nothing else. Error envelopes are mapped back into [`ScreeningError`].

use reqwest::{Client, StatusCode};
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tracing::debug;
use url::Url;

use veria_screening::{
    retry_after, Address, ConfigError, ErrorEnvelope, NetworkFailure, ScreeningError, ScreeningVerdict,
    Screener,
};

pub const SCREEN_PATH: &str = "api/screen";

#[derive(Clone, Debug)]
pub struct ProxyClient {
    http: Client,
    endpoint: Url,
}

impl ProxyClient {
    /// `base` is the boundary's origin, e.g. `http://localhost:8080/`.
    pub fn new(base: &Url, timeout: Duration) -> Result<Self, ConfigError> {
        let endpoint = base.join(SCREEN_PATH).map_err(|e| ConfigError::InvalidValue {
            name: "proxy url",
            reason: e.to_string(),
        })?;
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn request(&self, address: &Address) -> Result<ScreeningVerdict, ScreeningError> {
        debug!(address = %address.fingerprint(), "Requesting screening from boundary");

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&json!({ "address": address.as_str() }))
            .send()
            .await
            .map_err(|e| ScreeningError::from_reqwest(&e))?;

        let status = response.status();
        let retry_after = retry_after(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| ScreeningError::from_reqwest(&e))?;

        if status.is_success() {
            return ScreeningVerdict::from_slice(&body);
        }

        let error = match serde_json::from_slice::<ErrorEnvelope>(&body) {
            Ok(envelope) => envelope.into_error(),
            Err(_) => error_for_status(status),
        };
        Err(match error {
            ScreeningError::RateLimited { .. } => ScreeningError::RateLimited { retry_after },
            other => other,
        })
    }
}

impl Screener for ProxyClient {
    fn screen(
        &self,
        address: &Address,
    ) -> impl Future<Output = Result<ScreeningVerdict, ScreeningError>> + Send {
        self.request(address)
    }
}

fn error_for_status(status: StatusCode) -> ScreeningError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ScreeningError::RateLimited { retry_after: None },
        StatusCode::GATEWAY_TIMEOUT => ScreeningError::Network(NetworkFailure::Timeout),
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => {
            ScreeningError::Network(NetworkFailure::Transport)
        }
        other => ScreeningError::Protocol(format!("unexpected status {}", other.as_u16())),
    }
}
