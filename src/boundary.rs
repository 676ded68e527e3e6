//! The credential boundary.
//!
//! The only component that holds the screening credential. It accepts an
//! address from an untrusted caller, screens it with the server-held
//! credential and relays the verdict. Failures leave as an
//! [`ErrorEnvelope`](veria_screening::ErrorEnvelope) with a fixed message, so
//! nothing the upstream returned (and nothing about the credential) reaches
//! the caller.
//!
//! The boundary keeps no per-request state and is shared behind an `Arc`.

use std::future::Future;
use tracing::{debug, error, info, warn};

use veria_screening::{
    Address, AuditLogger, Config, ConfigError, Credential, ErrorKind, GatePolicy, ScreeningClient,
    ScreeningError, ScreeningEvent, ScreeningVerdict, Screener,
};

pub struct CredentialBoundary {
    client: ScreeningClient,
    credential: Credential,
    policy: GatePolicy,
    audit: AuditLogger,
}

impl CredentialBoundary {
    pub fn new(client: ScreeningClient, credential: Credential, policy: GatePolicy, audit: AuditLogger) -> Self {
        Self {
            client,
            credential,
            policy,
            audit,
        }
    }

    pub fn from_config(config: &Config, credential: Credential) -> Result<Self, ConfigError> {
        let client = ScreeningClient::new(&config.service)?;
        info!(
            timeout_secs = config.service.timeout_secs,
            block_at = %config.gate.block_at,
            "Credential boundary initialized"
        );
        Ok(Self::new(
            client,
            credential,
            config.gate,
            AuditLogger::new(config.audit.clone()),
        ))
    }

    /// Handles a raw `{"address": ...}` request body.
    ///
    /// Malformed bodies are rejected here and never forwarded upstream.
    pub async fn handle(&self, body: &[u8]) -> Result<ScreeningVerdict, ScreeningError> {
        let address = match parse_request(body) {
            Ok(address) => address,
            Err(e) => {
                debug!(error = %e, "Rejecting screening request");
                self.audit.log_event(ScreeningEvent::failure(None, ErrorKind::ValidationError));
                return Err(e);
            }
        };
        self.screen_address(&address).await
    }

    pub async fn screen_address(&self, address: &Address) -> Result<ScreeningVerdict, ScreeningError> {
        match self.client.screen(address, &self.credential).await {
            Ok(verdict) => {
                let decision = self.policy.classify(&verdict);
                info!(
                    address = %address.fingerprint(),
                    risk = %verdict.risk,
                    score = verdict.score,
                    decision = %decision,
                    "Screening verdict relayed"
                );
                self.audit.log_event(ScreeningEvent::verdict(address, &verdict, decision));
                Ok(verdict)
            }
            Err(e) => {
                match &e {
                    ScreeningError::Auth => error!(
                        "Screening service rejected the configured credential; check {}",
                        crate::from_env::ENV_VERIA_API_KEY
                    ),
                    other => warn!(
                        address = %address.fingerprint(),
                        kind = %other.kind(),
                        error = %other,
                        "Screening failed"
                    ),
                }
                self.audit.log_event(ScreeningEvent::failure(Some(address), e.kind()));
                Err(e)
            }
        }
    }
}

impl Screener for CredentialBoundary {
    fn screen(
        &self,
        address: &Address,
    ) -> impl Future<Output = Result<ScreeningVerdict, ScreeningError>> + Send {
        self.screen_address(address)
    }
}

fn parse_request(body: &[u8]) -> Result<Address, ScreeningError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|_| ScreeningError::Validation("request body must be a JSON object".into()))?;
    let object = value
        .as_object()
        .ok_or_else(|| ScreeningError::Validation("request body must be a JSON object".into()))?;
    match object.get("address") {
        None | Some(serde_json::Value::Null) => {
            Err(ScreeningError::Validation("missing `address` field".into()))
        }
        Some(serde_json::Value::String(raw)) => Address::new(raw.as_str()),
        Some(_) => Err(ScreeningError::Validation("`address` must be a string".into())),
    }
}
