use crate::config::{AuditLoggingConfig, LogFormat};
use crate::error::ErrorKind;
use crate::gate::GateDecision;
use crate::types::{Address, RiskLevel, ScreeningVerdict};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One outcome at the credential boundary. Addresses appear only as
/// fingerprints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    pub address_fingerprint: Option<String>,
    pub decision: GateDecision,
    pub risk: Option<RiskLevel>,
    pub score: Option<u8>,
    pub sanctions_hit: Option<bool>,
    pub error: Option<ErrorKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    VerdictRelayed,
    ScreeningFailed,
    RequestRejected,
}

impl ScreeningEvent {
    pub fn verdict(address: &Address, verdict: &ScreeningVerdict, decision: GateDecision) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type: EventType::VerdictRelayed,
            address_fingerprint: Some(address.fingerprint()),
            decision,
            risk: Some(verdict.risk),
            score: Some(verdict.score),
            sanctions_hit: Some(verdict.details.sanctions_hit),
            error: None,
        }
    }

    pub fn failure(address: Option<&Address>, kind: ErrorKind) -> Self {
        let event_type = if kind == ErrorKind::ValidationError {
            EventType::RequestRejected
        } else {
            EventType::ScreeningFailed
        };
        Self {
            timestamp: Utc::now(),
            event_type,
            address_fingerprint: address.map(Address::fingerprint),
            decision: GateDecision::Unknown,
            risk: None,
            score: None,
            sanctions_hit: None,
            error: Some(kind),
        }
    }
}

pub struct AuditLogger {
    config: AuditLoggingConfig,
}

impl AuditLogger {
    pub fn new(config: AuditLoggingConfig) -> Self {
        Self { config }
    }

    /// Whether `event` passes the configured filter.
    pub fn should_log(&self, event: &ScreeningEvent) -> bool {
        if !self.config.enabled {
            return false;
        }
        !(event.decision == GateDecision::Allowed && !self.config.include_allowed)
    }

    pub fn log_event(&self, event: ScreeningEvent) {
        if !self.should_log(&event) {
            return;
        }

        let line = match self.config.format {
            LogFormat::Json => serde_json::to_string(&event)
                .unwrap_or_else(|e| format!(r#"{{"error": "Failed to serialize: {}"}}"#, e)),
            LogFormat::Text => Self::format_text(&event),
        };

        match (event.decision, event.event_type) {
            (GateDecision::Blocked, _) => tracing::warn!(target: "screening_audit", "{}", line),
            (_, EventType::ScreeningFailed) => tracing::error!(target: "screening_audit", "{}", line),
            _ => tracing::info!(target: "screening_audit", "{}", line),
        }
    }

    fn format_text(event: &ScreeningEvent) -> String {
        format!(
            "[{}] {:?} {} - address: {} | risk: {} | score: {} | sanctions: {} | error: {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.event_type,
            event.decision,
            event.address_fingerprint.as_deref().unwrap_or("-"),
            event.risk.map(|r| r.as_str()).unwrap_or("-"),
            event.score.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
            event.sanctions_hit.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
            event.error.map(|e| e.as_str()).unwrap_or("-"),
        )
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new(AuditLoggingConfig::default())
    }
}
