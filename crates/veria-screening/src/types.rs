use crate::error::{ConfigError, ScreeningError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

const MAX_ADDRESS_LEN: usize = 256;

/// Wallet address as supplied by the caller.
///
/// Equality is byte-for-byte; no checksum-casing or trimming is applied since
/// both are chain specific. `Debug` prints a fingerprint instead of the value
/// and there is no `Display`, so an address cannot end up in a log line by
/// accident.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn new(raw: impl Into<String>) -> Result<Self, ScreeningError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(ScreeningError::Validation("address must not be empty".into()));
        }
        if raw.len() > MAX_ADDRESS_LEN {
            return Err(ScreeningError::Validation(format!(
                "address exceeds {MAX_ADDRESS_LEN} bytes"
            )));
        }
        if raw.chars().any(|c| c.is_control() || c.is_whitespace()) {
            return Err(ScreeningError::Validation(
                "address must not contain whitespace or control characters".into(),
            ));
        }
        Ok(Self(raw))
    }

    /// The raw value. Only the screening request body should need this.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short, stable SHA-256 fingerprint used in logs and audit events.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        hex::encode(&digest[..6])
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.fingerprint())
    }
}

impl TryFrom<String> for Address {
    type Error = ScreeningError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Address::new(value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

/// The screening service API key.
///
/// Held only by the credential boundary. It cannot be printed and is not
/// serializable.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(ConfigError::Missing("screening credential"));
        }
        Ok(Self(secret))
    }

    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Severity bucket assigned by the screening service, ordered
/// `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            other => Err(ConfigError::InvalidValue {
                name: "risk level",
                reason: format!("unknown risk level '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningDetails {
    pub sanctions_hit: bool,
    pub pep_hit: bool,
    pub watchlist_hit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_lists: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_type: Option<String>,
}

/// Risk assessment for one address, as returned by the screening service.
///
/// Relays re-serialize this struct, so the body a caller receives is
/// normalized to these fields: anything else the service sends, in the
/// verdict or in `details`, is dropped rather than passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningVerdict {
    /// 0..=100, higher is riskier.
    pub score: u8,
    pub risk: RiskLevel,
    pub details: ScreeningDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

pub const MAX_SCORE: u8 = 100;

impl ScreeningVerdict {
    /// Strictly decodes a verdict body. Any missing field, wrong type,
    /// unknown risk level or out-of-range score is a protocol error.
    pub fn from_slice(body: &[u8]) -> Result<Self, ScreeningError> {
        let verdict: ScreeningVerdict =
            serde_json::from_slice(body).map_err(|e| ScreeningError::from_decode(&e))?;
        if verdict.score > MAX_SCORE {
            return Err(ScreeningError::Protocol(format!(
                "score {} outside 0..={MAX_SCORE}",
                verdict.score
            )));
        }
        Ok(verdict)
    }
}
