use crate::error::ConfigError;
use crate::gate::{GateDecision, GatePolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_ENDPOINT: &str = "https://api.veria.cc/v1/screen";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// File-level configuration. The screening credential is deliberately not
/// part of it; it only ever comes from the process environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub gate: GatePolicy,
    pub audit: AuditLoggingConfig,
    pub exit_codes: ExitCodes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub endpoint: String,
    /// Upper bound for one screening round trip.
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditLoggingConfig {
    pub enabled: bool,
    pub format: LogFormat,
    /// Also record verdicts that were allowed.
    pub include_allowed: bool,
}

impl Default for AuditLoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: LogFormat::Json,
            include_allowed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}

/// Process exit codes of the screening CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitCodes {
    pub allowed: i32,
    pub blocked: i32,
    pub unknown: i32,
}

impl Default for ExitCodes {
    fn default() -> Self {
        Self {
            allowed: 0,
            blocked: 1,
            unknown: 2,
        }
    }
}

impl ExitCodes {
    pub fn code_for(&self, decision: GateDecision) -> i32 {
        match decision {
            GateDecision::Allowed => self.allowed,
            GateDecision::Blocked => self.blocked,
            GateDecision::Unknown => self.unknown,
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the first config file found in the default locations, or the
    /// built-in defaults.
    pub fn discover() -> Result<Self, ConfigError> {
        let default_paths = [
            "config/screening.toml",
            "screening.toml",
            ".screening.toml",
        ];

        for path in default_paths.into_iter().map(PathBuf::from) {
            if path.exists() {
                tracing::debug!(path = %path.display(), "Loading screening config");
                return Self::from_file(path);
            }
        }

        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "service.timeout_secs",
                reason: "must be greater than zero".into(),
            });
        }
        let codes = self.exit_codes;
        if codes.blocked == codes.allowed || codes.unknown == codes.allowed {
            return Err(ConfigError::InvalidValue {
                name: "exit_codes",
                reason: "blocked and unknown codes must differ from the allowed code".into(),
            });
        }
        Ok(())
    }
}
