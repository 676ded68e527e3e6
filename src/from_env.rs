//! Process-environment configuration.
//!
//! The file configuration from `veria_screening::Config` is loaded first,
//! then overridden by the variables below. The credential is read separately
//! and handed straight to the credential boundary.

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use veria_screening::{Config, ConfigError, Credential, RiskLevel};

pub const ENV_VERIA_API_KEY: &str = "VERIA_API_KEY";
pub const ENV_VERIA_API_URL: &str = "VERIA_API_URL";
pub const ENV_VERIA_TIMEOUT_SECS: &str = "VERIA_TIMEOUT_SECS";
pub const ENV_GATE_BLOCK_AT: &str = "GATE_BLOCK_AT";
pub const ENV_GATE_BLOCK_ON_SANCTIONS: &str = "GATE_BLOCK_ON_SANCTIONS";
pub const ENV_SCREENING_CONFIG: &str = "SCREENING_CONFIG";
pub const ENV_HOST: &str = "HOST";
pub const ENV_PORT: &str = "PORT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// Loads file configuration (explicit path, `SCREENING_CONFIG`, or the
/// default locations) and applies environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| env::var(ENV_SCREENING_CONFIG).ok().map(PathBuf::from));
    let mut config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::discover()?,
    };
    apply_overrides(&mut config, |name| env::var(name).ok())?;
    Ok(config)
}

pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(endpoint) = lookup(ENV_VERIA_API_URL) {
        config.service.endpoint = endpoint;
    }
    if let Some(timeout) = lookup(ENV_VERIA_TIMEOUT_SECS) {
        config.service.timeout_secs = timeout.trim().parse().map_err(|_| ConfigError::InvalidValue {
            name: ENV_VERIA_TIMEOUT_SECS,
            reason: "expected a whole number of seconds".into(),
        })?;
    }
    if let Some(level) = lookup(ENV_GATE_BLOCK_AT) {
        config.gate.block_at = level.parse::<RiskLevel>()?;
    }
    if let Some(flag) = lookup(ENV_GATE_BLOCK_ON_SANCTIONS) {
        config.gate.block_on_sanctions_hit = parse_bool(ENV_GATE_BLOCK_ON_SANCTIONS, &flag)?;
    }
    config.validate()
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name,
            reason: "expected true or false".into(),
        }),
    }
}

/// Reads the screening credential. Called once, at startup.
pub fn credential_from_env() -> Result<Credential, ConfigError> {
    let secret = env::var(ENV_VERIA_API_KEY).map_err(|_| ConfigError::Missing(ENV_VERIA_API_KEY))?;
    Credential::new(secret).map_err(|_| ConfigError::Missing(ENV_VERIA_API_KEY))
}

pub fn bind_addr_from_env() -> Result<SocketAddr, ConfigError> {
    let host = env::var(ENV_HOST).unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let ip: IpAddr = host.parse().map_err(|_| ConfigError::InvalidValue {
        name: ENV_HOST,
        reason: format!("'{host}' is not an IP address"),
    })?;
    let port = match env::var(ENV_PORT) {
        Ok(port) => port.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
            name: ENV_PORT,
            reason: format!("'{port}' is not a port number"),
        })?,
        Err(_) => DEFAULT_PORT,
    };
    Ok(SocketAddr::new(ip, port))
}
