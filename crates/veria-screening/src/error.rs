use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single screening attempt.
///
/// Every variant is a plain value so that sessions can keep the last error
/// around. None of them carries upstream response bodies, URLs or the
/// credential: the `Display` output is safe to surface to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScreeningError {
    #[error("screening credential is missing or was rejected")]
    Auth,

    #[error("screening service unreachable ({0})")]
    Network(NetworkFailure),

    #[error("screening service is rate limiting requests")]
    RateLimited { retry_after: Option<Duration> },

    #[error("unexpected screening response: {0}")]
    Protocol(String),

    #[error("invalid screening request: {0}")]
    Validation(String),
}

/// Transport-level failure subtype of [`ScreeningError::Network`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkFailure {
    Timeout,
    Connect,
    Transport,
}

impl fmt::Display for NetworkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkFailure::Timeout => write!(f, "timeout"),
            NetworkFailure::Connect => write!(f, "connection failed"),
            NetworkFailure::Transport => write!(f, "transport error"),
        }
    }
}

impl ScreeningError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScreeningError::Auth => ErrorKind::AuthError,
            ScreeningError::Network(_) => ErrorKind::NetworkError,
            ScreeningError::RateLimited { .. } => ErrorKind::RateLimited,
            ScreeningError::Protocol(_) => ErrorKind::ProtocolError,
            ScreeningError::Validation(_) => ErrorKind::ValidationError,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ScreeningError::Network(NetworkFailure::Timeout))
    }

    /// Whether a caller may reasonably try again later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScreeningError::Network(_) | ScreeningError::RateLimited { .. } | ScreeningError::Protocol(_)
        )
    }

    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        let failure = if err.is_timeout() {
            NetworkFailure::Timeout
        } else if err.is_connect() {
            NetworkFailure::Connect
        } else {
            NetworkFailure::Transport
        };
        ScreeningError::Network(failure)
    }

    /// Protocol error for a body that failed to decode. Only the error
    /// category and position are kept; serde messages may quote the payload.
    pub(crate) fn from_decode(err: &serde_json::Error) -> Self {
        ScreeningError::Protocol(format!(
            "{:?} error at line {} column {}",
            err.classify(),
            err.line(),
            err.column()
        ))
    }
}

/// Wire name of an error category, as carried in [`ErrorEnvelope::error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    AuthError,
    NetworkError,
    RateLimited,
    ProtocolError,
    ValidationError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AuthError => "AuthError",
            ErrorKind::NetworkError => "NetworkError",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::ProtocolError => "ProtocolError",
            ErrorKind::ValidationError => "ValidationError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error body returned across the credential boundary:
/// `{ "error": <ErrorKind>, "message": <string> }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorKind,
    pub message: String,
}

impl ErrorEnvelope {
    /// Builds the caller-facing envelope for `err`.
    ///
    /// Messages are fixed per category. Validation messages describe the
    /// caller's own input and are the only ones passed through.
    pub fn from_error(err: &ScreeningError) -> Self {
        let message = match err {
            ScreeningError::Auth => "screening service is misconfigured".to_string(),
            ScreeningError::Network(NetworkFailure::Timeout) => "screening service timed out".to_string(),
            ScreeningError::Network(_) => "screening service is unreachable".to_string(),
            ScreeningError::RateLimited { .. } => "screening service is busy, try again later".to_string(),
            ScreeningError::Protocol(_) => "screening service returned an invalid response".to_string(),
            ScreeningError::Validation(reason) => reason.clone(),
        };
        Self {
            error: err.kind(),
            message,
        }
    }

    /// Maps an envelope received from a boundary back into the taxonomy.
    pub fn into_error(self) -> ScreeningError {
        match self.error {
            ErrorKind::AuthError => ScreeningError::Auth,
            ErrorKind::NetworkError if self.message.contains("timed out") => {
                ScreeningError::Network(NetworkFailure::Timeout)
            }
            ErrorKind::NetworkError => ScreeningError::Network(NetworkFailure::Transport),
            ErrorKind::RateLimited => ScreeningError::RateLimited { retry_after: None },
            ErrorKind::ProtocolError => ScreeningError::Protocol(self.message),
            ErrorKind::ValidationError => ScreeningError::Validation(self.message),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ScreeningError>;
