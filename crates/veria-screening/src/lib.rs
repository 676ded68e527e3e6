//! Wallet-address risk screening.
//!
//! - [`ScreeningClient`] talks to the remote screening service.
//! - [`GatePolicy`] turns a verdict (or its absence) into a [`GateDecision`].
//! - [`ScreeningSession`] tracks one screening attempt per wallet address and
//!   publishes its state for presentation layers.

pub mod audit_logger;
pub mod client;
pub mod config;
pub mod error;
pub mod gate;
pub mod screener;
pub mod session;
pub mod types;

pub use audit_logger::{AuditLogger, EventType, ScreeningEvent};
pub use client::{retry_after, ScreeningClient};
pub use config::{AuditLoggingConfig, Config, ExitCodes, LogFormat, ServiceConfig};
pub use error::{ConfigError, ErrorEnvelope, ErrorKind, NetworkFailure, Result, ScreeningError};
pub use gate::{GateDecision, GatePolicy};
pub use screener::Screener;
pub use session::{ScreeningSession, SessionMachine, SessionSnapshot, SessionState, Ticket, WalletState};
pub use types::{Address, Credential, RiskLevel, ScreeningDetails, ScreeningVerdict};
