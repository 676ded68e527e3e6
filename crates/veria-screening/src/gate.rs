//! Turns a screening outcome into an access decision.
//!
//! The rule fails closed: nothing but an obtained verdict below the
//! configured block level yields [`GateDecision::Allowed`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ScreeningError;
use crate::types::{RiskLevel, ScreeningVerdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateDecision {
    Allowed,
    Blocked,
    /// Pending, failed or never submitted. Callers must not grant access.
    Unknown,
}

impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateDecision::Allowed => write!(f, "ALLOWED"),
            GateDecision::Blocked => write!(f, "BLOCKED"),
            GateDecision::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Integrator-controlled gate thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatePolicy {
    /// Lowest risk level that is blocked.
    #[serde(default = "default_block_at")]
    pub block_at: RiskLevel,
    /// Block any verdict with a sanctions hit regardless of its risk level.
    #[serde(default)]
    pub block_on_sanctions_hit: bool,
}

fn default_block_at() -> RiskLevel {
    RiskLevel::High
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            block_at: default_block_at(),
            block_on_sanctions_hit: false,
        }
    }
}

impl GatePolicy {
    pub fn decide(
        &self,
        verdict: Option<&ScreeningVerdict>,
        error: Option<&ScreeningError>,
        is_loading: bool,
    ) -> GateDecision {
        if is_loading {
            return GateDecision::Unknown;
        }
        match (verdict, error) {
            (Some(verdict), _) => self.classify(verdict),
            (None, Some(_)) => GateDecision::Unknown,
            (None, None) => GateDecision::Unknown,
        }
    }

    /// True when `verdict` is blocked only because of its sanctions hit.
    pub fn blocked_by_sanctions_only(&self, verdict: &ScreeningVerdict) -> bool {
        self.block_on_sanctions_hit && verdict.details.sanctions_hit && verdict.risk < self.block_at
    }

    pub fn classify(&self, verdict: &ScreeningVerdict) -> GateDecision {
        if self.block_on_sanctions_hit && verdict.details.sanctions_hit {
            return GateDecision::Blocked;
        }
        if verdict.risk >= self.block_at {
            GateDecision::Blocked
        } else {
            GateDecision::Allowed
        }
    }
}
