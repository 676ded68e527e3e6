//! `veria-screen`: screen one address from the command line.
//!
//! Exit status follows [`ExitCodes`]: allowed, blocked, or unknown (any
//! failure, including configuration errors). Defaults are 0, 1 and 2.

use clap::Parser;
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::error;
use url::Url;

use veria_screening::{
    Address, ErrorEnvelope, ExitCodes, GateDecision, GatePolicy, RiskLevel, ScreeningError, ScreeningVerdict,
    Screener,
};

use crate::boundary::CredentialBoundary;
use crate::from_env;
use crate::proxy_client::ProxyClient;

#[derive(Parser, Debug)]
#[command(
    name = "veria-screen",
    version,
    about = "Screen a wallet address before allowing an on-chain action"
)]
pub struct Cli {
    /// Wallet address to screen.
    pub address: String,

    /// Screen through a running veria-gate instead of calling the service
    /// directly with VERIA_API_KEY.
    #[arg(long, env = "VERIA_PROXY_URL")]
    pub proxy_url: Option<Url>,

    /// Path to a screening.toml file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print one JSON object instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Resolves configuration and a screener, then runs the gate. Returns the
/// process exit code.
pub async fn execute(cli: Cli) -> i32 {
    let config = match from_env::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            eprintln!("UNKNOWN: configuration error: {e}");
            return ExitCodes::default().unknown;
        }
    };
    let codes = config.exit_codes;
    let mut stdout = std::io::stdout();

    let result = match &cli.proxy_url {
        Some(proxy_url) => {
            let timeout = Duration::from_secs(config.service.timeout_secs);
            match ProxyClient::new(proxy_url, timeout) {
                Ok(client) => run(&client, &cli.address, &config.gate, &codes, cli.json, &mut stdout).await,
                Err(e) => {
                    eprintln!("UNKNOWN: configuration error: {e}");
                    return codes.unknown;
                }
            }
        }
        None => {
            let boundary = from_env::credential_from_env()
                .and_then(|credential| CredentialBoundary::from_config(&config, credential));
            match boundary {
                Ok(boundary) => run(&boundary, &cli.address, &config.gate, &codes, cli.json, &mut stdout).await,
                Err(e) => {
                    eprintln!("UNKNOWN: configuration error: {e}");
                    return codes.unknown;
                }
            }
        }
    };

    result.unwrap_or_else(|e| {
        error!("Failed to write result: {}", e);
        codes.unknown
    })
}

/// Screens `raw_address`, prints the outcome to `out` and returns the exit
/// code for the gate decision. Errors never map to the allowed code.
pub async fn run<S, W>(
    screener: &S,
    raw_address: &str,
    policy: &GatePolicy,
    codes: &ExitCodes,
    json: bool,
    out: &mut W,
) -> std::io::Result<i32>
where
    S: Screener,
    W: Write,
{
    let outcome = match Address::new(raw_address) {
        Ok(address) => screener.screen(&address).await,
        Err(e) => Err(e),
    };
    let (verdict, error) = match outcome {
        Ok(verdict) => (Some(verdict), None),
        Err(error) => (None, Some(error)),
    };
    let decision = policy.decide(verdict.as_ref(), error.as_ref(), false);

    if json {
        print_json(out, decision, verdict.as_ref(), error.as_ref())?;
    } else {
        print_text(out, policy, decision, verdict.as_ref(), error.as_ref())?;
    }
    Ok(codes.code_for(decision))
}

fn print_text<W: Write>(
    out: &mut W,
    policy: &GatePolicy,
    decision: GateDecision,
    verdict: Option<&ScreeningVerdict>,
    error: Option<&ScreeningError>,
) -> std::io::Result<()> {
    if let Some(verdict) = verdict {
        writeln!(out, "Risk: {}", verdict.risk)?;
        writeln!(out, "Score: {}", verdict.score)?;
        writeln!(out, "Sanctions hit: {}", verdict.details.sanctions_hit)?;
    }
    match (decision, error) {
        (GateDecision::Allowed, _) => writeln!(out, "ALLOWED: Address is safe"),
        (GateDecision::Blocked, _) => match verdict {
            Some(verdict) if policy.blocked_by_sanctions_only(verdict) => {
                writeln!(out, "BLOCKED: Sanctions hit ({} risk)", verdict.risk)
            }
            Some(verdict) => writeln!(out, "BLOCKED: {} risk address", risk_title(verdict.risk)),
            None => writeln!(out, "BLOCKED"),
        },
        (GateDecision::Unknown, Some(error)) => {
            let envelope = ErrorEnvelope::from_error(error);
            writeln!(
                out,
                "UNKNOWN: could not verify address ({}: {})",
                envelope.error, envelope.message
            )
        }
        (GateDecision::Unknown, None) => writeln!(out, "UNKNOWN: could not verify address"),
    }
}

fn risk_title(risk: RiskLevel) -> &'static str {
    match risk {
        RiskLevel::Low => "Low",
        RiskLevel::Medium => "Medium",
        RiskLevel::High => "High",
        RiskLevel::Critical => "Critical",
    }
}

fn print_json<W: Write>(
    out: &mut W,
    decision: GateDecision,
    verdict: Option<&ScreeningVerdict>,
    error: Option<&ScreeningError>,
) -> std::io::Result<()> {
    let value = json!({
        "decision": decision,
        "risk": verdict.map(|v| v.risk),
        "score": verdict.map(|v| v.score),
        "sanctionsHit": verdict.map(|v| v.details.sanctions_hit),
        "error": error.map(ErrorEnvelope::from_error),
    });
    writeln!(out, "{value}")
}
