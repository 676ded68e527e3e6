//! veria-gate HTTP entrypoint.
//!
//! Runs the credential boundary as an Axum server so that browser clients can
//! screen wallet addresses without ever seeing the screening API key.
//!
//! Endpoints:
//! - `POST /api/screen` – screen `{ "address": ... }`
//! - `GET /health` – liveness
//! - `GET /version` – crate version
//!
//! Environment:
//! - `.env` values loaded at startup
//! - `VERIA_API_KEY` (required), `VERIA_API_URL`, `VERIA_TIMEOUT_SECS`
//! - `GATE_BLOCK_AT`, `GATE_BLOCK_ON_SANCTIONS`, `SCREENING_CONFIG`
//! - `HOST`, `PORT` control the bind address

use axum::http::{header, Method};
use axum::Router;
use dotenvy::dotenv;
use std::sync::Arc;
use tower_http::cors;

use veria_gate::boundary::CredentialBoundary;
use veria_gate::from_env;
use veria_gate::handlers;
use veria_gate::shutdown::ShutdownSignal;
use veria_gate::telemetry::Telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let telemetry = Telemetry::new()
        .with_name(env!("CARGO_PKG_NAME"))
        .with_version(env!("CARGO_PKG_VERSION"))
        .register();

    let config = match from_env::load_config(None) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid screening configuration: {}", e);
            std::process::exit(1);
        }
    };

    // The credential is read exactly once and moved into the boundary.
    let boundary = from_env::credential_from_env()
        .and_then(|credential| CredentialBoundary::from_config(&config, credential));
    let boundary = match boundary {
        Ok(boundary) => Arc::new(boundary),
        Err(e) => {
            tracing::error!("Failed to initialize credential boundary: {}", e);
            std::process::exit(1);
        }
    };

    let http_endpoints = Router::new()
        .merge(handlers::routes().with_state(boundary))
        .layer(telemetry.http_tracing())
        .layer(
            cors::CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE]),
        );

    let addr = from_env::bind_addr_from_env()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        });

    let shutdown = ShutdownSignal::listen()?;
    let token = shutdown.token();
    axum::serve(listener, http_endpoints)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await?;

    shutdown.wait().await;
    tracing::info!("Server stopped");
    Ok(())
}
