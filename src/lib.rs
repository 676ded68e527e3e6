//! Wallet-address screening gate.
//!
//! Holds the screening credential server side ([`boundary`]), exposes it
//! over HTTP ([`handlers`]), and provides the client-side pieces that talk
//! to it ([`proxy_client`], [`cli`]). The screening core itself lives in
//! the `veria-screening` crate and is re-exported here.

pub mod boundary;
pub mod cli;
pub mod from_env;
pub mod handlers;
pub mod proxy_client;
pub mod shutdown;
pub mod telemetry;

pub use veria_screening as screening;
