use clap::Parser;
use dotenvy::dotenv;

use veria_gate::cli::{self, Cli};
use veria_gate::telemetry::Telemetry;

#[tokio::main]
async fn main() {
    dotenv().ok();
    Telemetry::new()
        .with_name("veria-screen")
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_default_filter("warn")
        .register();

    let code = cli::execute(Cli::parse()).await;
    std::process::exit(code);
}
