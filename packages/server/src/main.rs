#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Cycle parking API server binary.

use clap::Parser;
use cycle_parking_server::{ServerConfig, interactive, run_server};

/// Serve London cycle parking locations as `GeoJSON`.
#[derive(Debug, Parser)]
#[command(name = "cycle_parking_server")]
struct Args {
    /// Prompt for bind address, port and database URL before starting.
    #[arg(short, long)]
    interactive: bool,

    /// Address to bind to (overrides `BIND_ADDR`).
    #[arg(long)]
    bind_addr: Option<String>,

    /// Port to listen on (overrides `PORT`).
    #[arg(long)]
    port: Option<u16>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let args = Args::parse();

    let mut config = ServerConfig::from_env();
    if let Some(bind_addr) = args.bind_addr {
        config.bind_addr = bind_addr;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    if args.interactive {
        match interactive::prompt(config) {
            Some(chosen) => config = chosen,
            None => return Ok(()),
        }
    }

    run_server(config).await
}
