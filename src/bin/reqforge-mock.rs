//! Mock-response server process

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use reqforge::errors::{ReqforgeError, Result};
use reqforge::mock::{MockServer, MockServerConfig};

#[derive(Parser, Debug)]
#[command(name = "reqforge-mock", about = "Standalone mock-response server", version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// JSON config file with routes
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match args.config {
        Some(ref path) => MockServerConfig::load(path)?,
        None => MockServerConfig::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }

    let addr: SocketAddr = config
        .address()
        .parse()
        .map_err(|e| ReqforgeError::Config(format!("invalid address: {}", e)))?;

    let server = MockServer::new(config)?;
    server.serve(addr).await
}
