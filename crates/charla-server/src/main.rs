//! Charla server binary.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default port (6677) on all interfaces
//! charla-server
//!
//! # Custom address and more verbose logging
//! charla-server --bind 127.0.0.1:7000 --log-level debug
//! ```

use std::time::Duration;

use charla_server::{Server, ServerConfig};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Charla chat server
#[derive(Parser, Debug)]
#[command(name = "charla-server")]
#[command(about = "Multi-room chat server with per-connection stream encryption")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:6677")]
    bind: String,

    /// Seconds to wait for a client's public value during the handshake
    #[arg(long, default_value = "10")]
    handshake_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = ServerConfig {
        bind_address: args.bind,
        handshake_timeout: Duration::from_secs(args.handshake_timeout),
    };

    let server = Server::bind(config).await?;

    tracing::info!("listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}
