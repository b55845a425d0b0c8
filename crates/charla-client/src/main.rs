//! Charla terminal client binary.
//!
//! Deliberately plain: stdin lines go to the server, received messages go
//! to stdout. No line editing, no local echo, no cursor control.
//!
//! # Usage
//!
//! ```bash
//! charla-client --server 127.0.0.1:6677
//! ```

// an interactive client talks on stdout by design
#![allow(clippy::print_stdout)]

use std::io::Write;

use charla_client::Connection;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Charla chat client
#[derive(Parser, Debug)]
#[command(name = "charla-client")]
#[command(about = "Terminal client for the Charla chat server")]
#[command(version)]
struct Args {
    /// Server address to connect to
    #[arg(short, long, default_value = "127.0.0.1:6677")]
    server: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let conn = Connection::connect(&args.server).await?;
    println!("conectado a {}", args.server);
    println!("comandos: /nick <nombre>; /join <sala>");

    let (mut incoming, mut outgoing) = conn.split();

    let mut receiver = tokio::spawn(async move {
        loop {
            match incoming.next_message().await {
                Ok(Some(message)) => {
                    print!("{}", message.text);
                    let _ = std::io::stdout().flush();
                },
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(error = %e, "receive failed");
                    break;
                },
            }
        }
        println!("desconectado del servidor.");
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = &mut receiver => break,
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        if let Err(e) = outgoing.send_line(&line).await {
                            tracing::debug!(error = %e, "send failed");
                            break;
                        }
                    },
                    None => break,
                }
            },
        }
    }

    Ok(())
}
