//! Per-connection task: handshake, receive loop, and outbound writer.
//!
//! A connection moves through its lifetime sequentially: handshake first
//! (no registry side effects until it succeeds), then registration, then
//! the receive loop until the peer closes or misbehaves. Teardown is not a
//! phase of its own — it rides on the session guard's `Drop`, so it runs on
//! every exit path, early returns and panics included.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use charla_crypto::{
    KEY_LENGTH, compute_public_key, compute_shared_secret, generate_private_key, session_key,
};
use charla_proto::{MsgType, open_line, read_frame, read_public_value, write_public_value};
use tokio::{
    io::{AsyncWriteExt, BufReader},
    net::{TcpStream, tcp::OwnedWriteHalf},
    sync::mpsc::{self, UnboundedReceiver},
};

use crate::{
    error::{HandshakeError, ServerError},
    registry::Registry,
    session::Session,
};

/// Drives one accepted connection to completion.
///
/// # Errors
///
/// Returns [`ServerError::Handshake`] when the key exchange fails; receive
/// failures after registration are terminal for the connection but are
/// logged rather than propagated.
pub(crate) async fn run_connection(
    mut stream: TcpStream,
    registry: Arc<Registry>,
    conn_id: u64,
    handshake_timeout: Duration,
) -> Result<(), ServerError> {
    let key = handshake(&mut stream, handshake_timeout).await?;
    tracing::debug!(conn_id, "handshake complete");

    let (read_half, write_half) = stream.into_split();
    let (outbound, outbound_rx) = mpsc::unbounded_channel();
    tokio::spawn(write_outbound(conn_id, outbound_rx, write_half));

    let mut session = Session::register(registry, conn_id, key, outbound);
    let mut reader = BufReader::new(read_half);

    loop {
        match read_frame(&mut reader).await {
            Ok(Some(frame)) => {
                match frame.kind {
                    MsgType::Chat | MsgType::Command => {},
                    other => {
                        tracing::warn!(conn_id, kind = ?other, "unexpected frame type from client");
                        break;
                    },
                }
                let mut payload = frame.payload;
                let line = open_line(&mut payload, session.key());
                session.handle_line(&line);
            },
            Ok(None) => {
                tracing::debug!(conn_id, "peer closed the connection");
                break;
            },
            Err(e) => {
                tracing::debug!(conn_id, error = %e, "receive failed");
                break;
            },
        }
    }

    // session drops here: unregister, then announce the departure
    Ok(())
}

/// Runs the Diffie-Hellman exchange: our public value out, theirs in.
async fn handshake(
    stream: &mut TcpStream,
    timeout: Duration,
) -> Result<[u8; KEY_LENGTH], HandshakeError> {
    let server_private = generate_private_key()?;
    let server_public = compute_public_key(server_private);

    write_public_value(stream, server_public).await?;
    let client_public = tokio::time::timeout(timeout, read_public_value(stream))
        .await
        .map_err(|_| HandshakeError::Timeout)??;

    let shared_secret = compute_shared_secret(client_public, server_private);
    Ok(session_key(shared_secret))
}

/// Drains sealed frames onto the socket until every sender is gone.
///
/// The write half lives here, so dropping the last sender (registry entry
/// plus the session's own handle) is what finally closes the stream.
async fn write_outbound(
    conn_id: u64,
    mut outbound_rx: UnboundedReceiver<Bytes>,
    mut write_half: OwnedWriteHalf,
) {
    while let Some(frame) = outbound_rx.recv().await {
        if let Err(e) = write_half.write_all(&frame).await {
            tracing::debug!(conn_id, error = %e, "outbound write failed");
            break;
        }
    }
}
