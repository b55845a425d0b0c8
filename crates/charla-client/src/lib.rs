//! Client side of the Charla transport contract.
//!
//! [`Connection::connect`] dials the server, runs the Diffie-Hellman
//! exchange (server's public value arrives first), and derives the session
//! key. After that, [`send_line`](Connection::send_line) seals outgoing
//! lines and [`next_message`](Connection::next_message) opens incoming
//! frames. [`split`](Connection::split) separates the two directions for
//! concurrent use, the usual shape for an interactive client with one task
//! reading the server and another reading the user.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use charla_crypto::{
    CryptoError, KEY_LENGTH, compute_public_key, compute_shared_secret, generate_private_key,
    session_key,
};
use charla_proto::{
    MsgType, ProtoError, open_line, read_frame, read_public_value, seal_line, write_public_value,
};
use tokio::{
    io::AsyncWriteExt,
    net::{
        TcpStream, ToSocketAddrs,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
};

/// Errors from the client transport.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Underlying socket failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire protocol failure, the handshake included.
    #[error("protocol error: {0}")]
    Proto(#[from] ProtoError),

    /// The private exponent could not be generated.
    #[error("key generation failed: {0}")]
    Crypto(#[from] CryptoError),
}

/// One message received from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerMessage {
    /// Declared frame type (chat relay or system message).
    pub kind: MsgType,
    /// Decrypted message text, trailing newline included.
    pub text: String,
}

/// An established, keyed connection to a Charla server.
pub struct Connection {
    incoming: Incoming,
    outgoing: Outgoing,
}

/// The receive half of a split [`Connection`].
pub struct Incoming {
    reader: OwnedReadHalf,
    key: [u8; KEY_LENGTH],
}

/// The send half of a split [`Connection`].
pub struct Outgoing {
    writer: OwnedWriteHalf,
    key: [u8; KEY_LENGTH],
}

impl Connection {
    /// Dials the server and completes the key exchange.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the TCP connect, the exchange, or key
    /// generation fails.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ClientError> {
        let mut stream = TcpStream::connect(addr).await?;

        let server_public = read_public_value(&mut stream).await?;
        let private = generate_private_key()?;
        write_public_value(&mut stream, compute_public_key(private)).await?;

        let key = session_key(compute_shared_secret(server_public, private));
        let (reader, writer) = stream.into_split();

        Ok(Self { incoming: Incoming { reader, key }, outgoing: Outgoing { writer, key } })
    }

    /// Seals and sends one line; see [`Outgoing::send_line`].
    pub async fn send_line(&mut self, line: &str) -> Result<(), ClientError> {
        self.outgoing.send_line(line).await
    }

    /// Receives the next message; see [`Incoming::next_message`].
    pub async fn next_message(&mut self) -> Result<Option<ServerMessage>, ClientError> {
        self.incoming.next_message().await
    }

    /// Splits the connection into independently usable halves.
    pub fn split(self) -> (Incoming, Outgoing) {
        (self.incoming, self.outgoing)
    }
}

impl Outgoing {
    /// Seals and sends one line.
    ///
    /// Lines starting with `/` travel as commands, everything else as chat.
    /// A trailing newline is appended when missing, matching what the
    /// server expects to trim.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] if the write fails.
    pub async fn send_line(&mut self, line: &str) -> Result<(), ClientError> {
        let kind = if line.starts_with('/') { MsgType::Command } else { MsgType::Chat };

        let mut text = line.to_owned();
        if !text.ends_with('\n') {
            text.push('\n');
        }

        self.writer.write_all(&seal_line(kind, &text, &self.key)).await?;
        Ok(())
    }
}

impl Incoming {
    /// Receives and opens the next message.
    ///
    /// Returns `Ok(None)` when the server closes the connection.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Proto`] on transport failure or a malformed
    /// frame.
    pub async fn next_message(&mut self) -> Result<Option<ServerMessage>, ClientError> {
        match read_frame(&mut self.reader).await? {
            Some(frame) => {
                let mut payload = frame.payload;
                let text = open_line(&mut payload, &self.key);
                Ok(Some(ServerMessage { kind: frame.kind, text }))
            },
            None => Ok(None),
        }
    }
}
