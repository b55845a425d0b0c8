//! Server error types.

use charla_crypto::CryptoError;
use charla_proto::ProtoError;

/// Errors that can occur in the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Transport/network failure; terminates the affected connection only,
    /// or the whole server when binding fails at startup.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The key exchange with a client failed before registration.
    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),
}

/// Failures during the Diffie-Hellman exchange.
///
/// All of these abort the connection before it is registered, so they can
/// never leave registry side effects behind.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// The private exponent could not be generated.
    #[error("key generation failed: {0}")]
    KeyGen(#[from] CryptoError),

    /// Sending or receiving a public value failed or came up short.
    #[error("key exchange failed: {0}")]
    Exchange(#[from] ProtoError),

    /// The client never sent its public value.
    #[error("timed out waiting for the peer public value")]
    Timeout,
}
