//! Charla wire protocol.
//!
//! Everything that crosses the TCP connection is defined here:
//!
//! - the handshake exchange of raw 64-bit Diffie-Hellman public values
//!   ([`handshake`]), and
//! - the typed, length-prefixed application frames that follow, each
//!   carrying one NUL-terminated line transformed by the session's stream
//!   cipher ([`frame`]).
//!
//! TCP does not preserve message boundaries, so frames carry an explicit
//! length prefix; a reader always knows exactly how many bytes the next
//! frame occupies.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod frame;
pub mod handshake;

pub use frame::{
    Frame, FrameHeader, MAX_PAYLOAD, MsgType, ProtoError, encode_frame, open_line, read_frame,
    seal_line,
};
pub use handshake::{PUBLIC_VALUE_LEN, read_public_value, write_public_value};

/// Default TCP port for the chat service.
pub const DEFAULT_PORT: u16 = 6677;

/// Maximum visible length in bytes of a display name (terminator excluded).
pub const MAX_NAME_LEN: usize = 31;

/// Maximum visible length in bytes of a room name (terminator excluded).
pub const MAX_ROOM_LEN: usize = 31;
