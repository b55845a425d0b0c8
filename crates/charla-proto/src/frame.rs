//! Typed, length-prefixed application frames.
//!
//! Each frame is a 5-byte header — type byte plus little-endian payload
//! length — followed by the payload: one NUL-terminated line with every
//! byte, terminator included, transformed by the session's stream cipher.
//!
//! [`seal_line`] and [`open_line`] are the only places the cipher touches
//! the wire format, so server and client cannot drift apart on framing.

use bytes::{Bytes, BytesMut};
use charla_crypto::{KEY_LENGTH, xor_crypt};
use tokio::io::{AsyncRead, AsyncReadExt};
use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned, byteorder::little_endian::U32,
};

/// Upper bound on a frame payload, terminator included.
pub const MAX_PAYLOAD: usize = 2048;

/// Discriminant for the frame type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MsgType {
    /// Diffie-Hellman public value (reserved; the handshake is unframed).
    DhPublic = 0x01,
    /// Chat line, relayed verbatim between users.
    Chat = 0x02,
    /// Slash command from a client.
    Command = 0x03,
    /// System message originated by the server.
    Server = 0x04,
}

impl MsgType {
    /// Decodes a type byte, rejecting unknown values.
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0x01 => Some(Self::DhPublic),
            0x02 => Some(Self::Chat),
            0x03 => Some(Self::Command),
            0x04 => Some(Self::Server),
            _ => None,
        }
    }
}

/// On-wire frame header.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct FrameHeader {
    /// Frame type byte; see [`MsgType`].
    pub msg_type: u8,
    /// Payload length in bytes, little-endian.
    pub length: U32,
}

impl FrameHeader {
    /// Encoded size of the header.
    pub const SIZE: usize = core::mem::size_of::<Self>();

    /// Reinterprets exactly [`Self::SIZE`] bytes as a header.
    ///
    /// # Errors
    ///
    /// Returns [`ProtoError::MalformedHeader`] if `bytes` is not exactly
    /// [`Self::SIZE`] bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtoError> {
        Self::read_from_bytes(bytes).map_err(|_| ProtoError::MalformedHeader)
    }
}

/// One decoded frame: its type and the still-encrypted payload.
#[derive(Debug)]
pub struct Frame {
    /// Declared frame type.
    pub kind: MsgType,
    /// Encrypted payload bytes, decrypted in place by [`open_line`].
    pub payload: BytesMut,
}

/// Errors from frame encoding and decoding.
#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    /// Underlying transport failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Declared payload length exceeds [`MAX_PAYLOAD`].
    #[error("frame payload of {len} bytes exceeds limit of {max}")]
    FrameTooLarge {
        /// Declared payload length.
        len: usize,
        /// Enforced maximum.
        max: usize,
    },

    /// Type byte is not a known [`MsgType`].
    #[error("unknown message type byte {0:#04x}")]
    UnknownMessageType(u8),

    /// Header bytes could not be reinterpreted.
    #[error("malformed frame header")]
    MalformedHeader,
}

/// Reads one frame, distinguishing a clean close from a failure.
///
/// Returns `Ok(None)` when the peer closes the connection at a frame
/// boundary (or mid-header; the remainder of a torn header is
/// indistinguishable from a close and is treated as one).
///
/// # Errors
///
/// Returns [`ProtoError`] on transport failure, an unknown type byte, or an
/// oversized declared length.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Frame>, ProtoError>
where
    R: AsyncRead + Unpin,
{
    let mut header_buf = [0u8; FrameHeader::SIZE];
    match reader.read_exact(&mut header_buf).await {
        Ok(_) => {},
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let header = FrameHeader::from_bytes(&header_buf)?;
    let kind =
        MsgType::from_u8(header.msg_type).ok_or(ProtoError::UnknownMessageType(header.msg_type))?;

    let len = header.length.get() as usize;
    if len > MAX_PAYLOAD {
        return Err(ProtoError::FrameTooLarge { len, max: MAX_PAYLOAD });
    }

    let mut payload = BytesMut::zeroed(len);
    reader.read_exact(&mut payload).await?;

    Ok(Some(Frame { kind, payload }))
}

/// Prefixes `payload` with a frame header.
pub fn encode_frame(kind: MsgType, payload: &[u8]) -> Bytes {
    let header = FrameHeader { msg_type: kind as u8, length: U32::new(payload.len() as u32) };

    let mut buf = BytesMut::with_capacity(FrameHeader::SIZE + payload.len());
    buf.extend_from_slice(header.as_bytes());
    buf.extend_from_slice(payload);
    buf.freeze()
}

/// Seals one line into a ready-to-send frame.
///
/// Appends the NUL terminator, encrypts terminator and all, and prefixes
/// the header.
pub fn seal_line(kind: MsgType, line: &str, key: &[u8; KEY_LENGTH]) -> Bytes {
    let mut payload = Vec::with_capacity(line.len() + 1);
    payload.extend_from_slice(line.as_bytes());
    payload.push(0);
    xor_crypt(&mut payload, key);
    encode_frame(kind, &payload)
}

/// Opens a sealed payload back into a line.
///
/// Decrypts in place, truncates at the first NUL, and converts lossily —
/// a mismatched key yields mojibake rather than a failure, mirroring the
/// byte-string semantics of the wire.
pub fn open_line(payload: &mut [u8], key: &[u8; KEY_LENGTH]) -> String {
    xor_crypt(payload, key);
    let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
    String::from_utf8_lossy(&payload[..end]).into_owned()
}
