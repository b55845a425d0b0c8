//! Encoding of the Diffie-Hellman public-value exchange.
//!
//! The handshake is the only unframed traffic: each side sends exactly 8
//! bytes, the little-endian encoding of its public value, server first. A
//! short read here is a handshake failure, never a clean close.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::frame::ProtoError;

/// Wire size of one public value.
pub const PUBLIC_VALUE_LEN: usize = 8;

/// Sends one public value.
///
/// # Errors
///
/// Returns [`ProtoError::Io`] if the write fails or completes short.
pub async fn write_public_value<W>(writer: &mut W, value: u64) -> Result<(), ProtoError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&value.to_le_bytes()).await?;
    Ok(())
}

/// Receives one public value.
///
/// # Errors
///
/// Returns [`ProtoError::Io`] on any failure, including a peer that closes
/// before all 8 bytes arrive.
pub async fn read_public_value<R>(reader: &mut R) -> Result<u64, ProtoError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; PUBLIC_VALUE_LEN];
    reader.read_exact(&mut buf).await?;
    Ok(u64::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn public_value_round_trips() {
        let (mut client, mut server) = tokio::io::duplex(64);

        write_public_value(&mut client, 0xFFFF_FFFF_FFFF_FFC4).await.unwrap();
        let received = read_public_value(&mut server).await.unwrap();

        assert_eq!(received, 0xFFFF_FFFF_FFFF_FFC4);
    }

    #[tokio::test]
    async fn short_exchange_is_an_error() {
        let (mut client, mut server) = tokio::io::duplex(64);

        client.write_all(&[1, 2, 3]).await.unwrap();
        drop(client);

        let result = read_public_value(&mut server).await;
        assert!(matches!(result, Err(ProtoError::Io(_))));
    }
}
