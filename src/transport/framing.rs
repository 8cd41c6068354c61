//! Async chunk framing over a byte stream (§6: "every frame begins with a
//! 3-byte ASCII message type, 1-byte chunk flag, and a 4-byte little-endian
//! total length including the 8-byte prefix").

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::channel::{ChunkHeader, CHUNK_HEADER_SIZE};
use crate::core::{Context, UaError};

/// Read one complete chunk (header + body) from `stream`.
///
/// Returns the decoded header and the body bytes that follow it.
pub async fn read_chunk<R: AsyncRead + Unpin>(
    stream: &mut R,
) -> Result<(ChunkHeader, Vec<u8>), UaError> {
    let mut header_buf = [0u8; CHUNK_HEADER_SIZE];
    stream.read_exact(&mut header_buf).await?;
    let header = ChunkHeader::decode(&mut &header_buf[..], &Context::opaque())?;

    let body_len = header.message_size as usize - CHUNK_HEADER_SIZE;
    let mut body = vec![0u8; body_len];
    stream.read_exact(&mut body).await?;
    Ok((header, body))
}

/// Write one complete chunk (header + body) to `stream`.
pub async fn write_chunk<W: AsyncWrite + Unpin>(
    stream: &mut W,
    header: &ChunkHeader,
    body: &[u8],
) -> Result<(), UaError> {
    let mut buf = Vec::with_capacity(CHUNK_HEADER_SIZE + body.len());
    header.encode(&mut buf)?;
    buf.extend_from_slice(body);
    stream.write_all(&buf).await?;
    stream.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChunkFlag, MessageType};

    #[tokio::test]
    async fn write_then_read_round_trips_a_chunk() {
        let header = ChunkHeader {
            message_type: MessageType::Msg,
            chunk_flag: ChunkFlag::Final,
            message_size: (CHUNK_HEADER_SIZE + 3) as u32,
            secure_channel_id: 7,
        };
        let (mut client, mut server) = tokio::io::duplex(256);
        write_chunk(&mut client, &header, b"abc").await.unwrap();
        let (decoded, body) = read_chunk(&mut server).await.unwrap();
        assert_eq!(decoded.secure_channel_id, 7);
        assert_eq!(body, b"abc");
    }

    #[tokio::test]
    async fn read_chunk_rejects_a_message_size_smaller_than_the_header() {
        let (mut client, mut server) = tokio::io::duplex(256);
        let mut raw = Vec::new();
        raw.extend_from_slice(b"MSGF");
        raw.extend_from_slice(&4u32.to_le_bytes());
        raw.extend_from_slice(&1u32.to_le_bytes());
        client.write_all(&raw).await.unwrap();
        drop(client);
        assert!(read_chunk(&mut server).await.is_err());
    }
}
