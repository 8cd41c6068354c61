//! UA/TCP chunk framing (§4.5, §3): the 12-byte header shared by every chunk
//! plus the HEL/ACK/ERR handshake messages.

use std::io::{Read, Write};

use crate::core::{
    CodecError, Context, MESSAGE_TYPE_ACK, MESSAGE_TYPE_CLO, MESSAGE_TYPE_ERR, MESSAGE_TYPE_HEL,
    MESSAGE_TYPE_MSG, MESSAGE_TYPE_OPN,
};

/// Which of the six message types a chunk belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Hello — client capability negotiation.
    Hel,
    /// Acknowledge — server's negotiated response to Hello.
    Ack,
    /// Error — fatal protocol error, channel closes after sending/receiving.
    Err,
    /// OpenSecureChannel request/response.
    Opn,
    /// An application message (service request/response).
    Msg,
    /// CloseSecureChannel request/response.
    Clo,
}

impl MessageType {
    fn to_bytes(self) -> [u8; 3] {
        match self {
            MessageType::Hel => MESSAGE_TYPE_HEL,
            MessageType::Ack => MESSAGE_TYPE_ACK,
            MessageType::Err => MESSAGE_TYPE_ERR,
            MessageType::Opn => MESSAGE_TYPE_OPN,
            MessageType::Msg => MESSAGE_TYPE_MSG,
            MessageType::Clo => MESSAGE_TYPE_CLO,
        }
    }

    fn from_bytes(bytes: [u8; 3]) -> Result<Self, CodecError> {
        match bytes {
            MESSAGE_TYPE_HEL => Ok(MessageType::Hel),
            MESSAGE_TYPE_ACK => Ok(MessageType::Ack),
            MESSAGE_TYPE_ERR => Ok(MessageType::Err),
            MESSAGE_TYPE_OPN => Ok(MessageType::Opn),
            MESSAGE_TYPE_MSG => Ok(MessageType::Msg),
            MESSAGE_TYPE_CLO => Ok(MessageType::Clo),
            _ => Err(CodecError::Malformed(format!(
                "unknown message type {:?}",
                String::from_utf8_lossy(&bytes)
            ))),
        }
    }

    /// True for message types that are never chunked (HEL/ACK/ERR always
    /// arrive as a single frame with no chunk flag).
    pub fn is_unchunked(self) -> bool {
        matches!(self, MessageType::Hel | MessageType::Ack | MessageType::Err)
    }
}

/// A chunk's role within its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkFlag {
    /// Final chunk — completes the message.
    Final,
    /// Continuation — more chunks with the same request id follow.
    Continuation,
    /// Abort — the message is incomplete; a status code and reason follow.
    Abort,
}

impl ChunkFlag {
    fn to_byte(self) -> u8 {
        match self {
            ChunkFlag::Final => b'F',
            ChunkFlag::Continuation => b'C',
            ChunkFlag::Abort => b'A',
        }
    }

    fn from_byte(byte: u8) -> Result<Self, CodecError> {
        match byte {
            b'F' => Ok(ChunkFlag::Final),
            b'C' => Ok(ChunkFlag::Continuation),
            b'A' => Ok(ChunkFlag::Abort),
            other => Err(CodecError::Malformed(format!("unknown chunk flag {other:#04x}"))),
        }
    }
}

/// The 12-byte header common to every chunk: message type, chunk flag,
/// total message size (including this header), and the secure channel id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Which message this chunk belongs to.
    pub message_type: MessageType,
    /// This chunk's role in the message.
    pub chunk_flag: ChunkFlag,
    /// Total size of the chunk, header included.
    pub message_size: u32,
    /// Secure channel id this chunk is carried on.
    pub secure_channel_id: u32,
}

pub const CHUNK_HEADER_SIZE: usize = 12;

impl ChunkHeader {
    /// Read a chunk header from `stream`.
    pub fn decode<S: Read + ?Sized>(stream: &mut S, _ctx: &Context<'_>) -> Result<Self, CodecError> {
        let mut type_bytes = [0u8; 3];
        stream
            .read_exact(&mut type_bytes)
            .map_err(|_| CodecError::Malformed("truncated chunk header".into()))?;
        let message_type = MessageType::from_bytes(type_bytes)?;

        let mut flag_byte = [0u8; 1];
        stream
            .read_exact(&mut flag_byte)
            .map_err(|_| CodecError::Malformed("truncated chunk header".into()))?;
        let chunk_flag = ChunkFlag::from_byte(flag_byte[0])?;

        let mut size_bytes = [0u8; 4];
        stream
            .read_exact(&mut size_bytes)
            .map_err(|_| CodecError::Malformed("truncated chunk header".into()))?;
        let message_size = u32::from_le_bytes(size_bytes);

        let mut channel_bytes = [0u8; 4];
        stream
            .read_exact(&mut channel_bytes)
            .map_err(|_| CodecError::Malformed("truncated chunk header".into()))?;
        let secure_channel_id = u32::from_le_bytes(channel_bytes);

        if (message_size as usize) < CHUNK_HEADER_SIZE {
            return Err(CodecError::InvalidLength(message_size as i64));
        }

        Ok(Self {
            message_type,
            chunk_flag,
            message_size,
            secure_channel_id,
        })
    }

    /// Write this chunk header to `stream`.
    pub fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> Result<(), CodecError> {
        let io_err = |_| CodecError::Malformed("I/O error writing chunk header".into());
        stream.write_all(&self.message_type.to_bytes()).map_err(io_err)?;
        stream.write_all(&[self.chunk_flag.to_byte()]).map_err(io_err)?;
        stream.write_all(&self.message_size.to_le_bytes()).map_err(io_err)?;
        stream.write_all(&self.secure_channel_id.to_le_bytes()).map_err(io_err)
    }
}

/// The `Hello` message body, sent by the client to open a UA/TCP connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hello {
    /// Client's requested/supported protocol version.
    pub protocol_version: u32,
    /// Client's receive buffer size.
    pub receive_buffer_size: u32,
    /// Client's send buffer size.
    pub send_buffer_size: u32,
    /// Maximum overall message size the client will accept (0 = no limit).
    pub max_message_size: u32,
    /// Maximum chunk count the client will accept (0 = no limit).
    pub max_chunk_count: u32,
    /// The endpoint URL the client is connecting to.
    pub endpoint_url: String,
}

/// The `Acknowledge` message body, the server's reply to `Hello`, echoing
/// the negotiated (minimum of client/server) parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acknowledge {
    /// Negotiated protocol version.
    pub protocol_version: u32,
    /// Negotiated receive buffer size.
    pub receive_buffer_size: u32,
    /// Negotiated send buffer size.
    pub send_buffer_size: u32,
    /// Negotiated maximum message size.
    pub max_message_size: u32,
    /// Negotiated maximum chunk count.
    pub max_chunk_count: u32,
}

impl Acknowledge {
    /// Negotiate parameters as the minimum of what each side offered, with
    /// 0 meaning "no preference" and excluded from the minimum.
    pub fn negotiate(hello: &Hello, server: &Acknowledge) -> Self {
        let min_nonzero = |a: u32, b: u32| match (a, b) {
            (0, 0) => 0,
            (0, x) | (x, 0) => x,
            (x, y) => x.min(y),
        };
        Self {
            protocol_version: hello.protocol_version.min(server.protocol_version),
            receive_buffer_size: min_nonzero(hello.receive_buffer_size, server.receive_buffer_size),
            send_buffer_size: min_nonzero(hello.send_buffer_size, server.send_buffer_size),
            max_message_size: min_nonzero(hello.max_message_size, server.max_message_size),
            max_chunk_count: min_nonzero(hello.max_chunk_count, server.max_chunk_count),
        }
    }

    /// Write this Acknowledge body (§6: identical field layout to Hello,
    /// minus the endpoint URL).
    pub fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> Result<(), CodecError> {
        write_u32(stream, self.protocol_version)?;
        write_u32(stream, self.receive_buffer_size)?;
        write_u32(stream, self.send_buffer_size)?;
        write_u32(stream, self.max_message_size)?;
        write_u32(stream, self.max_chunk_count)
    }

    /// Read an Acknowledge body from `stream`.
    pub fn decode<S: Read + ?Sized>(stream: &mut S) -> Result<Self, CodecError> {
        Ok(Self {
            protocol_version: read_u32(stream)?,
            receive_buffer_size: read_u32(stream)?,
            send_buffer_size: read_u32(stream)?,
            max_message_size: read_u32(stream)?,
            max_chunk_count: read_u32(stream)?,
        })
    }
}

impl Hello {
    /// Write this Hello body (§6: HEL/ACK layout plus a trailing endpoint
    /// URL string).
    pub fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> Result<(), CodecError> {
        write_u32(stream, self.protocol_version)?;
        write_u32(stream, self.receive_buffer_size)?;
        write_u32(stream, self.send_buffer_size)?;
        write_u32(stream, self.max_message_size)?;
        write_u32(stream, self.max_chunk_count)?;
        write_string(stream, &self.endpoint_url)
    }

    /// Read a Hello body from `stream`.
    pub fn decode<S: Read + ?Sized>(stream: &mut S) -> Result<Self, CodecError> {
        Ok(Self {
            protocol_version: read_u32(stream)?,
            receive_buffer_size: read_u32(stream)?,
            send_buffer_size: read_u32(stream)?,
            max_message_size: read_u32(stream)?,
            max_chunk_count: read_u32(stream)?,
            endpoint_url: read_string(stream)?,
        })
    }
}

/// The `Error` message body: a fatal status code plus a human-readable
/// reason string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    /// The status code explaining the failure.
    pub error: crate::core::StatusCode,
    /// Free-text diagnostic reason.
    pub reason: String,
}

impl ErrorMessage {
    /// Write this Error body (§6: `Error:UInt32, Reason:String`).
    pub fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> Result<(), CodecError> {
        write_u32(stream, self.error.as_raw())?;
        write_string(stream, &self.reason)
    }

    /// Read an Error body from `stream`.
    pub fn decode<S: Read + ?Sized>(stream: &mut S) -> Result<Self, CodecError> {
        let code = read_u32(stream)?;
        let reason = read_string(stream)?;
        Ok(Self { error: crate::core::StatusCode::from_raw(code), reason })
    }
}

fn write_u32<S: Write + ?Sized>(stream: &mut S, value: u32) -> Result<(), CodecError> {
    stream
        .write_all(&value.to_le_bytes())
        .map_err(|_| CodecError::Malformed("I/O error writing UInt32".into()))
}

fn read_u32<S: Read + ?Sized>(stream: &mut S) -> Result<u32, CodecError> {
    let mut bytes = [0u8; 4];
    stream
        .read_exact(&mut bytes)
        .map_err(|_| CodecError::Malformed("truncated UInt32".into()))?;
    Ok(u32::from_le_bytes(bytes))
}

/// Write a UA binary string: `Int32` byte length (-1 for null) then the raw
/// UTF-8 bytes.
fn write_string<S: Write + ?Sized>(stream: &mut S, value: &str) -> Result<(), CodecError> {
    let bytes = value.as_bytes();
    let len = i32::try_from(bytes.len()).map_err(|_| CodecError::InvalidLength(bytes.len() as i64))?;
    stream
        .write_all(&len.to_le_bytes())
        .map_err(|_| CodecError::Malformed("I/O error writing string length".into()))?;
    stream
        .write_all(bytes)
        .map_err(|_| CodecError::Malformed("I/O error writing string bytes".into()))
}

fn read_string<S: Read + ?Sized>(stream: &mut S) -> Result<String, CodecError> {
    let mut len_bytes = [0u8; 4];
    stream
        .read_exact(&mut len_bytes)
        .map_err(|_| CodecError::Malformed("truncated string length".into()))?;
    let len = i32::from_le_bytes(len_bytes);
    if len < 0 {
        return Ok(String::new());
    }
    let mut buf = vec![0u8; len as usize];
    stream
        .read_exact(&mut buf)
        .map_err(|_| CodecError::Malformed("truncated string bytes".into()))?;
    String::from_utf8(buf).map_err(|_| CodecError::Malformed("string is not valid UTF-8".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_header_round_trips() {
        let header = ChunkHeader {
            message_type: MessageType::Msg,
            chunk_flag: ChunkFlag::Final,
            message_size: 128,
            secure_channel_id: 42,
        };
        let mut buf = Vec::new();
        header.encode(&mut buf).unwrap();
        assert_eq!(buf.len(), CHUNK_HEADER_SIZE);

        let ctx = Context::opaque();
        let decoded = ChunkHeader::decode(&mut &buf[..], &ctx).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn rejects_message_size_smaller_than_header() {
        let header = ChunkHeader {
            message_type: MessageType::Msg,
            chunk_flag: ChunkFlag::Final,
            message_size: 4,
            secure_channel_id: 1,
        };
        let mut buf = Vec::new();
        header.encode(&mut buf).unwrap();
        let ctx = Context::opaque();
        assert!(ChunkHeader::decode(&mut &buf[..], &ctx).is_err());
    }

    #[test]
    fn unchunked_message_types_are_identified() {
        assert!(MessageType::Hel.is_unchunked());
        assert!(MessageType::Ack.is_unchunked());
        assert!(MessageType::Err.is_unchunked());
        assert!(!MessageType::Msg.is_unchunked());
        assert!(!MessageType::Opn.is_unchunked());
    }

    #[test]
    fn acknowledge_negotiates_minimum_of_both_sides() {
        let hello = Hello {
            protocol_version: 0,
            receive_buffer_size: 8192,
            send_buffer_size: 65536,
            max_message_size: 0,
            max_chunk_count: 10,
            endpoint_url: "opc.tcp://localhost:4840".into(),
        };
        let server = Acknowledge {
            protocol_version: 0,
            receive_buffer_size: 65536,
            send_buffer_size: 8192,
            max_message_size: 1_000_000,
            max_chunk_count: 0,
        };
        let negotiated = Acknowledge::negotiate(&hello, &server);
        assert_eq!(negotiated.receive_buffer_size, 8192);
        assert_eq!(negotiated.send_buffer_size, 8192);
        assert_eq!(negotiated.max_message_size, 1_000_000);
        assert_eq!(negotiated.max_chunk_count, 10);
    }

    #[test]
    fn hello_body_round_trips_including_endpoint_url() {
        let hello = Hello {
            protocol_version: 0,
            receive_buffer_size: 8192,
            send_buffer_size: 8192,
            max_message_size: 1_000_000,
            max_chunk_count: 10,
            endpoint_url: "opc.tcp://localhost:4840".into(),
        };
        let mut buf = Vec::new();
        hello.encode(&mut buf).unwrap();
        let decoded = Hello::decode(&mut &buf[..]).unwrap();
        assert_eq!(decoded, hello);
    }

    #[test]
    fn acknowledge_body_round_trips() {
        let ack = Acknowledge {
            protocol_version: 0,
            receive_buffer_size: 8192,
            send_buffer_size: 8192,
            max_message_size: 1_000_000,
            max_chunk_count: 10,
        };
        let mut buf = Vec::new();
        ack.encode(&mut buf).unwrap();
        let decoded = Acknowledge::decode(&mut &buf[..]).unwrap();
        assert_eq!(decoded, ack);
    }

    #[test]
    fn error_body_round_trips() {
        let error = ErrorMessage {
            error: crate::core::StatusCode::BadTcpInternalError,
            reason: "out of buffers".into(),
        };
        let mut buf = Vec::new();
        error.encode(&mut buf).unwrap();
        let decoded = ErrorMessage::decode(&mut &buf[..]).unwrap();
        assert_eq!(decoded, error);
    }
}
