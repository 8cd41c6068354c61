//! A UA/TCP connection: drives the Hello/Acknowledge handshake over an
//! async byte stream and provides chunk-level send/receive on top of a
//! [`SecureChannel`] once OpenSecureChannel has completed (§4.5, §6).

use std::time::Instant;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::channel::{
    Acknowledge, ChannelRole, ChunkFlag, ChunkHeader, Hello, MessageType, SecureChannel,
    SequenceHeader, CHUNK_HEADER_SIZE,
};
use crate::core::{
    ChannelError, UaError, DEFAULT_MAX_CHUNK_COUNT, DEFAULT_MAX_MESSAGE_SIZE,
    DEFAULT_RECEIVE_BUFFER_SIZE, DEFAULT_SEND_BUFFER_SIZE, PROTOCOL_VERSION,
};
use crate::security::SecurityPolicy;

use super::framing::{read_chunk, write_chunk};

/// A UA/TCP connection over an async byte stream, paired with the
/// [`SecureChannel`] state machine that governs it.
pub struct UaConnection<T> {
    stream: T,
    channel: SecureChannel,
}

impl UaConnection<TcpStream> {
    /// Connect to `addr` and perform the client-side Hello/Acknowledge
    /// handshake against `endpoint_url`.
    pub async fn connect(
        addr: std::net::SocketAddr,
        endpoint_url: &str,
        secure_channel_id: u32,
        policy: Box<dyn SecurityPolicy>,
    ) -> Result<Self, UaError> {
        let stream = TcpStream::connect(addr).await?;
        let mut connection = Self::from_stream(stream, ChannelRole::Client, secure_channel_id, policy);
        connection.client_hello(endpoint_url).await?;
        Ok(connection)
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> UaConnection<T> {
    /// Wrap an already-connected stream (e.g. one accepted by a listener)
    /// in a fresh, not-yet-handshaken connection.
    pub fn from_stream(
        stream: T,
        role: ChannelRole,
        secure_channel_id: u32,
        policy: Box<dyn SecurityPolicy>,
    ) -> Self {
        Self { stream, channel: SecureChannel::new(role, secure_channel_id, policy) }
    }

    /// The secure channel state machine driving this connection.
    pub fn channel(&self) -> &SecureChannel {
        &self.channel
    }

    /// Mutable access to the secure channel, for completing
    /// OpenSecureChannel once its request/response has been decoded.
    pub fn channel_mut(&mut self) -> &mut SecureChannel {
        &mut self.channel
    }

    async fn client_hello(&mut self, endpoint_url: &str) -> Result<(), UaError> {
        let hello = Hello {
            protocol_version: PROTOCOL_VERSION,
            receive_buffer_size: DEFAULT_RECEIVE_BUFFER_SIZE,
            send_buffer_size: DEFAULT_SEND_BUFFER_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_chunk_count: DEFAULT_MAX_CHUNK_COUNT,
            endpoint_url: endpoint_url.to_string(),
        };
        let mut body = Vec::new();
        hello.encode(&mut body)?;
        self.write_unsecured_chunk(MessageType::Hel, &body).await?;
        self.channel.on_hello_sent()?;

        let (header, body) = read_chunk(&mut self.stream).await?;
        if header.message_type != MessageType::Ack {
            return Err(ChannelError::Protocol("expected Acknowledge".into()).into());
        }
        let ack = Acknowledge::decode(&mut &body[..])?;
        self.channel.on_ack_received(ack)?;
        Ok(())
    }

    /// Server side: read the client's Hello and reply with an Acknowledge
    /// negotiated against `server_offer`.
    pub async fn server_hello(&mut self, server_offer: Acknowledge) -> Result<Hello, UaError> {
        let (header, body) = read_chunk(&mut self.stream).await?;
        if header.message_type != MessageType::Hel {
            return Err(ChannelError::Protocol("expected Hello".into()).into());
        }
        let hello = Hello::decode(&mut &body[..])?;
        let negotiated = self.channel.on_hello_received(&hello, &server_offer)?;

        let mut ack_body = Vec::new();
        negotiated.encode(&mut ack_body)?;
        self.write_unsecured_chunk(MessageType::Ack, &ack_body).await?;
        Ok(hello)
    }

    async fn write_unsecured_chunk(&mut self, message_type: MessageType, body: &[u8]) -> Result<(), UaError> {
        let header = ChunkHeader {
            message_type,
            chunk_flag: ChunkFlag::Final,
            message_size: (CHUNK_HEADER_SIZE + body.len()) as u32,
            secure_channel_id: self.channel.secure_channel_id(),
        };
        write_chunk(&mut self.stream, &header, body).await
    }

    /// Send one single-chunk message, sealed under the channel's current
    /// security token.
    pub async fn send_message(&mut self, message_type: MessageType, plaintext: &[u8]) -> Result<(), UaError> {
        let request_id = self.channel.next_request_id();
        let (sequence_header, signature) = self.channel.seal_chunk(request_id, plaintext)?;
        let token_id = self.channel.current_token_id().unwrap_or(0);

        let mut body = Vec::with_capacity(12 + plaintext.len() + signature.len());
        body.extend_from_slice(&token_id.to_le_bytes());
        body.extend_from_slice(&sequence_header.sequence_number.to_le_bytes());
        body.extend_from_slice(&sequence_header.request_id.to_le_bytes());
        body.extend_from_slice(plaintext);
        body.extend_from_slice(&signature);
        self.write_unsecured_chunk(message_type, &body).await
    }

    /// Receive one single-chunk message, verifying it against the
    /// channel's current (or, within grace, previous) token, and return
    /// its plaintext payload.
    pub async fn recv_message(&mut self, now: Instant) -> Result<(MessageType, Vec<u8>), UaError> {
        let (header, body) = read_chunk(&mut self.stream).await?;
        let signature_len = self.channel.policy().symmetric_signature_size();
        if body.len() < 12 + signature_len {
            return Err(ChannelError::Protocol("truncated chunk body".into()).into());
        }
        let token_id = u32::from_le_bytes(body[0..4].try_into().unwrap());
        let sequence_number = u32::from_le_bytes(body[4..8].try_into().unwrap());
        let request_id = u32::from_le_bytes(body[8..12].try_into().unwrap());
        let (plaintext, signature) = body[12..].split_at(body.len() - 12 - signature_len);

        self.channel.open_chunk(
            token_id,
            SequenceHeader { sequence_number, request_id },
            plaintext,
            signature,
            now,
        )?;
        Ok((header.message_type, plaintext.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::NoSecurityPolicy;
    use tokio::io::DuplexStream;

    fn pair() -> (UaConnection<DuplexStream>, UaConnection<DuplexStream>) {
        let (client_io, server_io) = tokio::io::duplex(4096);
        let client = UaConnection::from_stream(client_io, ChannelRole::Client, 1, Box::new(NoSecurityPolicy));
        let server = UaConnection::from_stream(server_io, ChannelRole::Server, 1, Box::new(NoSecurityPolicy));
        (client, server)
    }

    #[tokio::test]
    async fn hello_acknowledge_handshake_negotiates_and_opens_both_sides() {
        let (mut client, mut server) = pair();
        let server_offer = Acknowledge {
            protocol_version: 0,
            receive_buffer_size: 8192,
            send_buffer_size: 8192,
            max_message_size: 1_000_000,
            max_chunk_count: 10,
        };

        let client_task = tokio::spawn(async move {
            client.client_hello("opc.tcp://localhost:4840").await.unwrap();
            client
        });
        server.server_hello(server_offer).await.unwrap();
        let client = client_task.await.unwrap();

        assert_eq!(client.channel().negotiated().unwrap().receive_buffer_size, 8192);
        assert_eq!(server.channel().negotiated().unwrap().receive_buffer_size, 8192);
    }
}
