//! TCP listener accepting UA/TCP connections.

use std::io;
use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};

use crate::channel::ChannelRole;
use crate::security::SecurityPolicy;

use super::connection::UaConnection;

/// Listens for incoming UA/TCP connections and hands each one back as an
/// unhandshaken [`UaConnection`]; the caller drives `server_hello` and the
/// OpenSecureChannel exchange.
pub struct UaListener {
    listener: TcpListener,
    next_secure_channel_id: u32,
}

impl UaListener {
    /// Bind to `addr`.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, next_secure_channel_id: 1 })
    }

    /// The address actually bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept one incoming connection, assigning it the next secure
    /// channel id.
    pub async fn accept(
        &mut self,
        policy_factory: impl FnOnce() -> Box<dyn SecurityPolicy>,
    ) -> io::Result<(UaConnection<TcpStream>, SocketAddr)> {
        let (stream, peer) = self.listener.accept().await?;
        let secure_channel_id = self.next_secure_channel_id;
        self.next_secure_channel_id = self.next_secure_channel_id.wrapping_add(1).max(1);
        let connection =
            UaConnection::from_stream(stream, ChannelRole::Server, secure_channel_id, policy_factory());
        Ok((connection, peer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::NoSecurityPolicy;

    #[tokio::test]
    async fn bind_then_accept_assigns_increasing_channel_ids() {
        let mut listener = UaListener::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client_task = tokio::spawn(async move {
            let _ = TcpStream::connect(addr).await.unwrap();
            let _ = TcpStream::connect(addr).await.unwrap();
        });

        let (first, _) = listener.accept(|| Box::new(NoSecurityPolicy)).await.unwrap();
        let (second, _) = listener.accept(|| Box::new(NoSecurityPolicy)).await.unwrap();
        client_task.await.unwrap();

        assert_eq!(first.channel().secure_channel_id(), 1);
        assert_eq!(second.channel().secure_channel_id(), 2);
    }
}
