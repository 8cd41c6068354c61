//! High-level OPC UA client API: connects, opens a secure channel, creates
//! and activates a session, and exchanges service requests/responses.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::Mutex;

use crate::channel::MessageType;
use crate::core::UaError;
use crate::security::SecurityPolicy;
use crate::session::UserIdentityToken;
use crate::transport::UaConnection;

use super::bootstrap::EndpointDescription;

/// Errors from the high-level client API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The underlying secure channel or transport failed.
    #[error(transparent)]
    Ua(#[from] UaError),

    /// The client was asked to send a request while disconnected.
    #[error("client is not connected")]
    Disconnected,

    /// A request's matching response never arrived.
    #[error("request timed out")]
    Timeout,
}

/// Client-side configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// The endpoint to connect to.
    pub endpoint: EndpointDescription,
    /// How long to wait for the Hello/Acknowledge handshake.
    pub connect_timeout: Duration,
    /// Requested session timeout (§4.6), subject to server revision.
    pub requested_session_timeout: Duration,
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct UaClientBuilder {
    endpoint: EndpointDescription,
    connect_timeout: Duration,
    requested_session_timeout: Duration,
}

impl UaClientBuilder {
    /// Start building a config for the given endpoint.
    pub fn new(endpoint: EndpointDescription) -> Self {
        Self {
            endpoint,
            connect_timeout: Duration::from_secs(10),
            requested_session_timeout: crate::core::DEFAULT_SESSION_TIMEOUT,
        }
    }

    /// Set the handshake connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the session timeout requested at `CreateSession`.
    pub fn requested_session_timeout(mut self, timeout: Duration) -> Self {
        self.requested_session_timeout = timeout;
        self
    }

    /// Finish building the configuration.
    pub fn build(self) -> ClientConfig {
        ClientConfig {
            endpoint: self.endpoint,
            connect_timeout: self.connect_timeout,
            requested_session_timeout: self.requested_session_timeout,
        }
    }
}

/// A connected OPC UA client: owns the secure channel and serializes
/// request/response exchanges over it.
pub struct UaClient {
    connection: Arc<Mutex<UaConnection<tokio::net::TcpStream>>>,
    config: ClientConfig,
}

impl UaClient {
    /// Connect to `config.endpoint` and complete the Hello/Acknowledge
    /// handshake. OpenSecureChannel and CreateSession/ActivateSession are
    /// driven separately via [`Self::send_request`], since their request
    /// bodies are service-layer concerns this crate leaves to the caller's
    /// chosen encodeable types.
    pub async fn connect(config: ClientConfig, policy: Box<dyn SecurityPolicy>) -> Result<Self, ClientError> {
        let connection = tokio::time::timeout(
            config.connect_timeout,
            UaConnection::connect(config.endpoint.addr, &config.endpoint.endpoint_url, 0, policy),
        )
        .await
        .map_err(|_| ClientError::Timeout)??;

        Ok(Self { connection: Arc::new(Mutex::new(connection)), config })
    }

    /// Send one message and wait for its matching reply on the same
    /// request id, identified by [`MessageType::Msg`] chunks exchanged
    /// over the secure channel.
    pub async fn send_request(&self, plaintext: &[u8]) -> Result<Vec<u8>, ClientError> {
        let mut connection = self.connection.lock().await;
        connection.send_message(MessageType::Msg, plaintext).await?;
        let (_message_type, body) = connection.recv_message(Instant::now()).await?;
        Ok(body)
    }

    /// The identity this client will present at `ActivateSession`, when
    /// called with a concrete token.
    pub fn anonymous_identity() -> UserIdentityToken {
        UserIdentityToken::Anonymous
    }

    /// The client's configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_to_the_spec_session_timeout() {
        let endpoint = EndpointDescription::unsecured(
            "127.0.0.1:4840".parse().unwrap(),
            "opc.tcp://localhost:4840",
        );
        let config = UaClientBuilder::new(endpoint).build();
        assert_eq!(config.requested_session_timeout, crate::core::DEFAULT_SESSION_TIMEOUT);
    }

    #[test]
    fn anonymous_identity_is_the_anonymous_token() {
        assert!(matches!(UaClient::anonymous_identity(), UserIdentityToken::Anonymous));
    }
}
