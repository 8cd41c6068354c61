//! Client identity and endpoint bootstrap.
//!
//! Handles the client-side inputs an OpenSecureChannel handshake needs
//! before any bytes go on the wire: the client's own application instance
//! certificate/private key pair, and the server endpoint it intends to
//! connect to.

use std::net::SocketAddr;

use thiserror::Error;

/// Errors preparing a client connection.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The supplied certificate could not be parsed.
    #[error("invalid client certificate: {0}")]
    InvalidCertificate(String),

    /// The supplied private key could not be parsed.
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),
}

/// The client's application instance identity: a DER-encoded X.509
/// certificate and the matching PKCS#8 private key, used by asymmetric
/// security policy operations during OpenSecureChannel.
#[derive(Clone)]
pub struct ClientIdentity {
    certificate_der: Vec<u8>,
    private_key_der: Vec<u8>,
}

impl ClientIdentity {
    /// Build an identity from an already-issued certificate and its
    /// private key, both DER-encoded.
    pub fn new(certificate_der: Vec<u8>, private_key_der: Vec<u8>) -> Result<Self, BootstrapError> {
        crate::security::parse_public_key(&certificate_der)
            .map_err(|e| BootstrapError::InvalidCertificate(e.to_string()))?;
        crate::security::parse_private_key(&private_key_der)
            .map_err(|e| BootstrapError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self { certificate_der, private_key_der })
    }

    /// The DER-encoded certificate, as sent in the asymmetric security
    /// header of an OpenSecureChannel request.
    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }

    /// The DER-encoded private key, used locally to sign/decrypt.
    pub fn private_key_der(&self) -> &[u8] {
        &self.private_key_der
    }
}

impl std::fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("certificate_der", &format!("{} bytes", self.certificate_der.len()))
            .field("private_key_der", &"[REDACTED]")
            .finish()
    }
}

/// The server endpoint a client connects to.
#[derive(Debug, Clone)]
pub struct EndpointDescription {
    /// The TCP address to connect to.
    pub addr: SocketAddr,
    /// The endpoint URL advertised in the Hello message.
    pub endpoint_url: String,
    /// The security policy URI this endpoint requires.
    pub security_policy_uri: String,
}

impl EndpointDescription {
    /// Describe an endpoint with no security (`SecurityPolicy#None`).
    pub fn unsecured(addr: SocketAddr, endpoint_url: impl Into<String>) -> Self {
        Self {
            addr,
            endpoint_url: endpoint_url.into(),
            security_policy_uri: crate::core::SECURITY_POLICY_NONE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsecured_endpoint_carries_the_none_policy_uri() {
        let endpoint = EndpointDescription::unsecured(
            "127.0.0.1:4840".parse().unwrap(),
            "opc.tcp://localhost:4840",
        );
        assert_eq!(endpoint.security_policy_uri, crate::core::SECURITY_POLICY_NONE);
    }
}
