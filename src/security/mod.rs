//! Security policies and certificate validation (C4).
//!
//! A security policy is a pure data object: a URI plus five algorithm
//! bundles (asymmetric signature, asymmetric encryption, symmetric
//! signature, symmetric encryption, certificate signature) plus a handful of
//! policy-wide hooks (thumbprint, key derivation, nonce generation). The
//! four named policies below are thin parameter sets over the primitives in
//! `policy::{ChannelKeys, DerivedKeys}`; the channel layer (C5) is the only
//! caller that needs to know which one is in effect.

mod aes256sha256rsapss;
mod basic128rsa15;
mod basic256sha256;
mod certificate;
mod policy;
mod pubsub_aes256ctr;

pub use aes256sha256rsapss::Aes256Sha256RsaPss;
pub use basic128rsa15::Basic128Rsa15;
pub use basic256sha256::Basic256Sha256;
pub use certificate::{CertificateStore, CrlStore, TrustListEntry};
pub(crate) use certificate::{parse_private_key, parse_public_key};
pub use policy::{
    derive_channel_keys, derive_p_sha, generate_nonce, make_cert_thumbprint, ChannelKeys, DerivedKeys,
    KeyDerivationHash, SecurityPolicy,
};
pub use pubsub_aes256ctr::PubSubAes256Ctr;

/// The `None` security policy: no signing, no encryption. Every bundle's
/// operations are no-ops that pass data through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSecurityPolicy;

impl SecurityPolicy for NoSecurityPolicy {
    fn uri(&self) -> &'static str {
        crate::core::SECURITY_POLICY_NONE
    }

    fn symmetric_key_length(&self) -> usize {
        0
    }

    fn symmetric_signature_size(&self) -> usize {
        0
    }

    fn symmetric_block_size(&self) -> usize {
        1
    }

    fn nonce_length(&self) -> usize {
        0
    }

    fn key_derivation_hash(&self) -> KeyDerivationHash {
        KeyDerivationHash::Sha1
    }

    fn symmetric_sign(&self, _key: &[u8], _data: &[u8]) -> Result<Vec<u8>, crate::core::SecurityError> {
        Ok(Vec::new())
    }

    fn symmetric_verify(&self, _key: &[u8], _data: &[u8], _signature: &[u8]) -> Result<(), crate::core::SecurityError> {
        Ok(())
    }

    fn symmetric_encrypt(&self, _key: &[u8], _iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, crate::core::SecurityError> {
        Ok(plaintext.to_vec())
    }

    fn symmetric_decrypt(&self, _key: &[u8], _iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, crate::core::SecurityError> {
        Ok(ciphertext.to_vec())
    }
}

/// Resolve a security policy implementation by its URI (§4.4).
pub fn policy_for_uri(uri: &str) -> Result<Box<dyn SecurityPolicy>, crate::core::SecurityError> {
    match uri {
        crate::core::SECURITY_POLICY_NONE => Ok(Box::new(NoSecurityPolicy)),
        crate::core::SECURITY_POLICY_BASIC128RSA15 => Ok(Box::new(Basic128Rsa15)),
        crate::core::SECURITY_POLICY_BASIC256SHA256 => Ok(Box::new(Basic256Sha256)),
        crate::core::SECURITY_POLICY_AES256SHA256RSAPSS => Ok(Box::new(Aes256Sha256RsaPss)),
        crate::core::SECURITY_POLICY_PUBSUB_AES256CTR => Ok(Box::new(PubSubAes256Ctr)),
        other => Err(crate::core::SecurityError::UnsupportedPolicy(other.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_policy_uris() {
        assert!(policy_for_uri(crate::core::SECURITY_POLICY_NONE).is_ok());
        assert!(policy_for_uri(crate::core::SECURITY_POLICY_BASIC256SHA256).is_ok());
    }

    #[test]
    fn rejects_unknown_uri() {
        let err = policy_for_uri("http://example.com/bogus").unwrap_err();
        assert!(matches!(err, crate::core::SecurityError::UnsupportedPolicy(_)));
    }
}
