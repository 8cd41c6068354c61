//! `PubSub-Aes256-CTR` (§4.4): HMAC-SHA256 symmetric signing, AES-256-CTR
//! symmetric encryption, no asymmetric or certificate operations — PubSub
//! messages are secured purely with pre-shared symmetric keys.

use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::core::{SecurityError, PUBSUB_ENCRYPTION_KEY_LENGTH, PUBSUB_KEY_NONCE_LENGTH, PUBSUB_MESSAGE_NONCE_LENGTH};

use super::policy::{KeyDerivationHash, SecurityPolicy};

type Aes256Ctr = ctr::Ctr64BE<Aes256>;

/// PubSub-Aes256-CTR security policy.
#[derive(Debug, Default, Clone, Copy)]
pub struct PubSubAes256Ctr;

impl SecurityPolicy for PubSubAes256Ctr {
    fn uri(&self) -> &'static str {
        crate::core::SECURITY_POLICY_PUBSUB_AES256CTR
    }

    fn symmetric_key_length(&self) -> usize {
        PUBSUB_ENCRYPTION_KEY_LENGTH
    }

    fn symmetric_signature_size(&self) -> usize {
        32
    }

    fn symmetric_block_size(&self) -> usize {
        16
    }

    fn nonce_length(&self) -> usize {
        PUBSUB_KEY_NONCE_LENGTH + PUBSUB_MESSAGE_NONCE_LENGTH
    }

    fn key_derivation_hash(&self) -> KeyDerivationHash {
        KeyDerivationHash::Sha256
    }

    fn symmetric_sign(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, SecurityError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(key).map_err(|_| SecurityError::SignatureInvalid)?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn symmetric_verify(&self, key: &[u8], data: &[u8], signature: &[u8]) -> Result<(), SecurityError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(key).map_err(|_| SecurityError::SignatureInvalid)?;
        mac.update(data);
        mac.verify_slice(signature).map_err(|_| SecurityError::SignatureInvalid)
    }

    /// AES-CTR is its own inverse; `iv` is the full 16-byte counter block
    /// (KeyNonce || MessageNonce || 4-byte big-endian block counter,
    /// assembled by the caller per OPC UA Part 14 §7.3.3).
    fn symmetric_encrypt(&self, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, SecurityError> {
        let mut cipher = Aes256Ctr::new_from_slices(key, iv).map_err(|_| SecurityError::DecryptionFailed)?;
        let mut buf = plaintext.to_vec();
        cipher.apply_keystream(&mut buf);
        Ok(buf)
    }

    fn symmetric_decrypt(&self, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, SecurityError> {
        self.symmetric_encrypt(key, iv, ciphertext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctr_encrypt_and_decrypt_are_the_same_operation() {
        let policy = PubSubAes256Ctr;
        let key = vec![1u8; 32];
        let iv = vec![2u8; 16];
        let plaintext = b"pubsub message payload to protect";
        let ciphertext = policy.symmetric_encrypt(&key, &iv, plaintext).unwrap();
        assert_ne!(ciphertext, plaintext);
        let decrypted = policy.symmetric_decrypt(&key, &iv, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn asymmetric_operations_are_unsupported() {
        let policy = PubSubAes256Ctr;
        assert!(policy.asymmetric_sign(&[], b"x").is_err());
        assert!(policy.asymmetric_encrypt(&[], b"x").is_err());
    }

    #[test]
    fn declares_policy_parameters_from_spec_table() {
        let policy = PubSubAes256Ctr;
        assert_eq!(policy.symmetric_key_length(), 32);
        assert_eq!(policy.nonce_length(), 12);
    }
}
