//! `Basic256Sha256` (§4.4): RSA-PKCS1v1.5-SHA256 signing, RSA-OAEP-SHA1
//! encryption, HMAC-SHA256 symmetric signing, AES-256-CBC symmetric
//! encryption.

use aes::Aes256;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rsa::pkcs1v15::{SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::Oaep;
use sha1::Sha1;
use sha2::Sha256;

use crate::core::{SecurityError, AES256_KEY_LENGTH, AES256_NONCE_LENGTH};

use super::certificate::{parse_private_key, parse_public_key};
use super::policy::{KeyDerivationHash, SecurityPolicy};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Basic256Sha256 security policy.
#[derive(Debug, Default, Clone, Copy)]
pub struct Basic256Sha256;

impl SecurityPolicy for Basic256Sha256 {
    fn uri(&self) -> &'static str {
        crate::core::SECURITY_POLICY_BASIC256SHA256
    }

    fn symmetric_key_length(&self) -> usize {
        AES256_KEY_LENGTH
    }

    fn symmetric_signature_size(&self) -> usize {
        32
    }

    fn symmetric_block_size(&self) -> usize {
        AES256_NONCE_LENGTH / 2
    }

    fn nonce_length(&self) -> usize {
        AES256_NONCE_LENGTH
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

    fn symmetric_encrypt(&self, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, SecurityError> {
        let enc = Aes256CbcEnc::new_from_slices(key, iv).map_err(|_| SecurityError::DecryptionFailed)?;
        Ok(enc.encrypt_padded_vec_mut::<cbc::cipher::block_padding::Pkcs7>(plaintext))
    }

    fn symmetric_decrypt(&self, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, SecurityError> {
        let dec = Aes256CbcDec::new_from_slices(key, iv).map_err(|_| SecurityError::DecryptionFailed)?;
        dec.decrypt_padded_vec_mut::<cbc::cipher::block_padding::Pkcs7>(ciphertext)
            .map_err(|_| SecurityError::DecryptionFailed)
    }

    fn asymmetric_signature_size(&self, key_bits: usize) -> usize {
        key_bits / 8
    }

    fn asymmetric_sign(&self, private_key_der: &[u8], data: &[u8]) -> Result<Vec<u8>, SecurityError> {
        let key = parse_private_key(private_key_der)?;
        let signing_key = SigningKey::<Sha256>::new(key);
        Ok(signing_key.sign(data).to_vec())
    }

    fn asymmetric_verify(&self, public_key_der: &[u8], data: &[u8], signature: &[u8]) -> Result<(), SecurityError> {
        let key = parse_public_key(public_key_der)?;
        let verifying_key = VerifyingKey::<Sha256>::new(key);
        let sig = rsa::pkcs1v15::Signature::try_from(signature).map_err(|_| SecurityError::SignatureInvalid)?;
        verifying_key.verify(data, &sig).map_err(|_| SecurityError::SignatureInvalid)
    }

    fn asymmetric_encrypt(&self, public_key_der: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, SecurityError> {
        let key = parse_public_key(public_key_der)?;
        let mut rng = rand::thread_rng();
        key.encrypt(&mut rng, Oaep::new::<Sha1>(), plaintext)
            .map_err(|_| SecurityError::DecryptionFailed)
    }

    fn asymmetric_decrypt(&self, private_key_der: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, SecurityError> {
        let key = parse_private_key(private_key_der)?;
        key.decrypt(Oaep::new::<Sha1>(), ciphertext).map_err(|_| SecurityError::DecryptionFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_sign_produces_256_bit_mac() {
        let policy = Basic256Sha256;
        let key = vec![9u8; 32];
        let sig = policy.symmetric_sign(&key, b"payload").unwrap();
        assert_eq!(sig.len(), 32);
        assert!(policy.symmetric_verify(&key, b"payload", &sig).is_ok());
    }

    #[test]
    fn symmetric_encrypt_round_trips_with_256_bit_key() {
        let policy = Basic256Sha256;
        let key = vec![3u8; 32];
        let iv = vec![4u8; 16];
        let plaintext = b"basic256sha256 symmetric round trip test vector";
        let ciphertext = policy.symmetric_encrypt(&key, &iv, plaintext).unwrap();
        let decrypted = policy.symmetric_decrypt(&key, &iv, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn declares_policy_parameters_from_spec_table() {
        let policy = Basic256Sha256;
        assert_eq!(policy.symmetric_key_length(), 32);
        assert_eq!(policy.key_derivation_hash(), KeyDerivationHash::Sha256);
    }
}
