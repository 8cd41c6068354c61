//! `Basic128Rsa15` (§4.4): RSA-PKCS1v1.5-SHA1 asymmetric ops, HMAC-SHA1
//! symmetric signing, AES-128-CBC symmetric encryption.

use aes::Aes128;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rsa::pkcs1v15::{Pkcs1v15Encrypt, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use sha1::Sha1;

use crate::core::{SecurityError, BASIC128RSA15_KEY_LENGTH, BASIC128RSA15_NONCE_LENGTH};

use super::certificate::{parse_private_key, parse_public_key};
use super::policy::{KeyDerivationHash, SecurityPolicy};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Basic128Rsa15 security policy.
#[derive(Debug, Default, Clone, Copy)]
pub struct Basic128Rsa15;

impl SecurityPolicy for Basic128Rsa15 {
    fn uri(&self) -> &'static str {
        crate::core::SECURITY_POLICY_BASIC128RSA15
    }

    fn symmetric_key_length(&self) -> usize {
        BASIC128RSA15_KEY_LENGTH
    }

    fn symmetric_signature_size(&self) -> usize {
        20
    }

    fn symmetric_block_size(&self) -> usize {
        BASIC128RSA15_NONCE_LENGTH
    }

    fn nonce_length(&self) -> usize {
        BASIC128RSA15_NONCE_LENGTH
    }

    fn key_derivation_hash(&self) -> KeyDerivationHash {
        KeyDerivationHash::Sha1
    }

    fn symmetric_sign(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, SecurityError> {
        let mut mac = Hmac::<Sha1>::new_from_slice(key).map_err(|_| SecurityError::SignatureInvalid)?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn symmetric_verify(&self, key: &[u8], data: &[u8], signature: &[u8]) -> Result<(), SecurityError> {
        let mut mac = Hmac::<Sha1>::new_from_slice(key).map_err(|_| SecurityError::SignatureInvalid)?;
        mac.update(data);
        mac.verify_slice(signature).map_err(|_| SecurityError::SignatureInvalid)
    }

    fn symmetric_encrypt(&self, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, SecurityError> {
        let enc = Aes128CbcEnc::new_from_slices(key, iv).map_err(|_| SecurityError::DecryptionFailed)?;
        Ok(enc.encrypt_padded_vec_mut::<cbc::cipher::block_padding::Pkcs7>(plaintext))
    }

    fn symmetric_decrypt(&self, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, SecurityError> {
        let dec = Aes128CbcDec::new_from_slices(key, iv).map_err(|_| SecurityError::DecryptionFailed)?;
        dec.decrypt_padded_vec_mut::<cbc::cipher::block_padding::Pkcs7>(ciphertext)
            .map_err(|_| SecurityError::DecryptionFailed)
    }

    fn asymmetric_signature_size(&self, key_bits: usize) -> usize {
        key_bits / 8
    }

    fn asymmetric_sign(&self, private_key_der: &[u8], data: &[u8]) -> Result<Vec<u8>, SecurityError> {
        let key = parse_private_key(private_key_der)?;
        let signing_key = SigningKey::<Sha1>::new(key);
        Ok(signing_key.sign(data).to_vec())
    }

    fn asymmetric_verify(&self, public_key_der: &[u8], data: &[u8], signature: &[u8]) -> Result<(), SecurityError> {
        let key = parse_public_key(public_key_der)?;
        let verifying_key = VerifyingKey::<Sha1>::new(key);
        let sig = rsa::pkcs1v15::Signature::try_from(signature).map_err(|_| SecurityError::SignatureInvalid)?;
        verifying_key.verify(data, &sig).map_err(|_| SecurityError::SignatureInvalid)
    }

    fn asymmetric_encrypt(&self, public_key_der: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, SecurityError> {
        let key = parse_public_key(public_key_der)?;
        let mut rng = rand::thread_rng();
        key.encrypt(&mut rng, Pkcs1v15Encrypt, plaintext)
            .map_err(|_| SecurityError::DecryptionFailed)
    }

    fn asymmetric_decrypt(&self, private_key_der: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, SecurityError> {
        let key = parse_private_key(private_key_der)?;
        key.decrypt(Pkcs1v15Encrypt, ciphertext).map_err(|_| SecurityError::DecryptionFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_sign_and_verify_round_trip() {
        let policy = Basic128Rsa15;
        let key = vec![7u8; 16];
        let sig = policy.symmetric_sign(&key, b"hello").unwrap();
        assert_eq!(sig.len(), 20);
        assert!(policy.symmetric_verify(&key, b"hello", &sig).is_ok());
        assert!(policy.symmetric_verify(&key, b"tampered", &sig).is_err());
    }

    #[test]
    fn symmetric_encrypt_round_trips() {
        let policy = Basic128Rsa15;
        let key = vec![1u8; 16];
        let iv = vec![2u8; 16];
        let plaintext = b"a block of plaintext that spans multiple AES blocks!!";
        let ciphertext = policy.symmetric_encrypt(&key, &iv, plaintext).unwrap();
        let decrypted = policy.symmetric_decrypt(&key, &iv, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn declares_policy_parameters_from_spec_table() {
        let policy = Basic128Rsa15;
        assert_eq!(policy.symmetric_key_length(), 16);
        assert_eq!(policy.nonce_length(), 16);
        assert_eq!(policy.key_derivation_hash(), KeyDerivationHash::Sha1);
    }
}
