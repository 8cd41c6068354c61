//! The `SecurityPolicy` trait and the policy-independent hooks every policy
//! shares: thumbprinting, P_SHA key derivation, and nonce generation (§4.4).

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::core::{SecurityError, CERT_THUMBPRINT_SIZE};

/// Hash algorithm used to derive symmetric keys via P_SHA (HMAC-based PRF,
/// RFC 2246 §5 — *not* HKDF; OPC UA specifies the SSL/TLS 1.0 construction).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDerivationHash {
    /// HMAC-SHA1, used by Basic128Rsa15.
    Sha1,
    /// HMAC-SHA256, used by every other defined policy.
    Sha256,
}

fn p_hash_sha1(secret: &[u8], seed: &[u8], out_len: usize) -> Vec<u8> {
    p_hash::<Hmac<Sha1>>(secret, seed, out_len)
}

fn p_hash_sha256(secret: &[u8], seed: &[u8], out_len: usize) -> Vec<u8> {
    p_hash::<Hmac<Sha256>>(secret, seed, out_len)
}

fn p_hash<M: Mac>(secret: &[u8], seed: &[u8], out_len: usize) -> Vec<u8> {
    let new_mac = |secret: &[u8]| M::new_from_slice(secret).expect("HMAC accepts any key length");

    let mut result = Vec::with_capacity(out_len);
    let mut mac = new_mac(secret);
    mac.update(seed);
    let mut a = mac.finalize().into_bytes().to_vec();

    while result.len() < out_len {
        let mut mac = new_mac(secret);
        mac.update(&a);
        mac.update(seed);
        result.extend_from_slice(&mac.finalize().into_bytes());

        let mut mac = new_mac(secret);
        mac.update(&a);
        a = mac.finalize().into_bytes().to_vec();
    }
    result.truncate(out_len);
    result
}

/// Derive `out_len` bytes of key material from `secret`/`seed` using the
/// policy's hash (§4.4 "key derivation (HMAC-based P_SHA per policy hash)").
pub fn derive_p_sha(hash: KeyDerivationHash, secret: &[u8], seed: &[u8], out_len: usize) -> Vec<u8> {
    match hash {
        KeyDerivationHash::Sha1 => p_hash_sha1(secret, seed, out_len),
        KeyDerivationHash::Sha256 => p_hash_sha256(secret, seed, out_len),
    }
}

/// The signing key, encrypting key, and IV derived for one direction of a
/// secure channel (§4.5 "per-direction crypto").
#[derive(Clone)]
pub struct ChannelKeys {
    /// Symmetric signing key.
    pub signing_key: Vec<u8>,
    /// Symmetric encryption key.
    pub encrypting_key: Vec<u8>,
    /// Initialization vector / nonce for the symmetric cipher.
    pub iv: Vec<u8>,
}

impl zeroize::Zeroize for ChannelKeys {
    fn zeroize(&mut self) {
        self.signing_key.zeroize();
        self.encrypting_key.zeroize();
        self.iv.zeroize();
    }
}

impl Drop for ChannelKeys {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.zeroize();
    }
}

/// Keys derived for both directions of a secure channel from a
/// clientNonce/serverNonce pair.
pub struct DerivedKeys {
    /// Keys used by the client to sign/encrypt outbound messages.
    pub client: ChannelKeys,
    /// Keys used by the server to sign/encrypt outbound messages.
    pub server: ChannelKeys,
}

/// Derive both directions' keys from the client and server nonces, per the
/// policy's key/IV lengths and hash (§4.5).
pub fn derive_channel_keys(
    policy: &dyn SecurityPolicy,
    client_nonce: &[u8],
    server_nonce: &[u8],
) -> DerivedKeys {
    let hash = policy.key_derivation_hash();
    let sig_len = policy.symmetric_signature_key_length();
    let enc_len = policy.symmetric_key_length();
    let iv_len = policy.symmetric_block_size();

    let client_material_len = sig_len + enc_len + iv_len;
    let client_material = derive_p_sha(hash, server_nonce, client_nonce, client_material_len);
    let server_material = derive_p_sha(hash, client_nonce, server_nonce, client_material_len);

    let split = |material: Vec<u8>| -> ChannelKeys {
        let (signing_key, rest) = material.split_at(sig_len);
        let (encrypting_key, iv) = rest.split_at(enc_len);
        ChannelKeys {
            signing_key: signing_key.to_vec(),
            encrypting_key: encrypting_key.to_vec(),
            iv: iv.to_vec(),
        }
    };

    DerivedKeys {
        client: split(client_material),
        server: split(server_material),
    }
}

/// SHA-1 thumbprint of a certificate's DER encoding (§4.4: "always SHA-1 of
/// DER", independent of the policy's own hash).
pub fn make_cert_thumbprint(der: &[u8]) -> [u8; CERT_THUMBPRINT_SIZE] {
    let digest = Sha1::digest(der);
    let mut out = [0u8; CERT_THUMBPRINT_SIZE];
    out.copy_from_slice(&digest);
    out
}

/// Generate a cryptographically random nonce of the policy's required
/// length.
pub fn generate_nonce(len: usize) -> Vec<u8> {
    let mut nonce = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}

/// A security policy: a URI plus the algorithm bundles and hooks described
/// in §4.4. Asymmetric/certificate operations default to
/// `BadSecurityPolicyRejected`-style errors for policies that don't use
/// public-key cryptography (`None`, PubSub-Aes256-CTR).
pub trait SecurityPolicy: Send + Sync {
    /// The policy's URI.
    fn uri(&self) -> &'static str;

    /// Symmetric encryption key length, in bytes.
    fn symmetric_key_length(&self) -> usize;

    /// Symmetric signature size, in bytes.
    fn symmetric_signature_size(&self) -> usize;

    /// Symmetric signing key length, in bytes. Defaults to the signature
    /// size (true for the HMAC-based policies defined here).
    fn symmetric_signature_key_length(&self) -> usize {
        self.symmetric_signature_size()
    }

    /// Symmetric cipher block size, in bytes (also the IV length this crate
    /// derives, matching every currently defined policy).
    fn symmetric_block_size(&self) -> usize;

    /// Required nonce length for this policy.
    fn nonce_length(&self) -> usize;

    /// Hash used for this policy's P_SHA key derivation.
    fn key_derivation_hash(&self) -> KeyDerivationHash;

    /// Sign `data` with the symmetric signing key.
    fn symmetric_sign(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, SecurityError>;

    /// Verify a symmetric signature over `data`.
    fn symmetric_verify(&self, key: &[u8], data: &[u8], signature: &[u8]) -> Result<(), SecurityError>;

    /// Encrypt `plaintext` with the symmetric cipher.
    fn symmetric_encrypt(&self, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, SecurityError>;

    /// Decrypt `ciphertext` with the symmetric cipher.
    fn symmetric_decrypt(&self, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, SecurityError>;

    /// Asymmetric signature size in bytes, for the local (our) key.
    fn asymmetric_signature_size(&self, _key_bits: usize) -> usize {
        0
    }

    /// Sign `data` with an RSA private key (DER, PKCS#8), for OPN chunks.
    fn asymmetric_sign(&self, _private_key_der: &[u8], _data: &[u8]) -> Result<Vec<u8>, SecurityError> {
        Err(SecurityError::UnsupportedPolicy(self.uri().to_owned()))
    }

    /// Verify an asymmetric signature with an RSA public key (DER, SPKI).
    fn asymmetric_verify(&self, _public_key_der: &[u8], _data: &[u8], _signature: &[u8]) -> Result<(), SecurityError> {
        Err(SecurityError::UnsupportedPolicy(self.uri().to_owned()))
    }

    /// Encrypt `plaintext` with an RSA public key.
    fn asymmetric_encrypt(&self, _public_key_der: &[u8], _plaintext: &[u8]) -> Result<Vec<u8>, SecurityError> {
        Err(SecurityError::UnsupportedPolicy(self.uri().to_owned()))
    }

    /// Decrypt `ciphertext` with an RSA private key.
    fn asymmetric_decrypt(&self, _private_key_der: &[u8], _ciphertext: &[u8]) -> Result<Vec<u8>, SecurityError> {
        Err(SecurityError::UnsupportedPolicy(self.uri().to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p_sha256_is_deterministic_and_length_exact() {
        let out = derive_p_sha(KeyDerivationHash::Sha256, b"secret", b"seed", 50);
        assert_eq!(out.len(), 50);
        let out2 = derive_p_sha(KeyDerivationHash::Sha256, b"secret", b"seed", 50);
        assert_eq!(out, out2);
    }

    #[test]
    fn p_sha_varies_with_secret() {
        let a = derive_p_sha(KeyDerivationHash::Sha256, b"secret-a", b"seed", 32);
        let b = derive_p_sha(KeyDerivationHash::Sha256, b"secret-b", b"seed", 32);
        assert_ne!(a, b);
    }

    #[test]
    fn thumbprint_is_twenty_bytes() {
        let thumb = make_cert_thumbprint(b"fake-der-bytes");
        assert_eq!(thumb.len(), CERT_THUMBPRINT_SIZE);
    }

    #[test]
    fn nonce_has_requested_length() {
        assert_eq!(generate_nonce(32).len(), 32);
    }
}
