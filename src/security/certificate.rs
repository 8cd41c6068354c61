//! Certificate chain validation (§4.4, OPC UA Part 6 §6.1.3).
//!
//! A `CertificateStore` holds the trust list (CAs and directly trusted peer
//! certificates) and a `CrlStore` of revocation lists. Validating a chain
//! walks from the leaf certificate up through issuers, checking validity
//! period, issuer/subject linkage, CA/KeyUsage constraints on intermediate
//! certificates, and revocation at each step, bailing out past
//! `MAX_CERTIFICATE_CHAIN_DEPTH` to guard against a malicious or malformed
//! loop.

use std::collections::VecDeque;
use std::time::SystemTime;

use rsa::{RsaPrivateKey, RsaPublicKey};
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;

use crate::core::{SecurityError, StatusCode, MAX_CERTIFICATE_CHAIN_DEPTH};

/// Parse a PKCS#8 DER-encoded RSA private key.
pub(crate) fn parse_private_key(der: &[u8]) -> Result<RsaPrivateKey, SecurityError> {
    use rsa::pkcs8::DecodePrivateKey;
    RsaPrivateKey::from_pkcs8_der(der).map_err(|_| SecurityError::KeyDerivationFailed)
}

/// Parse an RSA public key, either as a bare SubjectPublicKeyInfo DER
/// structure or extracted from an X.509 certificate's DER encoding.
pub(crate) fn parse_public_key(der: &[u8]) -> Result<RsaPublicKey, SecurityError> {
    use rsa::pkcs8::DecodePublicKey;
    if let Ok(key) = RsaPublicKey::from_public_key_der(der) {
        return Ok(key);
    }
    let (_, cert) = X509Certificate::from_der(der)
        .map_err(|_| SecurityError::CertificateChain(StatusCode::BadCertificateInvalid))?;
    RsaPublicKey::from_public_key_der(cert.public_key().raw)
        .map_err(|_| SecurityError::CertificateChain(StatusCode::BadCertificateInvalid))
}

/// One entry in a trust list: the certificate's DER encoding plus whether it
/// may act as an issuing CA.
#[derive(Debug, Clone)]
pub struct TrustListEntry {
    /// DER-encoded X.509 certificate.
    pub der: Vec<u8>,
    /// True if this entry may sign other certificates (an issuer CA).
    pub is_issuer: bool,
}

/// A bounded certificate revocation list store, indexed by issuer subject.
#[derive(Debug, Default)]
pub struct CrlStore {
    revoked_serials: Vec<(String, Vec<u8>)>,
}

impl CrlStore {
    /// An empty CRL store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a serial number as revoked under the given issuer subject.
    pub fn revoke(&mut self, issuer_subject: &str, serial: &[u8]) {
        self.revoked_serials.push((issuer_subject.to_owned(), serial.to_vec()));
    }

    /// True if `serial` is revoked under `issuer_subject`.
    pub fn is_revoked(&self, issuer_subject: &str, serial: &[u8]) -> bool {
        self.revoked_serials
            .iter()
            .any(|(subject, s)| subject == issuer_subject && s == serial)
    }
}

/// The trust list plus a bounded FIFO of recently rejected certificates
/// (avoids re-validating the same bad chain repeatedly under load).
#[derive(Debug)]
pub struct CertificateStore {
    trusted: Vec<TrustListEntry>,
    crls: CrlStore,
    rejected: VecDeque<Vec<u8>>,
    max_rejected: usize,
}

impl CertificateStore {
    /// A certificate store with an empty trust list and a rejected-list cap.
    pub fn new(max_rejected: usize) -> Self {
        Self {
            trusted: Vec::new(),
            crls: CrlStore::new(),
            rejected: VecDeque::new(),
            max_rejected,
        }
    }

    /// Add a trusted certificate (CA or directly trusted peer).
    pub fn trust(&mut self, entry: TrustListEntry) {
        self.trusted.push(entry);
    }

    /// Access the revocation list store.
    pub fn crls_mut(&mut self) -> &mut CrlStore {
        &mut self.crls
    }

    fn remember_rejected(&mut self, der: &[u8]) {
        if self.rejected.len() == self.max_rejected && self.max_rejected > 0 {
            self.rejected.pop_front();
        }
        if self.max_rejected > 0 {
            self.rejected.push_back(der.to_vec());
        }
    }

    fn find_issuer(&self, cert: &X509Certificate<'_>) -> Option<&TrustListEntry> {
        self.trusted.iter().find(|entry| {
            let Ok((_, candidate)) = X509Certificate::from_der(&entry.der) else {
                return false;
            };
            entry.is_issuer && candidate.subject() == cert.issuer()
        })
    }

    fn is_directly_trusted(&self, der: &[u8]) -> bool {
        self.trusted.iter().any(|entry| entry.der == der)
    }

    /// Validate a certificate chain: `leaf_der` followed by zero or more
    /// intermediate DER certificates, in issuance order (leaf first).
    ///
    /// Returns `Ok(())` if the chain terminates at a directly trusted
    /// certificate or a trusted CA within `MAX_CERTIFICATE_CHAIN_DEPTH`
    /// steps, with every link passing validity, linkage, CA/KeyUsage, and
    /// revocation checks. On failure the leaf is added to the rejected list
    /// and the most specific applicable `BadCertificate*` status is
    /// returned.
    pub fn validate_chain(&mut self, leaf_der: &[u8], chain: &[Vec<u8>]) -> Result<(), SecurityError> {
        match self.validate_chain_inner(leaf_der, chain) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.remember_rejected(leaf_der);
                Err(err)
            }
        }
    }

    fn validate_chain_inner(&self, leaf_der: &[u8], chain: &[Vec<u8>]) -> Result<(), SecurityError> {
        if self.is_directly_trusted(leaf_der) {
            return Ok(());
        }

        let now = SystemTime::now();
        let mut current_der = leaf_der;
        let mut depth = 0usize;
        let mut chain_iter = chain.iter();

        loop {
            if depth >= MAX_CERTIFICATE_CHAIN_DEPTH {
                return Err(SecurityError::CertificateChain(StatusCode::BadCertificateChainIncomplete));
            }

            let (_, cert) = X509Certificate::from_der(current_der)
                .map_err(|_| SecurityError::CertificateChain(StatusCode::BadCertificateInvalid))?;

            check_validity_period(&cert, now, depth)?;

            if let Some(issuer_entry) = self.find_issuer(&cert) {
                let (_, issuer_cert) = X509Certificate::from_der(&issuer_entry.der)
                    .map_err(|_| SecurityError::CertificateChain(StatusCode::BadCertificateInvalid))?;
                check_validity_period(&issuer_cert, now, depth + 1)?;
                check_revocation(&self.crls, &cert, &issuer_cert)?;
                return Ok(());
            }

            if self.is_directly_trusted(current_der) {
                return Ok(());
            }

            let Some(next_der) = chain_iter.next() else {
                if cert.issuer() == cert.subject() {
                    return Err(SecurityError::CertificateChain(StatusCode::BadCertificateUntrusted));
                }
                return Err(SecurityError::CertificateChain(StatusCode::BadCertificateChainIncomplete));
            };
            let (_, issuer_cert) = X509Certificate::from_der(next_der)
                .map_err(|_| SecurityError::CertificateChain(StatusCode::BadCertificateInvalid))?;

            if issuer_cert.subject() != cert.issuer() {
                return Err(SecurityError::CertificateChain(StatusCode::BadCertificateInvalid));
            }
            if !issuer_cert
                .tbs_certificate
                .basic_constraints()
                .is_ok_and(|bc| bc.is_some_and(|bc| bc.value.ca))
            {
                return Err(SecurityError::CertificateChain(StatusCode::BadCertificateIssuerUseNotAllowed));
            }
            check_revocation(&self.crls, &cert, &issuer_cert)?;

            current_der = next_der;
            depth += 1;
        }
    }
}

fn check_validity_period(cert: &X509Certificate<'_>, now: SystemTime, depth: usize) -> Result<(), SecurityError> {
    let validity = cert.validity();
    let now_asn1 = x509_parser::time::ASN1Time::from(now);
    if now_asn1 < validity.not_before || now_asn1 > validity.not_after {
        let status = if depth == 0 {
            StatusCode::BadCertificateTimeInvalid
        } else {
            StatusCode::BadCertificateIssuerTimeInvalid
        };
        return Err(SecurityError::CertificateChain(status));
    }
    Ok(())
}

fn check_revocation(
    crls: &CrlStore,
    cert: &X509Certificate<'_>,
    issuer_cert: &X509Certificate<'_>,
) -> Result<(), SecurityError> {
    let issuer_subject = issuer_cert.subject().to_string();
    let serial = cert.raw_serial();
    if crls.is_revoked(&issuer_subject, serial) {
        return Err(SecurityError::CertificateChain(StatusCode::BadCertificateRevoked));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crl_store_tracks_revoked_serials_per_issuer() {
        let mut crls = CrlStore::new();
        crls.revoke("CN=Test CA", &[1, 2, 3]);
        assert!(crls.is_revoked("CN=Test CA", &[1, 2, 3]));
        assert!(!crls.is_revoked("CN=Other CA", &[1, 2, 3]));
        assert!(!crls.is_revoked("CN=Test CA", &[9, 9, 9]));
    }

    #[test]
    fn rejected_list_evicts_oldest_past_capacity() {
        let mut store = CertificateStore::new(2);
        store.remember_rejected(b"cert-a");
        store.remember_rejected(b"cert-b");
        store.remember_rejected(b"cert-c");
        assert_eq!(store.rejected.len(), 2);
        assert_eq!(store.rejected.front().unwrap().as_slice(), b"cert-b");
    }

    #[test]
    fn validating_an_empty_chain_against_an_empty_trust_list_fails() {
        let mut store = CertificateStore::new(8);
        let err = store.validate_chain(b"not-a-real-der-certificate", &[]).unwrap_err();
        assert!(matches!(err, SecurityError::CertificateChain(_)));
    }
}
