//! User identity tokens presented during `ActivateSession` (§4.6).

/// One of the four identity proof forms a client may present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIdentityToken {
    /// No credentials; the anonymous user.
    Anonymous,
    /// A username and password, optionally encrypted under the server's
    /// certificate with the channel's security policy.
    UserNamePassword {
        /// The claimed username.
        username: String,
        /// Password bytes, plaintext or policy-encrypted per `encrypted`.
        password: Vec<u8>,
        /// True if `password` is encrypted (policy other than `None`).
        encrypted: bool,
    },
    /// An X.509 certificate plus a signature proving possession of the
    /// corresponding private key.
    X509 {
        /// DER-encoded certificate.
        certificate: Vec<u8>,
    },
    /// A token issued by an external identity provider (e.g. a SAML or JWT
    /// assertion), opaque to this layer beyond its raw bytes.
    Issued {
        /// Opaque issued-token bytes.
        token_data: Vec<u8>,
        /// True if `token_data` is encrypted.
        encrypted: bool,
    },
}

impl UserIdentityToken {
    /// A human-readable policy id for this token kind, as carried in
    /// `userIdentityTokenPolicyId`.
    pub fn policy_id(&self) -> &'static str {
        match self {
            UserIdentityToken::Anonymous => "anonymous",
            UserIdentityToken::UserNamePassword { .. } => "username",
            UserIdentityToken::X509 { .. } => "certificate",
            UserIdentityToken::Issued { .. } => "issued",
        }
    }
}

/// A proof of possession accompanying a non-anonymous identity token: a
/// signature over `serverCertificate || serverNonce` (for X509) or the
/// equivalent password/issued-token encryption, checked by the server
/// during `ActivateSession`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserTokenSignature {
    /// The algorithm URI the signature was produced with.
    pub algorithm: String,
    /// Raw signature bytes.
    pub signature: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_ids_match_token_kind() {
        assert_eq!(UserIdentityToken::Anonymous.policy_id(), "anonymous");
        assert_eq!(
            UserIdentityToken::UserNamePassword { username: "a".into(), password: vec![], encrypted: false }
                .policy_id(),
            "username"
        );
        assert_eq!(UserIdentityToken::X509 { certificate: vec![] }.policy_id(), "certificate");
    }
}
