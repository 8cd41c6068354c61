//! OPC UA `StatusCode` — the closed enumeration errors are drawn from (§7).
//!
//! On the wire a status code is a plain `u32`: the top two bits carry the
//! severity (`00` = Good, `01` = Uncertain, `10`/`11` = Bad), the rest is a
//! sub-code. We model the small set of codes this core actually produces or
//! consumes as a Rust enum plus an `Other(u32)` escape hatch, so unknown
//! codes round-trip losslessly instead of being rejected.

/// Severity encoded in the top two bits of a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation succeeded.
    Good,
    /// Operation succeeded but the result may not be fully usable.
    Uncertain,
    /// Operation failed.
    Bad,
}

macro_rules! status_codes {
    ($($variant:ident = $value:expr),* $(,)?) => {
        /// A status code from the OPC UA closed enumeration.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[non_exhaustive]
        pub enum StatusCode {
            $(
                #[allow(missing_docs)]
                $variant,
            )*
            /// A status code not named explicitly above, kept as its raw value.
            Other(u32),
        }

        impl StatusCode {
            /// Decode a raw wire value into the closed enumeration.
            pub fn from_raw(raw: u32) -> Self {
                match raw {
                    $($value => Self::$variant,)*
                    other => Self::Other(other),
                }
            }

            /// Encode to the raw wire value.
            pub fn as_raw(self) -> u32 {
                match self {
                    $(Self::$variant => $value,)*
                    Self::Other(raw) => raw,
                }
            }
        }
    };
}

status_codes! {
    Good = 0x0000_0000,
    Uncertain = 0x4000_0000,

    BadUnexpectedError = 0x8001_0000,
    BadInternalError = 0x8002_0000,
    BadOutOfMemory = 0x8003_0000,
    BadTcpInternalError = 0x807A_0000,
    BadCommunicationError = 0x807B_0000,
    BadConnectionClosed = 0x80AE_0000,
    BadEncodingLimitsExceeded = 0x8062_0000,
    BadEncodingError = 0x8007_0000,
    BadDecodingError = 0x8008_0000,
    BadSequenceNumberInvalid = 0x8068_0000,
    BadSecurityChecksFailed = 0x8130_0000,
    BadSecureChannelIdInvalid = 0x8005_0000,
    BadSecureChannelClosed = 0x80AE_0001,
    BadSecurityPolicyRejected = 0x810E_0000,
    BadRequestTypeInvalid = 0x8027_0000,
    BadCertificateTimeInvalid = 0x8042_0000,
    BadCertificateIssuerTimeInvalid = 0x8043_0000,
    BadCertificateInvalid = 0x8046_0000,
    BadCertificateIssuerUseNotAllowed = 0x8087_0000,
    BadCertificateRevoked = 0x8048_0000,
    BadCertificateIssuerRevoked = 0x8049_0000,
    BadCertificateRevocationUnknown = 0x8050_0000,
    BadCertificateIssuerRevocationUnknown = 0x8051_0000,
    BadCertificateChainIncomplete = 0x810D_0000,
    BadCertificateUntrusted = 0x8054_0000,
    BadCertificateUriInvalid = 0x8044_0000,
    BadCertificateUseNotAllowed = 0x8047_0000,
    BadCertificateHostNameInvalid = 0x8045_0000,
    BadIdentityTokenInvalid = 0x80C1_0000,
    BadIdentityTokenRejected = 0x80C2_0000,
    BadUserAccessDenied = 0x801F_0000,
    BadUserSignatureInvalid = 0x80C3_0000,
    BadSessionIdInvalid = 0x8025_0000,
    BadSessionClosed = 0x8026_0000,
    BadSessionNotActivated = 0x80BF_0000,
    BadTooManySessions = 0x80C0_0000,
    BadTimeout = 0x800A_0000,
    BadRequestCancelledByClient = 0x805D_0000,
    BadSubscriptionIdInvalid = 0x8028_0000,
    BadMonitoredItemIdInvalid = 0x803D_0000,
    BadMessageNotAvailable = 0x803B_0000,
    BadSequenceNumberUnknown = 0x803C_0000,
    BadTooManyPublishRequests = 0x803A_0000,
    BadNoSubscription = 0x8038_0000,
    BadSubscriptionIdRejected = 0x8028_0001,
    GoodSubscriptionTransferred = 0x002D_0000,
    GoodCompletesAsynchronously = 0x002E_0000,
}

impl StatusCode {
    /// Severity carried in the top two bits of the raw value.
    pub fn severity(self) -> Severity {
        match self.as_raw() & 0xC000_0000 {
            0x0000_0000 => Severity::Good,
            0x4000_0000 => Severity::Uncertain,
            _ => Severity::Bad,
        }
    }

    /// True for `Good` (and `Good*`) codes.
    pub fn is_good(self) -> bool {
        self.severity() == Severity::Good
    }

    /// True for `Uncertain` codes.
    pub fn is_uncertain(self) -> bool {
        self.severity() == Severity::Uncertain
    }

    /// True for `Bad*` codes.
    pub fn is_bad(self) -> bool {
        self.severity() == Severity::Bad
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        Self::Good
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?} (0x{:08X})", self.as_raw())
    }
}

impl From<u32> for StatusCode {
    fn from(raw: u32) -> Self {
        Self::from_raw(raw)
    }
}

impl From<StatusCode> for u32 {
    fn from(code: StatusCode) -> Self {
        code.as_raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn good_is_zero() {
        assert_eq!(StatusCode::Good.as_raw(), 0);
        assert!(StatusCode::Good.is_good());
    }

    #[test]
    fn severity_bits() {
        assert_eq!(StatusCode::Good.severity(), Severity::Good);
        assert_eq!(StatusCode::Uncertain.severity(), Severity::Uncertain);
        assert_eq!(StatusCode::BadDecodingError.severity(), Severity::Bad);
        assert!(StatusCode::BadDecodingError.is_bad());
    }

    #[test]
    fn unknown_code_round_trips() {
        let raw = 0x8123_4500;
        let code = StatusCode::from_raw(raw);
        assert_eq!(code, StatusCode::Other(raw));
        assert_eq!(code.as_raw(), raw);
        assert!(code.is_bad());
    }

    #[test]
    fn known_code_round_trips() {
        let code = StatusCode::BadCertificateUntrusted;
        let raw = code.as_raw();
        assert_eq!(StatusCode::from_raw(raw), code);
    }
}
