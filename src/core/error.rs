//! Error types, layered by protocol component (§7).

use thiserror::Error;

use super::status_code::StatusCode;

/// Errors from the binary/XML codec layer (§7.1).
///
/// These must leave the destination value safely cleared; callers are
/// expected to reset the partially-decoded value on `Err`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The destination buffer (or remaining input) is smaller than required.
    #[error("buffer too small: needed {needed} bytes, available {available}")]
    BufferTooSmall {
        /// Bytes required to complete the operation.
        needed: usize,
        /// Bytes actually available.
        available: usize,
    },

    /// A declared length (string/array/bytestring) is negative and not the
    /// `-1` null sentinel, or otherwise out of range.
    #[error("invalid length field: {0}")]
    InvalidLength(i64),

    /// The data is structurally malformed (bad discriminant, bad UTF-8, …).
    #[error("malformed encoding: {0}")]
    Malformed(String),

    /// A numeric value decoded outside its type's representable range.
    #[error("value out of range for target type")]
    ValueOutOfRange,
}

impl CodecError {
    /// The status code this error maps to (§7.1).
    pub fn status_code(&self) -> StatusCode {
        match self {
            CodecError::BufferTooSmall { .. } => StatusCode::BadEncodingLimitsExceeded,
            CodecError::InvalidLength(_)
            | CodecError::Malformed(_)
            | CodecError::ValueOutOfRange => StatusCode::BadDecodingError,
        }
    }
}

/// Errors from the security layer: policies and certificate validation (§7.2).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecurityError {
    /// Certificate chain validation failed with a specific status code
    /// (the most specific `BadCertificate*` code identified, §4.4).
    #[error("certificate validation failed: {0}")]
    CertificateChain(StatusCode),

    /// A signature did not verify.
    #[error("signature verification failed")]
    SignatureInvalid,

    /// Symmetric or asymmetric decryption failed.
    #[error("decryption failed")]
    DecryptionFailed,

    /// Key derivation (P_SHA) failed.
    #[error("key derivation failed")]
    KeyDerivationFailed,

    /// The requested security policy URI is not implemented.
    #[error("unsupported security policy: {0}")]
    UnsupportedPolicy(String),

    /// The user identity token was rejected.
    #[error("identity token rejected")]
    IdentityTokenRejected,

    /// The authenticated user is not permitted to perform the operation.
    #[error("user access denied")]
    UserAccessDenied,
}

impl SecurityError {
    /// The status code this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            SecurityError::CertificateChain(code) => *code,
            SecurityError::SignatureInvalid | SecurityError::DecryptionFailed => {
                StatusCode::BadSecurityChecksFailed
            }
            SecurityError::KeyDerivationFailed => StatusCode::BadSecurityChecksFailed,
            SecurityError::UnsupportedPolicy(_) => StatusCode::BadSecurityPolicyRejected,
            SecurityError::IdentityTokenRejected => StatusCode::BadIdentityTokenRejected,
            SecurityError::UserAccessDenied => StatusCode::BadUserAccessDenied,
        }
    }
}

/// Errors from the secure channel layer: chunking, sequencing, tokens (§7.3).
#[derive(Debug, Error)]
pub enum ChannelError {
    /// A codec error while assembling or parsing a chunk.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A security error while signing/verifying/encrypting a chunk.
    #[error("security error: {0}")]
    Security(#[from] SecurityError),

    /// A received sequence number was not a legal successor (§3, §5).
    #[error("sequence number invalid: expected next in [{expected_low}, {expected_high}], got {got}")]
    SequenceNumberInvalid {
        /// Low end of the legal successor window.
        expected_low: u32,
        /// High end of the legal successor window.
        expected_high: u32,
        /// The sequence number actually received.
        got: u32,
    },

    /// A chunk declared a size exceeding the negotiated maximum.
    #[error("chunk exceeds negotiated maximum message size")]
    ChunkTooLarge,

    /// A message exceeded the negotiated maximum chunk count.
    #[error("message exceeds negotiated maximum chunk count")]
    TooManyChunks,

    /// A chunk named a secure channel id this endpoint does not recognize.
    #[error("unknown secure channel id: {0}")]
    UnknownChannelId(u32),

    /// The security token used to protect a chunk has expired (outside
    /// the renewal grace window).
    #[error("security token expired")]
    TokenExpired,

    /// A protocol-level violation not covered by the above (§7.3).
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ChannelError {
    /// The status code this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ChannelError::Codec(e) => e.status_code(),
            ChannelError::Security(e) => e.status_code(),
            ChannelError::SequenceNumberInvalid { .. } => StatusCode::BadSequenceNumberInvalid,
            ChannelError::ChunkTooLarge | ChannelError::TooManyChunks => {
                StatusCode::BadEncodingLimitsExceeded
            }
            ChannelError::UnknownChannelId(_) => StatusCode::BadSecureChannelIdInvalid,
            ChannelError::TokenExpired => StatusCode::BadSecurityChecksFailed,
            ChannelError::Protocol(_) => StatusCode::BadTcpInternalError,
        }
    }

    /// Whether this error is fatal to the channel (§7: "Protocol failures
    /// close the channel"; chunk-signature failures are fatal security
    /// failures, argument-level security failures are not reached here).
    pub fn is_fatal_to_channel(&self) -> bool {
        !matches!(self, ChannelError::Security(SecurityError::UserAccessDenied))
    }
}

/// Errors from the session layer (§4.6).
#[derive(Debug, Error)]
pub enum SessionError {
    /// The underlying channel failed.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// The authenticationToken did not match any known session.
    #[error("invalid authentication token")]
    InvalidAuthenticationToken,

    /// The supplied user identity was rejected.
    #[error("identity rejected: {0}")]
    IdentityRejected(#[from] SecurityError),

    /// The session exceeded its revised timeout with no activity.
    #[error("session timed out")]
    Timeout,
}

impl SessionError {
    /// The status code this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            SessionError::Channel(e) => e.status_code(),
            SessionError::InvalidAuthenticationToken => StatusCode::BadSessionIdInvalid,
            SessionError::IdentityRejected(e) => e.status_code(),
            SessionError::Timeout => StatusCode::BadSessionClosed,
        }
    }
}

/// Errors from the subscription / monitored-item engine (§4.7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// No subscription exists with the given id.
    #[error("unknown subscription id: {0}")]
    UnknownSubscription(u32),

    /// No monitored item exists with the given id.
    #[error("unknown monitored item id: {0}")]
    UnknownMonitoredItem(u32),

    /// A Republish sequence number was not found in the retransmit queue.
    #[error("sequence number not in retransmit queue")]
    MessageNotAvailable,

    /// An acknowledged sequence number did not match any pending entry.
    #[error("sequence number unknown for acknowledgment")]
    SequenceNumberUnknown,

    /// The session has too many outstanding PublishRequests queued.
    #[error("too many outstanding publish requests")]
    TooManyPublishRequests,
}

impl SubscriptionError {
    /// The status code this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            SubscriptionError::UnknownSubscription(_) => StatusCode::BadSubscriptionIdInvalid,
            SubscriptionError::UnknownMonitoredItem(_) => StatusCode::BadMonitoredItemIdInvalid,
            SubscriptionError::MessageNotAvailable => StatusCode::BadMessageNotAvailable,
            SubscriptionError::SequenceNumberUnknown => StatusCode::BadSequenceNumberUnknown,
            SubscriptionError::TooManyPublishRequests => StatusCode::BadTooManyPublishRequests,
        }
    }
}

/// Errors from the service dispatcher (§4.8).
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A session-layer error occurred while processing the request.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// A subscription-layer error occurred while processing the request.
    #[error("subscription error: {0}")]
    Subscription(#[from] SubscriptionError),

    /// The request's type id did not match any registered service.
    #[error("unknown service request type id: {0}")]
    UnknownServiceType(u32),
}

impl DispatchError {
    /// The status code this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::Session(e) => e.status_code(),
            DispatchError::Subscription(e) => e.status_code(),
            DispatchError::UnknownServiceType(_) => StatusCode::BadRequestTypeInvalid,
        }
    }
}

/// Top-level error type returned by fallible public operations in this crate.
///
/// Propagation policy (§7): local, recoverable errors (a calc-size retry
/// after `BufferTooSmall`) are handled inline by the caller; everything else
/// propagates to this type, which the dispatcher wraps in a `ServiceFault`
/// carrying `status_code()`. The channel layer never lets an error escape to
/// the transport uncaught — fatal states emit ERR and close (see
/// `channel::ChannelError::is_fatal_to_channel`).
#[derive(Debug, Error)]
pub enum UaError {
    /// Codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Security error.
    #[error("security error: {0}")]
    Security(#[from] SecurityError),

    /// Secure channel error.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Session error.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Subscription error.
    #[error("subscription error: {0}")]
    Subscription(#[from] SubscriptionError),

    /// Dispatch error.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// I/O error from the underlying transport.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl UaError {
    /// The status code this error maps to — what a `ServiceFault` or a
    /// response's `serviceResult` should carry.
    pub fn status_code(&self) -> StatusCode {
        match self {
            UaError::Codec(e) => e.status_code(),
            UaError::Security(e) => e.status_code(),
            UaError::Channel(e) => e.status_code(),
            UaError::Session(e) => e.status_code(),
            UaError::Subscription(e) => e.status_code(),
            UaError::Dispatch(e) => e.status_code(),
            UaError::Io(_) => StatusCode::BadCommunicationError,
        }
    }
}
