//! Protocol constants from the OPC UA specification (Part 6, UA/TCP).
//!
//! These values are fixed by the protocol and MUST NOT be changed.

use std::time::Duration;

// =============================================================================
// UA/TCP FRAMING
// =============================================================================

/// Minimum length of any UA/TCP frame (8-byte prefix, no body).
pub const MIN_FRAME_SIZE: usize = 8;

/// Size of the message-type + chunk-flag + length prefix shared by all frames.
pub const FRAME_PREFIX_SIZE: usize = 8;

/// `HEL` message type bytes.
pub const MESSAGE_TYPE_HEL: [u8; 3] = *b"HEL";
/// `ACK` message type bytes.
pub const MESSAGE_TYPE_ACK: [u8; 3] = *b"ACK";
/// `ERR` message type bytes.
pub const MESSAGE_TYPE_ERR: [u8; 3] = *b"ERR";
/// `OPN` message type bytes.
pub const MESSAGE_TYPE_OPN: [u8; 3] = *b"OPN";
/// `MSG` message type bytes.
pub const MESSAGE_TYPE_MSG: [u8; 3] = *b"MSG";
/// `CLO` message type bytes.
pub const MESSAGE_TYPE_CLO: [u8; 3] = *b"CLO";

/// Chunk flag: final chunk, completes the message.
pub const CHUNK_FLAG_FINAL: u8 = b'F';
/// Chunk flag: continuation, more chunks follow with the same request id.
pub const CHUNK_FLAG_CONTINUATION: u8 = b'C';
/// Chunk flag: abort, the message is incomplete; a status + reason follow.
pub const CHUNK_FLAG_ABORT: u8 = b'A';
/// Chunk flag placeholder for message types that are never chunked (HEL/ACK/ERR).
pub const CHUNK_FLAG_NONE: u8 = b' ';

/// Current UA/TCP protocol version negotiated in HEL/ACK.
pub const PROTOCOL_VERSION: u32 = 0;

/// Default receive buffer size advertised in HEL.
pub const DEFAULT_RECEIVE_BUFFER_SIZE: u32 = 65536;
/// Default send buffer size advertised in HEL.
pub const DEFAULT_SEND_BUFFER_SIZE: u32 = 65536;
/// Default maximum message size (0 = unlimited, but we cap for safety).
pub const DEFAULT_MAX_MESSAGE_SIZE: u32 = 16 * 1024 * 1024;
/// Default maximum chunk count per message (0 = unlimited, we cap for safety).
pub const DEFAULT_MAX_CHUNK_COUNT: u32 = 5000;

// =============================================================================
// SEQUENCE NUMBERS (§3, §5)
// =============================================================================

/// The value after which the next legal sequence number wraps to 1.
pub const SEQUENCE_NUMBER_WRAP_AFTER: u32 = 4_294_966_271;

/// Width of the legal-successor window: the next sequence number must lie
/// in `[prev + 1, prev + 1024]` (mod the wrap rule above).
pub const SEQUENCE_NUMBER_WINDOW: u32 = 1024;

// =============================================================================
// SECURE CHANNEL / TOKEN ROLLOVER (§4.5)
// =============================================================================

/// Fraction of a security token's lifetime during which the previous token's
/// keys remain valid for decoding (grace window after renewal).
pub const TOKEN_RENEWAL_GRACE_FRACTION: f64 = 0.25;

/// Default requested security token lifetime.
pub const DEFAULT_SECURITY_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// Maximum certificate chain depth accepted during validation (§4.4).
pub const MAX_CERTIFICATE_CHAIN_DEPTH: usize = 10;

// =============================================================================
// SECURITY POLICY URIS (§4.4)
// =============================================================================

/// The `None` security policy (no signing, no encryption).
pub const SECURITY_POLICY_NONE: &str = "http://opcfoundation.org/UA/SecurityPolicy#None";
/// Basic128Rsa15 security policy URI.
pub const SECURITY_POLICY_BASIC128RSA15: &str =
    "http://opcfoundation.org/UA/SecurityPolicy#Basic128Rsa15";
/// Basic256Sha256 security policy URI.
pub const SECURITY_POLICY_BASIC256SHA256: &str =
    "http://opcfoundation.org/UA/SecurityPolicy#Basic256Sha256";
/// Aes256Sha256RsaPss security policy URI.
pub const SECURITY_POLICY_AES256SHA256RSAPSS: &str =
    "http://opcfoundation.org/UA/SecurityPolicy#Aes256Sha256RsaPss";
/// PubSub-Aes256-CTR security policy URI.
pub const SECURITY_POLICY_PUBSUB_AES256CTR: &str =
    "http://opcfoundation.org/UA/SecurityPolicy#PubSub-Aes256-CTR";

// =============================================================================
// KEY / NONCE / SIGNATURE SIZES (§4.4)
// =============================================================================

/// SHA-1 digest size, used uniformly for certificate thumbprints.
pub const CERT_THUMBPRINT_SIZE: usize = 20;

/// Basic128Rsa15: symmetric key length in bytes.
pub const BASIC128RSA15_KEY_LENGTH: usize = 16;
/// Basic128Rsa15: nonce length in bytes.
pub const BASIC128RSA15_NONCE_LENGTH: usize = 16;

/// Basic256Sha256 / Aes256Sha256RsaPss: symmetric key length in bytes.
pub const AES256_KEY_LENGTH: usize = 32;
/// Basic256Sha256 / Aes256Sha256RsaPss: nonce length in bytes.
pub const AES256_NONCE_LENGTH: usize = 32;

/// AES block size (shared by CBC and CTR policies).
pub const AES_BLOCK_SIZE: usize = 16;

/// PubSub-Aes256-CTR: signing key length.
pub const PUBSUB_SIGNING_KEY_LENGTH: usize = 32;
/// PubSub-Aes256-CTR: encryption key length.
pub const PUBSUB_ENCRYPTION_KEY_LENGTH: usize = 32;
/// PubSub-Aes256-CTR: key nonce length.
pub const PUBSUB_KEY_NONCE_LENGTH: usize = 4;
/// PubSub-Aes256-CTR: message nonce length.
pub const PUBSUB_MESSAGE_NONCE_LENGTH: usize = 8;
/// PubSub-Aes256-CTR: total nonce material handed out by `create_nonce`.
pub const PUBSUB_NONCE_LENGTH: usize = 76;

// =============================================================================
// SUBSCRIPTION ENGINE (§4.7)
// =============================================================================

/// Default bound on a subscription's retransmit queue.
pub const DEFAULT_MAX_RETRANSMISSION_QUEUE_SIZE: usize = 100;

/// Minimum publishing interval accepted from a client.
pub const MIN_PUBLISHING_INTERVAL: Duration = Duration::from_millis(10);

// =============================================================================
// RECOMMENDED TIMEOUTS
// =============================================================================

/// Default request timeout hint when a client supplies none.
pub const DEFAULT_TIMEOUT_HINT: Duration = Duration::from_secs(10);

/// Default session timeout when a client requests none / an unreasonable value.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(600);
