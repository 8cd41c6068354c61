//! The secure channel object (§4.5): ties chunk framing, sequence number
//! validation, token rollover, and per-direction symmetric crypto together
//! behind a single tick-driven, single-threaded API (§5: one channel, one
//! event loop, never touched by two threads at once).

use std::time::Instant;

use crate::core::{ChannelError, StatusCode, DEFAULT_SECURITY_TOKEN_LIFETIME};
use crate::security::SecurityPolicy;

use super::chunk::{Acknowledge, ErrorMessage, Hello};
use super::sequence::SequenceCounter;
use super::state::ChannelState;
use super::token::{SecurityToken, TokenRing};

/// Which side of the handshake this channel instance plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRole {
    /// Initiates Hello/OpenSecureChannel.
    Client,
    /// Responds to Hello/OpenSecureChannel.
    Server,
}

/// A secure channel's security header for symmetrically-secured chunks
/// (MSG/CLO, and OPN responses on renewal): just the token id, since the
/// channel id already lives in the chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymmetricSecurityHeader {
    /// The security token this chunk is secured under.
    pub token_id: u32,
}

/// The sequence header every chunk carries after its security header: a
/// monotonically increasing sequence number plus the request id shared by
/// every chunk of one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceHeader {
    /// This chunk's sequence number (§4.5, validated via [`SequenceCounter`]).
    pub sequence_number: u32,
    /// Request id shared by every chunk belonging to the same message.
    pub request_id: u32,
}

/// A secure channel: handshake state, negotiated buffer/message limits,
/// the active (and possibly previous, during grace) security tokens, and
/// the send/receive sequence counters.
pub struct SecureChannel {
    role: ChannelRole,
    state: ChannelState,
    secure_channel_id: u32,
    policy: Box<dyn SecurityPolicy>,
    tokens: TokenRing,
    send_sequence: SequenceCounter,
    recv_sequence: SequenceCounter,
    next_request_id: u32,
    negotiated: Option<Acknowledge>,
}

impl SecureChannel {
    /// A freshly constructed channel, not yet connected.
    pub fn new(role: ChannelRole, secure_channel_id: u32, policy: Box<dyn SecurityPolicy>) -> Self {
        Self {
            role,
            state: ChannelState::Closed,
            secure_channel_id,
            policy,
            tokens: TokenRing::new(),
            send_sequence: SequenceCounter::new(),
            recv_sequence: SequenceCounter::new(),
            next_request_id: 1,
            negotiated: None,
        }
    }

    /// The channel's current lifecycle state.
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// This channel's id, carried in every chunk header.
    pub fn secure_channel_id(&self) -> u32 {
        self.secure_channel_id
    }

    /// The security policy negotiated for this channel.
    pub fn policy(&self) -> &dyn SecurityPolicy {
        self.policy.as_ref()
    }

    /// Negotiated HEL/ACK parameters, once the handshake has reached
    /// `AckSent` or later.
    pub fn negotiated(&self) -> Option<&Acknowledge> {
        self.negotiated.as_ref()
    }

    /// The token id currently used to seal outgoing chunks, if OPN has
    /// completed at least once.
    pub fn current_token_id(&self) -> Option<u32> {
        self.tokens.current().map(|token| token.token_id)
    }

    fn transition(&mut self, next: Result<ChannelState, ChannelState>) -> Result<(), ChannelError> {
        match next {
            Ok(state) => {
                self.state = state;
                Ok(())
            }
            Err(rejected) => {
                self.state = self.state.on_fatal_error();
                Err(ChannelError::Protocol(format!(
                    "illegal transition attempted from {rejected:?}"
                )))
            }
        }
    }

    /// Client side: record that Hello was sent.
    pub fn on_hello_sent(&mut self) -> Result<(), ChannelError> {
        self.transition(self.state.on_hello_sent())
    }

    /// Server side: a Hello arrived; negotiate parameters against the
    /// server's own offer and move to `AckSent` once the Acknowledge is
    /// sent by the caller.
    pub fn on_hello_received(&mut self, hello: &Hello, server_offer: &Acknowledge) -> Result<Acknowledge, ChannelError> {
        self.transition(self.state.on_hello_received())?;
        let negotiated = Acknowledge::negotiate(hello, server_offer);
        self.transition(self.state.on_ack_sent())?;
        self.negotiated = Some(negotiated);
        Ok(negotiated)
    }

    /// Client side: an Acknowledge arrived, completing HEL/ACK negotiation.
    pub fn on_ack_received(&mut self, ack: Acknowledge) -> Result<(), ChannelError> {
        self.transition(self.state.on_ack_received())?;
        self.negotiated = Some(ack);
        Ok(())
    }

    /// Record that an OpenSecureChannel request was sent (client) or
    /// received (server), including on renewal from `Open`.
    pub fn on_opn_sent(&mut self) -> Result<(), ChannelError> {
        self.transition(self.state.on_opn_sent())
    }

    /// See [`Self::on_opn_sent`], server-received counterpart.
    pub fn on_opn_received(&mut self) -> Result<(), ChannelError> {
        self.transition(self.state.on_opn_received())
    }

    /// Install the token negotiated by an OpenSecureChannel exchange and
    /// complete (or re-complete, on renewal) the handshake.
    pub fn complete_opn(&mut self, token: SecurityToken) -> Result<(), ChannelError> {
        self.transition(self.state.on_opn_complete())?;
        self.tokens.renew(token);
        Ok(())
    }

    /// Begin closing the channel (CloseSecureChannel sent or received).
    pub fn begin_close(&mut self) -> Result<(), ChannelError> {
        self.transition(self.state.on_close())
    }

    /// Finish closing, returning the channel to `Closed`.
    pub fn finish_close(&mut self) {
        self.state = self.state.on_closed();
    }

    /// A fatal protocol error: transitions to `Closed` and returns the
    /// `Error` message body the caller should send before dropping the
    /// connection (§4.5: "any fatal protocol error → emit ERR and → Closed").
    pub fn fatal_error(&mut self, status: StatusCode, reason: impl Into<String>) -> ErrorMessage {
        self.state = self.state.on_fatal_error();
        ErrorMessage { error: status, reason: reason.into() }
    }

    /// Allocate the next request id for an outgoing message.
    pub fn next_request_id(&mut self) -> u32 {
        let id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1).max(1);
        id
    }

    /// Sign (and, for a real policy, encrypt) one chunk's body for sending
    /// under the current token, returning the sequence header to prepend
    /// and the signature to append.
    ///
    /// Returns `ChannelError::UnknownChannelId` if no token has been
    /// negotiated yet — callers must complete OPN before sending MSG/CLO.
    pub fn seal_chunk(&mut self, request_id: u32, plaintext: &[u8]) -> Result<(SequenceHeader, Vec<u8>), ChannelError> {
        let token = self
            .tokens
            .current()
            .ok_or(ChannelError::UnknownChannelId(self.secure_channel_id))?;
        let sequence_header = SequenceHeader {
            sequence_number: self.send_sequence.next_send(),
            request_id,
        };
        let signature = self
            .policy
            .symmetric_sign(&token.keys.signing_key, plaintext)
            .map_err(ChannelError::from)?;
        Ok((sequence_header, signature))
    }

    /// Verify and accept one arriving chunk's sequence number and signature
    /// against the token (current or, within grace, previous) named by
    /// `token_id`.
    pub fn open_chunk(
        &mut self,
        token_id: u32,
        sequence_header: SequenceHeader,
        plaintext: &[u8],
        signature: &[u8],
        now: Instant,
    ) -> Result<(), ChannelError> {
        self.recv_sequence.accept_recv(sequence_header.sequence_number)?;

        let token = self
            .tokens
            .find_for_decode(token_id, now)
            .ok_or(ChannelError::TokenExpired)?;
        self.policy
            .symmetric_verify(&token.keys.signing_key, plaintext, signature)
            .map_err(ChannelError::from)?;
        Ok(())
    }

    /// Drop any previous token whose grace period has elapsed and expire
    /// the channel if the current token's lifetime (plus grace) has also
    /// passed with no renewal (§4.5: "timeout ... no activity within
    /// lifetime → Closed").
    pub fn tick(&mut self, now: Instant) {
        self.tokens.expire_previous(now);
        if let Some(token) = self.tokens.current() {
            if !token.is_within_grace(now) && self.state.is_usable() {
                self.state = self.state.on_fatal_error();
            }
        }
    }
}

/// Default lifetime requested for a freshly opened channel's first token.
pub fn default_token_lifetime() -> std::time::Duration {
    DEFAULT_SECURITY_TOKEN_LIFETIME
}

/// Tunable parameters for negotiating and constructing a secure channel:
/// the security policy to request plus the HEL/ACK buffer and message
/// limits offered during the handshake.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Security policy URI to negotiate (§4.4).
    pub security_policy_uri: String,
    /// Requested security token lifetime before renewal (§4.5).
    pub token_lifetime: std::time::Duration,
    /// Offered receive buffer size (HEL/ACK negotiation).
    pub receive_buffer_size: u32,
    /// Offered send buffer size (HEL/ACK negotiation).
    pub send_buffer_size: u32,
    /// Maximum total message size accepted.
    pub max_message_size: u32,
    /// Maximum number of chunks a single message may span.
    pub max_chunk_count: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            security_policy_uri: crate::core::SECURITY_POLICY_NONE.to_owned(),
            token_lifetime: default_token_lifetime(),
            receive_buffer_size: crate::core::DEFAULT_RECEIVE_BUFFER_SIZE,
            send_buffer_size: crate::core::DEFAULT_SEND_BUFFER_SIZE,
            max_message_size: crate::core::DEFAULT_MAX_MESSAGE_SIZE,
            max_chunk_count: crate::core::DEFAULT_MAX_CHUNK_COUNT,
        }
    }
}

impl ChannelConfig {
    /// Resolve this config's security policy and construct a fresh,
    /// unconnected channel for `role` under `secure_channel_id`.
    pub fn build(&self, role: ChannelRole, secure_channel_id: u32) -> Result<SecureChannel, ChannelError> {
        let policy = crate::security::policy_for_uri(&self.security_policy_uri)?;
        Ok(SecureChannel::new(role, secure_channel_id, policy))
    }

    /// The Acknowledge offer implied by this config's buffer/message limits.
    pub fn to_acknowledge(&self) -> Acknowledge {
        Acknowledge {
            protocol_version: crate::core::PROTOCOL_VERSION,
            receive_buffer_size: self.receive_buffer_size,
            send_buffer_size: self.send_buffer_size,
            max_message_size: self.max_message_size,
            max_chunk_count: self.max_chunk_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::NoSecurityPolicy;

    fn open_channel() -> SecureChannel {
        let mut channel = SecureChannel::new(ChannelRole::Client, 7, Box::new(NoSecurityPolicy));
        channel.on_hello_sent().unwrap();
        let ack = Acknowledge {
            protocol_version: 0,
            receive_buffer_size: 8192,
            send_buffer_size: 8192,
            max_message_size: 0,
            max_chunk_count: 0,
        };
        channel.on_ack_received(ack).unwrap();
        channel.on_opn_sent().unwrap();
        channel
            .complete_opn(SecurityToken {
                token_id: 1,
                lifetime: std::time::Duration::from_secs(3600),
                created_at: Instant::now(),
                keys: crate::security::ChannelKeys {
                    signing_key: vec![],
                    encrypting_key: vec![],
                    iv: vec![],
                },
            })
            .unwrap();
        channel
    }

    #[test]
    fn handshake_reaches_open_and_accepts_seal_open_round_trip() {
        let mut channel = open_channel();
        assert_eq!(channel.state(), ChannelState::Open);

        let request_id = channel.next_request_id();
        let (seq_header, signature) = channel.seal_chunk(request_id, b"payload").unwrap();
        assert_eq!(seq_header.sequence_number, 1);

        channel
            .open_chunk(1, seq_header, b"payload", &signature, Instant::now())
            .unwrap();
    }

    #[test]
    fn sealing_before_opn_fails() {
        let mut channel = SecureChannel::new(ChannelRole::Client, 1, Box::new(NoSecurityPolicy));
        let err = channel.seal_chunk(1, b"x").unwrap_err();
        assert!(matches!(err, ChannelError::UnknownChannelId(_)));
    }

    #[test]
    fn fatal_error_transitions_to_closed_and_produces_error_message() {
        let mut channel = open_channel();
        let msg = channel.fatal_error(StatusCode::BadSecurityChecksFailed, "sequence gap");
        assert_eq!(channel.state(), ChannelState::Closed);
        assert_eq!(msg.error, StatusCode::BadSecurityChecksFailed);
    }

    #[test]
    fn unknown_token_id_is_rejected_on_open() {
        let mut channel = open_channel();
        let seq_header = SequenceHeader { sequence_number: 1, request_id: 1 };
        let err = channel.open_chunk(999, seq_header, b"x", &[], Instant::now()).unwrap_err();
        assert!(matches!(err, ChannelError::TokenExpired));
    }

    #[test]
    fn channel_config_defaults_resolve_to_the_none_policy() {
        let config = ChannelConfig::default();
        let channel = config.build(ChannelRole::Client, 1).unwrap();
        assert_eq!(channel.policy().uri(), crate::core::SECURITY_POLICY_NONE);
    }

    #[test]
    fn channel_config_rejects_an_unknown_policy_uri() {
        let config = ChannelConfig {
            security_policy_uri: "http://example.com/bogus".to_owned(),
            ..ChannelConfig::default()
        };
        let err = config.build(ChannelRole::Server, 1).unwrap_err();
        assert!(matches!(err, ChannelError::Security(_)));
    }
}
