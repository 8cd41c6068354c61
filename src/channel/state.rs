//! Secure channel state machine (§4.5): `{Closed, HelSent/HelReceived,
//! AckSent, OpnSent/OpnReceived, Open, Renewing, Closing, Closed}`.

/// Lifecycle state of a secure channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No connection established yet.
    Closed,
    /// Client: Hello sent, waiting for Acknowledge.
    HelSent,
    /// Server: Hello received, about to send Acknowledge.
    HelReceived,
    /// Server: Acknowledge sent, waiting for the client's OpenSecureChannel.
    AckSent,
    /// Client: OpenSecureChannel sent, waiting for the response.
    OpnSent,
    /// Server: OpenSecureChannel received, about to respond.
    OpnReceived,
    /// Channel fully open; application messages may flow.
    Open,
    /// A token renewal OPN is in flight; the previous token still decodes.
    Renewing,
    /// CloseSecureChannel sent or received; draining in-flight messages.
    Closing,
}

impl ChannelState {
    /// True once the channel has completed its handshake and can carry MSG
    /// chunks (including while a renewal is in flight).
    pub fn is_usable(self) -> bool {
        matches!(self, ChannelState::Open | ChannelState::Renewing)
    }

    /// Valid transitions on receiving a Hello (server side).
    pub fn on_hello_received(self) -> Result<Self, ChannelState> {
        match self {
            ChannelState::Closed => Ok(ChannelState::HelReceived),
            other => Err(other),
        }
    }

    /// Valid transition after sending Acknowledge (server side).
    pub fn on_ack_sent(self) -> Result<Self, ChannelState> {
        match self {
            ChannelState::HelReceived => Ok(ChannelState::AckSent),
            other => Err(other),
        }
    }

    /// Valid transition after sending Hello (client side).
    pub fn on_hello_sent(self) -> Result<Self, ChannelState> {
        match self {
            ChannelState::Closed => Ok(ChannelState::HelSent),
            other => Err(other),
        }
    }

    /// Valid transition on receiving Acknowledge (client side).
    pub fn on_ack_received(self) -> Result<Self, ChannelState> {
        match self {
            ChannelState::HelSent => Ok(ChannelState::AckSent),
            other => Err(other),
        }
    }

    /// Valid transition after sending an OpenSecureChannel request (client).
    pub fn on_opn_sent(self) -> Result<Self, ChannelState> {
        match self {
            ChannelState::AckSent => Ok(ChannelState::OpnSent),
            ChannelState::Open => Ok(ChannelState::Renewing),
            other => Err(other),
        }
    }

    /// Valid transition on receiving an OpenSecureChannel request (server).
    pub fn on_opn_received(self) -> Result<Self, ChannelState> {
        match self {
            ChannelState::AckSent => Ok(ChannelState::OpnReceived),
            ChannelState::Open => Ok(ChannelState::Renewing),
            other => Err(other),
        }
    }

    /// Valid transition once an OpenSecureChannel response has been sent or
    /// received, completing (or renewing) the handshake.
    pub fn on_opn_complete(self) -> Result<Self, ChannelState> {
        match self {
            ChannelState::OpnSent | ChannelState::OpnReceived | ChannelState::Renewing => Ok(ChannelState::Open),
            other => Err(other),
        }
    }

    /// Valid transition on sending or receiving CloseSecureChannel.
    pub fn on_close(self) -> Result<Self, ChannelState> {
        match self {
            ChannelState::Closed => Err(self),
            _ => Ok(ChannelState::Closing),
        }
    }

    /// Transition taken unconditionally on timeout or a fatal protocol
    /// error (§4.5: "any fatal protocol error → emit ERR and → Closed").
    pub fn on_fatal_error(self) -> Self {
        ChannelState::Closed
    }

    /// Finish closing, returning to `Closed`.
    pub fn on_closed(self) -> Self {
        ChannelState::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_handshake_walks_through_hel_ack_opn_open() {
        let mut state = ChannelState::Closed;
        state = state.on_hello_sent().unwrap();
        assert_eq!(state, ChannelState::HelSent);
        state = state.on_ack_received().unwrap();
        assert_eq!(state, ChannelState::AckSent);
        state = state.on_opn_sent().unwrap();
        assert_eq!(state, ChannelState::OpnSent);
        state = state.on_opn_complete().unwrap();
        assert_eq!(state, ChannelState::Open);
        assert!(state.is_usable());
    }

    #[test]
    fn renewal_from_open_goes_through_renewing_back_to_open() {
        let mut state = ChannelState::Open;
        state = state.on_opn_sent().unwrap();
        assert_eq!(state, ChannelState::Renewing);
        assert!(state.is_usable());
        state = state.on_opn_complete().unwrap();
        assert_eq!(state, ChannelState::Open);
    }

    #[test]
    fn invalid_transition_is_rejected() {
        let state = ChannelState::Closed;
        assert!(state.on_opn_sent().is_err());
    }

    #[test]
    fn fatal_error_always_closes() {
        assert_eq!(ChannelState::Open.on_fatal_error(), ChannelState::Closed);
        assert_eq!(ChannelState::OpnSent.on_fatal_error(), ChannelState::Closed);
    }
}
