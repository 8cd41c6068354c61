//! Session lifecycle (§4.6): `CreateSession`, `ActivateSession`,
//! `CloseSession`, and reassociation across channels.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::core::{SessionError, DEFAULT_SESSION_TIMEOUT};
use crate::types::Guid;

use super::identity::UserIdentityToken;

/// A session's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created but not yet activated; no identity has been accepted.
    Created,
    /// Activated: an identity has been accepted and the session may be used.
    Activated,
    /// Closed; owned subscriptions have either been deleted or orphaned.
    Closed,
}

/// One server-side session.
pub struct Session {
    /// The session's unique id, returned to the client at creation.
    pub session_id: Guid,
    /// Opaque token bound to the channel, proving session ownership on
    /// subsequent requests.
    pub authentication_token: Vec<u8>,
    /// The secure channel this session is currently associated with.
    pub secure_channel_id: u32,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Negotiated session timeout.
    pub timeout: Duration,
    /// When the session last received a service request (for timeout).
    pub last_activity: Instant,
    /// The identity accepted at activation, if any.
    pub identity: Option<UserIdentityToken>,
    /// Subscription ids owned by this session.
    pub owned_subscriptions: Vec<u32>,
}

impl Session {
    /// True if more than `timeout` has elapsed since the last activity.
    pub fn is_timed_out(&self, now: Instant) -> bool {
        now.duration_since(self.last_activity) > self.timeout
    }

    /// Record activity, resetting the timeout clock.
    pub fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }
}

/// Response payload for `CreateSession`: everything besides the raw
/// `Session` the server hands back to the client.
pub struct CreateSessionResult {
    /// The new session's id.
    pub session_id: Guid,
    /// The authentication token bound to this channel.
    pub authentication_token: Vec<u8>,
    /// Revised session timeout (clamped to server limits).
    pub revised_session_timeout: Duration,
    /// Signature over `clientCertificate || clientNonce` using the server's
    /// private key, proving the server holds that key.
    pub server_signature: Vec<u8>,
}

/// The server-side table of live sessions, indexed by authentication token
/// for fast lookup on every subsequent service request.
#[derive(Default)]
pub struct SessionTable {
    by_token: HashMap<Vec<u8>, Session>,
}

impl SessionTable {
    /// An empty session table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new, not-yet-activated session bound to `secure_channel_id`.
    pub fn create_session(
        &mut self,
        secure_channel_id: u32,
        requested_timeout: Duration,
        authentication_token: Vec<u8>,
        server_signature: Vec<u8>,
        now: Instant,
    ) -> CreateSessionResult {
        let session_id = Guid::from_parts(0, 0, 0, [0; 8]);
        let revised_session_timeout = if requested_timeout.is_zero() {
            DEFAULT_SESSION_TIMEOUT
        } else {
            requested_timeout
        };

        let session = Session {
            session_id,
            authentication_token: authentication_token.clone(),
            secure_channel_id,
            state: SessionState::Created,
            timeout: revised_session_timeout,
            last_activity: now,
            identity: None,
            owned_subscriptions: Vec::new(),
        };
        self.by_token.insert(authentication_token.clone(), session);

        CreateSessionResult {
            session_id,
            authentication_token,
            revised_session_timeout,
            server_signature,
        }
    }

    /// Activate a session, binding it to an identity and (re-)associating
    /// it with whichever channel this request arrived on — used both for
    /// first activation and for reassociation onto a different channel
    /// (§4.6: "may be sent again on a different channel to reassociate").
    pub fn activate_session(
        &mut self,
        authentication_token: &[u8],
        secure_channel_id: u32,
        identity: UserIdentityToken,
        now: Instant,
    ) -> Result<(), SessionError> {
        let session = self
            .by_token
            .get_mut(authentication_token)
            .ok_or(SessionError::InvalidAuthenticationToken)?;
        if session.state == SessionState::Closed {
            return Err(SessionError::InvalidAuthenticationToken);
        }
        session.secure_channel_id = secure_channel_id;
        session.identity = Some(identity);
        session.state = SessionState::Activated;
        session.touch(now);
        Ok(())
    }

    /// Close a session. If `delete_subscriptions` is true, the caller is
    /// expected to tear down every id in `owned_subscriptions` itself
    /// (returned here) before the table entry disappears; otherwise the
    /// subscriptions are returned as orphaned, to be claimed later via
    /// `TransferSubscriptions`.
    pub fn close_session(
        &mut self,
        authentication_token: &[u8],
        delete_subscriptions: bool,
    ) -> Result<Vec<u32>, SessionError> {
        let mut session = self
            .by_token
            .remove(authentication_token)
            .ok_or(SessionError::InvalidAuthenticationToken)?;
        session.state = SessionState::Closed;
        if delete_subscriptions {
            Ok(std::mem::take(&mut session.owned_subscriptions))
        } else {
            Ok(Vec::new())
        }
    }

    /// Look up a session by its authentication token.
    pub fn find(&self, authentication_token: &[u8]) -> Option<&Session> {
        self.by_token.get(authentication_token)
    }

    /// Look up a session mutably by its authentication token.
    pub fn find_mut(&mut self, authentication_token: &[u8]) -> Option<&mut Session> {
        self.by_token.get_mut(authentication_token)
    }

    /// The number of sessions currently in the [`SessionState::Activated`]
    /// state.
    pub fn active_count(&self) -> usize {
        self.by_token.values().filter(|session| session.state == SessionState::Activated).count()
    }

    /// Remove and return every session that has timed out as of `now`.
    pub fn evict_timed_out(&mut self, now: Instant) -> Vec<Session> {
        let expired: Vec<Vec<u8>> = self
            .by_token
            .iter()
            .filter(|(_, session)| session.is_timed_out(now))
            .map(|(token, _)| token.clone())
            .collect();
        expired
            .into_iter()
            .filter_map(|token| self.by_token.remove(&token))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_activate_then_close_round_trip() {
        let mut table = SessionTable::new();
        let now = Instant::now();
        let result = table.create_session(1, Duration::from_secs(60), b"tok".to_vec(), vec![], now);
        assert_eq!(table.find(&result.authentication_token).unwrap().state, SessionState::Created);

        table
            .activate_session(&result.authentication_token, 1, UserIdentityToken::Anonymous, now)
            .unwrap();
        assert_eq!(table.find(&result.authentication_token).unwrap().state, SessionState::Activated);

        let orphaned = table.close_session(&result.authentication_token, false).unwrap();
        assert!(orphaned.is_empty());
        assert!(table.find(&result.authentication_token).is_none());
    }

    #[test]
    fn close_with_delete_subscriptions_returns_owned_ids() {
        let mut table = SessionTable::new();
        let now = Instant::now();
        let result = table.create_session(1, Duration::from_secs(60), b"tok".to_vec(), vec![], now);
        table.find_mut(&result.authentication_token).unwrap().owned_subscriptions = vec![1, 2, 3];

        let deleted = table.close_session(&result.authentication_token, true).unwrap();
        assert_eq!(deleted, vec![1, 2, 3]);
    }

    #[test]
    fn reassociation_onto_a_different_channel_succeeds() {
        let mut table = SessionTable::new();
        let now = Instant::now();
        let result = table.create_session(1, Duration::from_secs(60), b"tok".to_vec(), vec![], now);
        table
            .activate_session(&result.authentication_token, 1, UserIdentityToken::Anonymous, now)
            .unwrap();
        table
            .activate_session(&result.authentication_token, 2, UserIdentityToken::Anonymous, now)
            .unwrap();
        assert_eq!(table.find(&result.authentication_token).unwrap().secure_channel_id, 2);
    }

    #[test]
    fn activating_an_unknown_token_fails() {
        let mut table = SessionTable::new();
        let err = table
            .activate_session(b"bogus", 1, UserIdentityToken::Anonymous, Instant::now())
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidAuthenticationToken));
    }

    #[test]
    fn timed_out_sessions_are_evicted() {
        let mut table = SessionTable::new();
        let start = Instant::now();
        table.create_session(1, Duration::from_millis(1), b"tok".to_vec(), vec![], start);
        let later = start + Duration::from_secs(1);
        let evicted = table.evict_timed_out(later);
        assert_eq!(evicted.len(), 1);
        assert!(table.find(b"tok").is_none());
    }
}
