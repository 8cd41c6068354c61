//! Security token rollover (§4.5): a channel may hold a current token and,
//! for a grace period after renewal, the previous one too.

use std::time::{Duration, Instant};

use crate::security::ChannelKeys;

use crate::core::TOKEN_RENEWAL_GRACE_FRACTION;

/// One negotiated security token: an id, its lifetime, the time it was
/// issued, and the derived per-direction keys.
pub struct SecurityToken {
    /// Token id, echoed on every chunk secured under it.
    pub token_id: u32,
    /// Requested/revised lifetime.
    pub lifetime: Duration,
    /// When the token was created (used to compute expiry and grace end).
    pub created_at: Instant,
    /// Keys derived for this token's clientNonce/serverNonce pair.
    pub keys: ChannelKeys,
}

impl SecurityToken {
    /// True if `now` is still within the token's nominal lifetime.
    pub fn is_current(&self, now: Instant) -> bool {
        now.duration_since(self.created_at) <= self.lifetime
    }

    /// True if `now` is within the post-expiry grace window during which a
    /// previous token's keys may still decode arriving chunks (§4.5: "25%
    /// of lifetime").
    pub fn is_within_grace(&self, now: Instant) -> bool {
        let grace = self.lifetime.mul_f64(TOKEN_RENEWAL_GRACE_FRACTION);
        now.duration_since(self.created_at) <= self.lifetime + grace
    }
}

/// Tracks the channel's current security token and, immediately after a
/// renewal, the previous one until its grace period elapses.
#[derive(Default)]
pub struct TokenRing {
    current: Option<SecurityToken>,
    previous: Option<SecurityToken>,
}

impl TokenRing {
    /// An empty ring, before the first OPN completes.
    pub fn new() -> Self {
        Self { current: None, previous: None }
    }

    /// Install a freshly negotiated token, demoting the current one to
    /// `previous` (dropping whatever was there before, as it's now past any
    /// reasonable grace window).
    pub fn renew(&mut self, token: SecurityToken) {
        self.previous = self.current.take();
        self.current = Some(token);
    }

    /// The current token, if any.
    pub fn current(&self) -> Option<&SecurityToken> {
        self.current.as_ref()
    }

    /// Find the token (current or, if still within grace, previous) whose
    /// id matches `token_id` — used to decode an arriving chunk.
    pub fn find_for_decode(&self, token_id: u32, now: Instant) -> Option<&SecurityToken> {
        if let Some(token) = &self.current {
            if token.token_id == token_id {
                return Some(token);
            }
        }
        if let Some(token) = &self.previous {
            if token.token_id == token_id && token.is_within_grace(now) {
                return Some(token);
            }
        }
        None
    }

    /// Drop the previous token once its grace period has elapsed.
    pub fn expire_previous(&mut self, now: Instant) {
        if let Some(token) = &self.previous {
            if !token.is_within_grace(now) {
                self.previous = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(token_id: u32, lifetime: Duration) -> SecurityToken {
        SecurityToken {
            token_id,
            lifetime,
            created_at: Instant::now(),
            keys: ChannelKeys { signing_key: vec![], encrypting_key: vec![], iv: vec![] },
        }
    }

    #[test]
    fn renewal_demotes_current_to_previous() {
        let mut ring = TokenRing::new();
        ring.renew(token(1, Duration::from_secs(3600)));
        ring.renew(token(2, Duration::from_secs(3600)));
        assert_eq!(ring.current().unwrap().token_id, 2);
        assert_eq!(ring.previous.as_ref().unwrap().token_id, 1);
    }

    #[test]
    fn find_for_decode_accepts_previous_token_within_grace() {
        let mut ring = TokenRing::new();
        ring.renew(token(1, Duration::from_millis(20)));
        ring.renew(token(2, Duration::from_secs(3600)));
        let found = ring.find_for_decode(1, Instant::now());
        assert!(found.is_some());
    }

    #[test]
    fn find_for_decode_rejects_unknown_token_id() {
        let mut ring = TokenRing::new();
        ring.renew(token(1, Duration::from_secs(3600)));
        assert!(ring.find_for_decode(999, Instant::now()).is_none());
    }
}
