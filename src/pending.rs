// Pending login attempts: anti-forgery state tokens awaiting their callback
//
// Each Initiate registers the token it embedded in the provider redirect; the
// matching Callback looks the token up and invalidates it. Keying the registry
// by token value lets concurrent logins from different user agents proceed
// without clobbering each other, which a single shared slot cannot do.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

use crate::crypto::generate_state_token;
use crate::errors::AuthError;

/// Entropy for each state token: 16 bytes, base64url-encoded.
pub const STATE_TOKEN_BYTES: usize = 16;

/// How long a pending token stays redeemable. Comfortably covers a human
/// completing a provider login page.
const PENDING_TTL_MINUTES: i64 = 10;

/// Registry of in-flight state tokens, keyed by token value.
///
/// This is the only process-wide mutable state in the gate; every access goes
/// through the mutex.
#[derive(Debug, Default)]
pub struct PendingStates {
    inner: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl PendingStates {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh state token and register it as pending.
    ///
    /// Stale entries are pruned on each issue so abandoned logins do not
    /// accumulate.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EntropySource`] if token generation fails.
    pub fn issue(&self) -> Result<String, AuthError> {
        let token = generate_state_token(STATE_TOKEN_BYTES)?;
        let mut map = self.lock();
        let now = Utc::now();
        map.retain(|_, issued_at| now - *issued_at < Duration::minutes(PENDING_TTL_MINUTES));
        map.insert(token.clone(), now);
        Ok(token)
    }

    /// Check whether a token is pending and still fresh, without consuming it.
    #[must_use]
    pub fn verify(&self, token: &str) -> bool {
        let ttl = Duration::minutes(PENDING_TTL_MINUTES);
        self.lock()
            .get(token)
            .is_some_and(|issued_at| Utc::now() - *issued_at < ttl)
    }

    /// Invalidate a pending token, succeeding at most once per token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidState`] if the token is unknown, already
    /// consumed, or expired.
    pub fn consume(&self, token: &str) -> Result<(), AuthError> {
        let issued_at = self.lock().remove(token).ok_or(AuthError::InvalidState)?;
        if Utc::now() - issued_at < Duration::minutes(PENDING_TTL_MINUTES) {
            Ok(())
        } else {
            Err(AuthError::InvalidState)
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        // A poisoned lock only means another request panicked mid-insert;
        // the map contents remain usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn backdate_past_ttl(pending: &PendingStates, token: &str) {
        let stale = Utc::now() - Duration::minutes(PENDING_TTL_MINUTES + 1);
        pending.lock().insert(token.to_string(), stale);
    }

    #[test]
    fn issued_token_verifies() {
        let pending = PendingStates::new();
        let token = pending.issue().unwrap();

        assert!(pending.verify(&token));
    }

    #[test]
    fn unknown_token_fails_verification() {
        let pending = PendingStates::new();
        pending.issue().unwrap();

        assert!(!pending.verify("not-a-real-token"));
        assert!(pending.consume("not-a-real-token").is_err());
    }

    #[test]
    fn consume_is_single_use() {
        let pending = PendingStates::new();
        let token = pending.issue().unwrap();

        assert!(pending.consume(&token).is_ok());
        assert!(pending.consume(&token).is_err());
        assert!(!pending.verify(&token));
    }

    #[test]
    fn concurrent_logins_do_not_clobber_each_other() {
        let pending = PendingStates::new();
        let first = pending.issue().unwrap();
        let second = pending.issue().unwrap();

        assert_ne!(first, second);
        assert!(pending.verify(&first));
        assert!(pending.verify(&second));
        assert!(pending.consume(&first).is_ok());
        assert!(pending.consume(&second).is_ok());
    }

    #[test]
    fn expired_token_is_rejected() {
        let pending = PendingStates::new();
        let token = pending.issue().unwrap();

        backdate_past_ttl(&pending, &token);

        assert!(!pending.verify(&token));
        assert!(pending.consume(&token).is_err());
    }

    #[test]
    fn issue_prunes_stale_entries() {
        let pending = PendingStates::new();
        let stale = pending.issue().unwrap();
        backdate_past_ttl(&pending, &stale);

        pending.issue().unwrap();

        assert!(!pending.lock().contains_key(&stale));
    }

    #[tokio::test]
    async fn concurrent_issuance_keeps_every_token_redeemable() {
        let pending = Arc::new(PendingStates::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pending = Arc::clone(&pending);
                tokio::spawn(async move { pending.issue().unwrap() })
            })
            .collect();

        let mut tokens = Vec::new();
        for handle in handles {
            tokens.push(handle.await.unwrap());
        }

        for token in &tokens {
            assert!(pending.verify(token));
            assert!(pending.consume(token).is_ok());
        }
    }
}
