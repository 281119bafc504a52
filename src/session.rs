// Session store: a tamper-evident, cookie-backed session record
//
// Sessions are stateless on the server side. The full record is serialized,
// sealed with AES-256-GCM, and carried by the client under a fixed cookie
// name. Loading never surfaces corruption to callers: a cookie that fails its
// integrity check is treated the same as no cookie at all.

use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::HttpRequest;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::crypto::{decrypt_data, derive_encryption_key, encrypt_data, ENCRYPTION_KEY_SIZE};
use crate::errors::AuthError;

/// Fixed name of the session cookie.
pub const SESSION_COOKIE_NAME: &str = "authgate_session";

/// Absolute lifetime of an authenticated session.
pub const SESSION_MAX_AGE_HOURS: i64 = 8;

/// The authenticated-identity record carried by the session cookie.
///
/// Fixed, strongly-typed fields: a value that decodes at all decodes with the
/// right types, so there is no per-read type assertion to fail. The default
/// value is the unauthenticated empty session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub authenticated: bool,
    pub id: String,
    pub email: String,
    pub fullname: String,
    pub state: String,
}

/// Encrypts and decrypts the session cookie.
#[derive(Clone)]
pub struct SessionStore {
    encryption_key: [u8; ENCRYPTION_KEY_SIZE],
    cookie_secure: bool,
}

impl SessionStore {
    #[must_use]
    pub fn new(secret: &[u8], cookie_secure: bool) -> Self {
        Self {
            encryption_key: derive_encryption_key(secret),
            cookie_secure,
        }
    }

    /// Read the session from the request's cookie.
    ///
    /// An absent cookie yields the empty unauthenticated session. A cookie
    /// that fails decryption or deserialization is logged and likewise treated
    /// as absent; partial or forged contents are never trusted.
    #[must_use]
    pub fn load(&self, req: &HttpRequest) -> SessionData {
        let Some(cookie) = req.cookie(SESSION_COOKIE_NAME) else {
            return SessionData::default();
        };

        match decrypt_data::<SessionData>(cookie.value(), &self.encryption_key) {
            Ok(session) => session,
            Err(e) => {
                let e = AuthError::SessionDecode(e.to_string());
                warn!("discarding session cookie: {e}");
                SessionData::default()
            }
        }
    }

    /// Serialize and seal the full session record into its cookie.
    ///
    /// The whole field set is written in one operation. `max_age` of `None`
    /// produces a browser-session cookie.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SessionSave`] if sealing fails. On failure the
    /// caller must not act as if the session reached the client.
    pub fn save(
        &self,
        session: &SessionData,
        max_age: Option<time::Duration>,
    ) -> Result<Cookie<'static>, AuthError> {
        let value = encrypt_data(session, &self.encryption_key)
            .map_err(|e| AuthError::SessionSave(e.to_string()))?;

        let mut builder = Cookie::build(SESSION_COOKIE_NAME, value)
            .http_only(true)
            .secure(self.cookie_secure)
            .same_site(SameSite::Lax)
            .path("/");
        if let Some(max_age) = max_age {
            builder = builder.max_age(max_age);
        }
        Ok(builder.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RequestBuilder;

    const TEST_SECRET: &[u8] = b"test_session_secret_32_bytes_ok!";

    fn authenticated_session() -> SessionData {
        SessionData {
            authenticated: true,
            id: "42".to_string(),
            email: "a@b.com".to_string(),
            fullname: "A B".to_string(),
            state: "token".to_string(),
        }
    }

    #[test]
    fn missing_cookie_loads_empty_session() {
        let store = SessionStore::new(TEST_SECRET, false);
        let req = RequestBuilder::new().build();

        let session = store.load(&req);
        assert!(!session.authenticated);
        assert!(session.id.is_empty());
    }

    #[test]
    fn save_load_round_trip() {
        let store = SessionStore::new(TEST_SECRET, false);
        let cookie = store
            .save(
                &authenticated_session(),
                Some(time::Duration::hours(SESSION_MAX_AGE_HOURS)),
            )
            .unwrap();

        assert_eq!(cookie.name(), SESSION_COOKIE_NAME);
        assert_eq!(
            cookie.max_age(),
            Some(time::Duration::hours(SESSION_MAX_AGE_HOURS))
        );

        let req = RequestBuilder::new().with_cookie(cookie).build();
        assert_eq!(store.load(&req), authenticated_session());
    }

    #[test]
    fn garbage_cookie_loads_empty_session() {
        let store = SessionStore::new(TEST_SECRET, false);
        let req = RequestBuilder::new()
            .with_cookie(Cookie::new(SESSION_COOKIE_NAME, "not-a-session"))
            .build();

        assert_eq!(store.load(&req), SessionData::default());
    }

    #[test]
    fn cookie_sealed_with_other_key_loads_empty_session() {
        let store = SessionStore::new(TEST_SECRET, false);
        let other = SessionStore::new(b"another_session_secret_32_bytes!", false);
        let cookie = other.save(&authenticated_session(), None).unwrap();

        let req = RequestBuilder::new().with_cookie(cookie).build();
        assert_eq!(store.load(&req), SessionData::default());
    }

    #[test]
    fn session_scoped_cookie_has_no_max_age() {
        let store = SessionStore::new(TEST_SECRET, false);
        let cookie = store.save(&SessionData::default(), None).unwrap();

        assert_eq!(cookie.max_age(), None);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }
}
