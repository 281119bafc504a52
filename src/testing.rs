//! Testing utilities: request builders and a call-counting fake provider
//!
//! Compiled for unit tests and, behind the `testing` feature, for integration
//! tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use actix_web::cookie::Cookie;
use actix_web::{test, HttpRequest};
use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::errors::AuthError;
use crate::provider::{IdentityProvider, TokenCredential, UserProfile};

/// Builder for test HTTP requests.
pub struct RequestBuilder {
    cookies: Vec<Cookie<'static>>,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cookies: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_cookie(mut self, cookie: Cookie<'static>) -> Self {
        self.cookies.push(cookie);
        self
    }

    #[must_use]
    pub fn build(self) -> HttpRequest {
        let mut request = test::TestRequest::default();
        for cookie in self.cookies {
            request = request.cookie(cookie);
        }
        request.to_http_request()
    }
}

/// Fake identity provider with configurable failures and call counters.
pub struct MockProvider {
    fail_exchange: bool,
    fail_fetch: bool,
    expired_credential: bool,
    profile: UserProfile,
    exchange_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Happy-path provider returning a valid credential and the test profile.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fail_exchange: false,
            fail_fetch: false,
            expired_credential: false,
            profile: Self::test_profile(),
            exchange_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn failing_exchange() -> Self {
        Self {
            fail_exchange: true,
            ..Self::new()
        }
    }

    #[must_use]
    pub fn failing_fetch() -> Self {
        Self {
            fail_fetch: true,
            ..Self::new()
        }
    }

    #[must_use]
    pub fn with_expired_credential() -> Self {
        Self {
            expired_credential: true,
            ..Self::new()
        }
    }

    #[must_use]
    pub fn test_profile() -> UserProfile {
        UserProfile {
            id: "42".to_string(),
            email: "a@b.com".to_string(),
            verified_email: true,
            picture: String::new(),
            fullname: "A B".to_string(),
            given_name: "A".to_string(),
            family_name: "B".to_string(),
        }
    }

    #[must_use]
    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for MockProvider {
    fn authorization_url(&self, state: &str) -> Result<String, AuthError> {
        let mut url = url::Url::parse("https://provider.test/authorize")
            .map_err(|e| AuthError::Config(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("client_id", "test-client")
            .append_pair("redirect_uri", "http://localhost:8080/callback")
            .append_pair("response_type", "code")
            .append_pair("scope", "email profile")
            .append_pair("state", state);
        Ok(url.to_string())
    }

    async fn exchange_code(&self, _code: &str) -> Result<TokenCredential, AuthError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_exchange {
            return Err(AuthError::Exchange("exchange refused by fake".to_string()));
        }

        let expires_at = if self.expired_credential {
            Utc::now() - Duration::minutes(1)
        } else {
            Utc::now() + Duration::hours(1)
        };
        Ok(TokenCredential {
            access_token: "fake-access-token".to_string(),
            expires_at,
        })
    }

    async fn fetch_profile(&self, _credential: &TokenCredential) -> Result<UserProfile, AuthError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch {
            return Err(AuthError::Fetch("fetch refused by fake".to_string()));
        }
        Ok(self.profile.clone())
    }
}
