// Authorization gate: fail-closed wrapper around protected operations

use std::future::Future;

use actix_web::{HttpRequest, HttpResponse};
use log::info;

use crate::session::{SessionData, SessionStore};

/// Decides whether a protected operation runs.
///
/// Wrap any operation with [`AuthGate::protect`]: the gate loads the session
/// from the request and either invokes the operation or answers `403
/// Forbidden` without invoking it. A missing cookie, an undecodable cookie,
/// and an unauthenticated session all fail closed the same way. Rejection
/// mutates nothing.
#[derive(Clone)]
pub struct AuthGate {
    store: SessionStore,
}

impl AuthGate {
    #[must_use]
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    /// Run `operation` only if the request carries an authenticated session.
    pub async fn protect<F, Fut>(&self, req: &HttpRequest, operation: F) -> HttpResponse
    where
        F: FnOnce(SessionData) -> Fut,
        Fut: Future<Output = HttpResponse>,
    {
        let session = self.store.load(req);
        if !session.authenticated {
            return HttpResponse::Forbidden().finish();
        }

        info!("authenticated user accessing protected page: {}", session.email);
        operation(session).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SESSION_COOKIE_NAME;
    use crate::testing::RequestBuilder;
    use actix_web::cookie::Cookie;
    use actix_web::http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TEST_SECRET: &[u8] = b"test_session_secret_32_bytes_ok!";

    fn gate() -> AuthGate {
        AuthGate::new(SessionStore::new(TEST_SECRET, false))
    }

    async fn protect_counting(gate: &AuthGate, req: &HttpRequest) -> (HttpResponse, usize) {
        let calls = AtomicUsize::new(0);
        let response = gate
            .protect(req, |_session| async {
                calls.fetch_add(1, Ordering::SeqCst);
                HttpResponse::Ok().body("secret")
            })
            .await;
        let count = calls.load(Ordering::SeqCst);
        (response, count)
    }

    #[actix_web::test]
    async fn missing_cookie_is_forbidden() {
        let gate = gate();
        let req = RequestBuilder::new().build();

        let (response, calls) = protect_counting(&gate, &req).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(calls, 0);
    }

    #[actix_web::test]
    async fn malformed_cookie_is_forbidden() {
        let gate = gate();
        let req = RequestBuilder::new()
            .with_cookie(Cookie::new(SESSION_COOKIE_NAME, "garbage"))
            .build();

        let (response, calls) = protect_counting(&gate, &req).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(calls, 0);
    }

    #[actix_web::test]
    async fn unauthenticated_session_is_forbidden() {
        let store = SessionStore::new(TEST_SECRET, false);
        let gate = AuthGate::new(store.clone());

        let session = SessionData {
            authenticated: false,
            email: "a@b.com".to_string(),
            ..SessionData::default()
        };
        let cookie = store.save(&session, None).unwrap();
        let req = RequestBuilder::new().with_cookie(cookie).build();

        let (response, calls) = protect_counting(&gate, &req).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(calls, 0);
    }

    #[actix_web::test]
    async fn authenticated_session_runs_operation() {
        let store = SessionStore::new(TEST_SECRET, false);
        let gate = AuthGate::new(store.clone());

        let session = SessionData {
            authenticated: true,
            id: "42".to_string(),
            email: "a@b.com".to_string(),
            fullname: "A B".to_string(),
            state: "tok".to_string(),
        };
        let cookie = store.save(&session, None).unwrap();
        let req = RequestBuilder::new().with_cookie(cookie).build();

        let (response, calls) = protect_counting(&gate, &req).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls, 1);
    }
}
