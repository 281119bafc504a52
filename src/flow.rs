// The authorization flow state machine
//
// Idle -> PendingAuthorization (state token issued) -> CallbackReceived ->
// {Authenticated | Rejected}. Terminal states are per-request-cycle; the next
// Initiate starts a fresh cycle.
//
// Every fallible step of the callback pipeline short-circuits: a failed
// exchange never reaches the profile fetch, a failed fetch never reaches the
// session save, and a failed save is never presented as a successful login.

use std::sync::Arc;

use actix_web::cookie::{time, Cookie};
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse};
use log::{error, info, warn};

use crate::errors::AuthError;
use crate::pending::PendingStates;
use crate::provider::IdentityProvider;
use crate::session::{SessionData, SessionStore, SESSION_MAX_AGE_HOURS};

/// Where every flow boundary sends the user agent afterwards.
const HOME: &str = "/";

/// Orchestrates the three-step OAuth2 exchange: initiate, callback/validate,
/// finalize session.
pub struct AuthFlow {
    provider: Arc<dyn IdentityProvider>,
    pending: PendingStates,
    store: SessionStore,
}

impl AuthFlow {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, store: SessionStore) -> Self {
        Self {
            provider,
            pending: PendingStates::new(),
            store,
        }
    }

    #[must_use]
    pub fn session_store(&self) -> &SessionStore {
        &self.store
    }

    /// Initiate: issue a state token and redirect to the provider.
    ///
    /// Touches no session. If the token cannot be generated or the
    /// authorization URL cannot be built, the attempt is abandoned with a
    /// redirect home; a login is never started without a fresh token.
    #[must_use]
    pub fn begin_login(&self) -> HttpResponse {
        let token = match self.pending.issue() {
            Ok(token) => token,
            Err(e) => {
                error!("login initiation failed: {e}");
                return redirect_to(HOME);
            }
        };

        match self.provider.authorization_url(&token) {
            Ok(auth_url) => redirect_to(&auth_url),
            Err(e) => {
                error!("failed to build authorization URL: {e}");
                redirect_to(HOME)
            }
        }
    }

    /// Callback: validate the state token, exchange the code, fetch the
    /// profile, and finalize the session.
    ///
    /// All outcomes redirect to the application root; only a successful
    /// finalization attaches the session cookie.
    pub async fn complete_login(&self, state: &str, code: &str) -> HttpResponse {
        match self.run_callback(state, code).await {
            Ok(cookie) => {
                let mut response = redirect_to(HOME);
                if let Err(e) = response.add_cookie(&cookie) {
                    // Treat like any other save failure: no session reaches
                    // the client, the redirect stays cookie-less
                    error!("failed to attach session cookie: {e}");
                    return redirect_to(HOME);
                }
                response
            }
            Err(e) => {
                warn!("login rejected: {e}");
                redirect_to(HOME)
            }
        }
    }

    async fn run_callback(&self, state: &str, code: &str) -> Result<Cookie<'static>, AuthError> {
        // CSRF validation comes first; a mismatched state never reaches the
        // provider
        if !self.pending.verify(state) {
            return Err(AuthError::InvalidState);
        }

        let credential = self.provider.exchange_code(code).await?;
        if !credential.is_valid() {
            return Err(AuthError::Exchange(
                "provider returned an expired or malformed credential".to_string(),
            ));
        }

        // Re-validate and invalidate the token before the profile fetch:
        // defense in depth, and each token is redeemable exactly once
        self.pending.consume(state)?;

        let profile = self.provider.fetch_profile(&credential).await?;

        let session = SessionData {
            authenticated: true,
            id: profile.id,
            email: profile.email,
            fullname: profile.fullname,
            state: state.to_string(),
        };
        let cookie = self
            .store
            .save(&session, Some(time::Duration::hours(SESSION_MAX_AGE_HOURS)))?;

        info!("authenticated session created for {}", session.email);
        Ok(cookie)
    }

    /// Revoke the session's authentication, keeping the other fields inert.
    ///
    /// A save failure halts without redirecting; the client must not observe
    /// a logout that did not persist.
    #[must_use]
    pub fn logout(&self, req: &HttpRequest) -> HttpResponse {
        let mut session = self.store.load(req);
        session.authenticated = false;

        match self.store.save(&session, None) {
            Ok(cookie) => {
                let mut response = redirect_to(HOME);
                if let Err(e) = response.add_cookie(&cookie) {
                    error!("failed to attach logout cookie: {e}");
                    return HttpResponse::InternalServerError().finish();
                }
                response
            }
            Err(e) => {
                error!("logout failed: {e}");
                HttpResponse::InternalServerError().finish()
            }
        }
    }
}

fn redirect_to(location: &str) -> HttpResponse {
    HttpResponse::TemporaryRedirect()
        .insert_header((header::LOCATION, location))
        .finish()
}
