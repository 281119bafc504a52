// Error taxonomy for the authentication gate
//
// Every variant is request-scoped: the flow boundary handles all of them by
// logging and falling back to a safe response, never by terminating the process.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The OS random source could not supply entropy for a state token.
    /// Fatal to the current login attempt; never substituted with weak output.
    #[error("entropy source unavailable: {0}")]
    EntropySource(String),

    /// The callback's state parameter did not match any pending login attempt.
    #[error("state token mismatch")]
    InvalidState,

    /// The authorization-code exchange with the provider failed.
    #[error("code exchange failed: {0}")]
    Exchange(String),

    /// The authenticated profile fetch from the provider failed.
    #[error("profile fetch failed: {0}")]
    Fetch(String),

    /// The session cookie was present but failed its integrity check.
    #[error("session cookie could not be decoded: {0}")]
    SessionDecode(String),

    /// The session cookie could not be serialized or sealed.
    #[error("session cookie could not be saved: {0}")]
    SessionSave(String),

    /// Invalid or incomplete startup configuration.
    #[error("configuration error: {0}")]
    Config(String),
}
