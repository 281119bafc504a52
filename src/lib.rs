#![warn(clippy::pedantic)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the authgate application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod crypto;
pub mod errors;
pub mod flow;
pub mod gate;
pub mod handlers;
pub mod pending;
pub mod provider;
pub mod session;
pub mod settings;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use errors::AuthError;
pub use flow::AuthFlow;
pub use gate::AuthGate;
pub use provider::{HttpProvider, IdentityProvider};
pub use session::{SessionData, SessionStore};
pub use settings::AuthGateSettings;
