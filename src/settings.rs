use serde::{Deserialize, Serialize};
use std::env;
use std::fs;

use crate::crypto::generate_state_token;
use crate::errors::AuthError;

const SETTINGS_FILE: &str = "Settings.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthGateSettings {
    pub application: ApplicationSettings,
    pub session: SessionSettings,
    pub cookies: CookieSettings,
    pub logging: LoggingSettings,
    pub provider: ProviderSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// Base URL the provider redirects back to; `/callback` is appended.
    pub redirect_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Secret key material for sealing the session cookie. Generated at
    /// startup if left empty, which invalidates sessions across restarts.
    pub session_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieSettings {
    pub secure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    pub scopes: Vec<String>,

    // Direct values (can be overridden by environment variables)
    pub client_id: Option<String>,
    pub client_secret: Option<String>,

    // Environment variable names for overrides
    pub client_id_env: Option<String>,
    pub client_secret_env: Option<String>,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            redirect_base_url: "http://localhost:8080".to_string(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            session_secret: String::new(),
        }
    }
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self { secure: true }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            authorization_endpoint: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_endpoint: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_endpoint: "https://www.googleapis.com/oauth2/v2/userinfo".to_string(),
            scopes: vec![
                "https://www.googleapis.com/auth/userinfo.email".to_string(),
                "https://www.googleapis.com/auth/userinfo.profile".to_string(),
            ],
            client_id: None,
            client_secret: None,
            client_id_env: Some("AUTHGATE_CLIENT_ID".to_string()),
            client_secret_env: Some("AUTHGATE_CLIENT_SECRET".to_string()),
        }
    }
}

impl ProviderSettings {
    /// Resolve the client id, preferring the configured environment variable.
    #[must_use]
    pub fn get_client_id(&self) -> Option<String> {
        resolve_with_env(self.client_id_env.as_deref(), self.client_id.as_deref())
    }

    /// Resolve the client secret, preferring the configured environment variable.
    #[must_use]
    pub fn get_client_secret(&self) -> Option<String> {
        resolve_with_env(
            self.client_secret_env.as_deref(),
            self.client_secret.as_deref(),
        )
    }
}

fn resolve_with_env(env_name: Option<&str>, direct: Option<&str>) -> Option<String> {
    if let Some(name) = env_name {
        if let Ok(value) = env::var(name) {
            if !value.is_empty() {
                return Some(value);
            }
        }
    }
    direct
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

impl AuthGateSettings {
    /// Load configuration from `Settings.toml` (falling back to defaults when
    /// absent), apply environment overrides, ensure a session secret, and
    /// initialize the logger.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if the settings file exists but cannot be
    /// parsed, or if a session secret cannot be generated.
    pub fn load() -> Result<Self, AuthError> {
        let mut settings = match fs::read_to_string(SETTINGS_FILE) {
            Ok(contents) => basic_toml::from_str(&contents)
                .map_err(|e| AuthError::Config(format!("failed to parse {SETTINGS_FILE}: {e}")))?,
            Err(_) => Self::default(),
        };

        settings.apply_env_overrides();
        settings.ensure_session_secret()?;
        settings.initialize_logging();
        Ok(settings)
    }

    /// Environment overrides for deployment-specific values.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("REDIRECT_BASE_URL") {
            if !url.is_empty() {
                self.application.redirect_base_url = url;
            }
        }
        if let Ok(secret) = env::var("SESSION_SECRET") {
            if !secret.is_empty() {
                self.session.session_secret = secret;
            }
        }
    }

    fn ensure_session_secret(&mut self) -> Result<(), AuthError> {
        if self.session.session_secret.is_empty() {
            log::warn!(
                "no session secret configured; generating one (sessions will not survive restarts)"
            );
            self.session.session_secret = generate_state_token(32)?;
        }
        Ok(())
    }

    fn initialize_logging(&self) {
        let env = env_logger::Env::default().default_filter_or(&self.logging.level);
        // Tests may initialize more than once
        let _ = env_logger::Builder::from_env(env).try_init();
    }

    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }
}
