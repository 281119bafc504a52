// Identity provider boundary: authorization URL, code exchange, profile fetch
//
// The provider is an opaque remote service behind the `IdentityProvider`
// trait; the flow never sees HTTP details. `HttpProvider` is the production
// implementation over reqwest.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::time::Duration as StdDuration;

use crate::errors::AuthError;
use crate::settings::{ApplicationSettings, ProviderSettings};

/// Timeout applied to every provider call. A timed-out exchange or fetch maps
/// to its flow error instead of hanging the request.
const PROVIDER_TIMEOUT_SECS: u64 = 10;

/// Token credential obtained from the authorization-code exchange.
#[derive(Debug, Clone)]
pub struct TokenCredential {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenCredential {
    /// Whether the provider-issued credential is usable: well-formed and
    /// non-expired.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && self.expires_at > Utc::now()
    }
}

/// Authenticated user profile as returned by the provider's userinfo endpoint.
///
/// Transient: exists only for the duration of callback handling, and only the
/// fields copied into the session outlive it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub verified_email: bool,
    #[serde(default)]
    pub picture: String,
    #[serde(rename = "name", default)]
    pub fullname: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
}

/// Wire shape of the provider's token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

/// Boundary contract with the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Deterministic authorization URL embedding the state token and scopes.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if the configured endpoint cannot be
    /// parsed as a URL.
    fn authorization_url(&self, state: &str) -> Result<String, AuthError>;

    /// Exchange an authorization code for a token credential.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Exchange`] on network failure, provider error, or
    /// an invalid code.
    async fn exchange_code(&self, code: &str) -> Result<TokenCredential, AuthError>;

    /// Fetch the authenticated user's profile.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Fetch`] on network failure or a profile missing
    /// its subject id.
    async fn fetch_profile(&self, credential: &TokenCredential) -> Result<UserProfile, AuthError>;
}

/// Production provider client over HTTP.
pub struct HttpProvider {
    settings: ProviderSettings,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    http_client: reqwest::Client,
}

impl HttpProvider {
    /// Build the provider client from startup configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if client credentials are missing or the
    /// HTTP client cannot be constructed.
    pub fn new(
        provider: &ProviderSettings,
        application: &ApplicationSettings,
    ) -> Result<Self, AuthError> {
        let client_id = provider
            .get_client_id()
            .ok_or_else(|| AuthError::Config("provider client id is not configured".to_string()))?;
        let client_secret = provider.get_client_secret().ok_or_else(|| {
            AuthError::Config("provider client secret is not configured".to_string())
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(PROVIDER_TIMEOUT_SECS))
            .build()
            .map_err(|e| AuthError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            settings: provider.clone(),
            client_id,
            client_secret,
            redirect_uri: format!("{}/callback", application.redirect_base_url),
            http_client,
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpProvider {
    fn authorization_url(&self, state: &str) -> Result<String, AuthError> {
        let mut url = url::Url::parse(&self.settings.authorization_endpoint)
            .map_err(|e| AuthError::Config(format!("invalid authorization endpoint: {e}")))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.settings.scopes.join(" "))
            .append_pair("state", state);

        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenCredential, AuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.redirect_uri),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ];

        let response = self
            .http_client
            .post(&self.settings.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unreadable response body".to_string());
            return Err(AuthError::Exchange(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Exchange(format!("malformed token response: {e}")))?;

        // Providers that omit expires_in get the conventional 1 hour
        let lifetime = token.expires_in.map_or(Duration::hours(1), |secs| {
            Duration::seconds(i64::try_from(secs).unwrap_or(3600))
        });

        Ok(TokenCredential {
            access_token: token.access_token,
            expires_at: Utc::now() + lifetime,
        })
    }

    async fn fetch_profile(&self, credential: &TokenCredential) -> Result<UserProfile, AuthError> {
        let response = self
            .http_client
            .get(&self.settings.userinfo_endpoint)
            .bearer_auth(&credential.access_token)
            .send()
            .await
            .map_err(|e| AuthError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Fetch(format!(
                "userinfo endpoint returned {status}"
            )));
        }

        let profile: UserProfile = response
            .json()
            .await
            .map_err(|e| AuthError::Fetch(format!("malformed profile response: {e}")))?;

        // A session must never be created around an empty identity
        if profile.id.is_empty() || profile.email.is_empty() {
            return Err(AuthError::Fetch(
                "profile response missing subject id or email".to_string(),
            ));
        }

        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::AuthGateSettings;

    fn configured_provider() -> HttpProvider {
        let mut settings = AuthGateSettings::default();
        settings.provider.client_id = Some("test-client".to_string());
        settings.provider.client_secret = Some("test-secret".to_string());
        HttpProvider::new(&settings.provider, &settings.application).unwrap()
    }

    #[test]
    fn authorization_url_embeds_state_and_scopes() {
        let provider = configured_provider();
        let url_str = provider.authorization_url("tok123").unwrap();
        let url = url::Url::parse(&url_str).unwrap();

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert!(pairs.contains(&("state".to_string(), "tok123".to_string())));
        assert!(pairs.contains(&("client_id".to_string(), "test-client".to_string())));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs
            .iter()
            .any(|(k, v)| k == "redirect_uri" && v.ends_with("/callback")));
        assert!(pairs.iter().any(|(k, _)| k == "scope"));
    }

    #[test]
    fn authorization_url_is_deterministic() {
        let provider = configured_provider();
        assert_eq!(
            provider.authorization_url("same").unwrap(),
            provider.authorization_url("same").unwrap()
        );
    }

    #[test]
    fn missing_credentials_fail_construction() {
        let settings = AuthGateSettings::default();
        assert!(matches!(
            HttpProvider::new(&settings.provider, &settings.application),
            Err(AuthError::Config(_))
        ));
    }

    #[test]
    fn expired_credential_is_invalid() {
        let expired = TokenCredential {
            access_token: "tok".to_string(),
            expires_at: Utc::now() - Duration::minutes(1),
        };
        let empty = TokenCredential {
            access_token: String::new(),
            expires_at: Utc::now() + Duration::hours(1),
        };
        let fresh = TokenCredential {
            access_token: "tok".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        };

        assert!(!expired.is_valid());
        assert!(!empty.is_valid());
        assert!(fresh.is_valid());
    }

    #[test]
    fn profile_deserializes_userinfo_shape() {
        let raw = r#"{
            "id": "42",
            "email": "a@b.com",
            "verified_email": true,
            "picture": "https://example.com/p.png",
            "name": "A B",
            "given_name": "A",
            "family_name": "B"
        }"#;

        let profile: UserProfile = serde_json::from_str(raw).unwrap();
        assert_eq!(profile.id, "42");
        assert_eq!(profile.email, "a@b.com");
        assert_eq!(profile.fullname, "A B");
        assert!(profile.verified_email);
    }
}
