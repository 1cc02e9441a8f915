//! Google OAuth2 provider adapter.
//!
//! Drives the authorization-code grant against Google's endpoints and
//! resolves access tokens into profile data via the userinfo endpoint.

use async_trait::async_trait;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl, basic::BasicClient,
};
use serde::Deserialize;

use amber_gateway_identity::ProviderProfile;

use super::provider::{AuthChallenge, OAuthError, OAuthProvider};
use crate::config::OauthConfig;

/// Google OAuth authorization URL.
const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google OAuth token URL.
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Google userinfo endpoint, resolving access tokens to profile data.
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Bound on the userinfo fetch.
const PROFILE_FETCH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Google OAuth2 provider.
pub struct GoogleProvider {
    client_id: String,
    client_secret: String,
    auth_url: String,
    token_url: String,
    userinfo_url: String,
    redirect_url: String,
    scopes: Vec<String>,
}

/// Profile fields returned by Google's userinfo endpoint.
#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

impl GoogleProvider {
    /// Creates the Google adapter from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured redirect URI is not a valid URL.
    pub fn new(config: &OauthConfig) -> Result<Self, OAuthError> {
        // Validate up front so the URL constructors below cannot fail
        let _ = RedirectUrl::new(config.redirect_uri.clone())
            .map_err(|e| OAuthError::Configuration(format!("invalid redirect URI: {e}")))?;

        Ok(Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
            redirect_url: config.redirect_uri.clone(),
            scopes: config.scopes().iter().map(|s| (*s).to_string()).collect(),
        })
    }
}

fn profile_from_userinfo(info: GoogleUserInfo) -> ProviderProfile {
    ProviderProfile::new(info.id)
        .with_email(info.email)
        .with_display_name(info.name)
        .with_avatar_url(info.picture)
}

#[async_trait]
impl OAuthProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn authorization_url(&self) -> (String, AuthChallenge) {
        let client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.client_secret.clone()))
            .set_auth_uri(AuthUrl::new(self.auth_url.clone()).expect("valid auth URL"))
            .set_redirect_uri(
                RedirectUrl::new(self.redirect_url.clone()).expect("valid redirect URL"),
            );

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_request = client
            .authorize_url(CsrfToken::new_random)
            .set_pkce_challenge(pkce_challenge);

        for scope in &self.scopes {
            auth_request = auth_request.add_scope(Scope::new(scope.clone()));
        }

        let (auth_url, csrf_token) = auth_request.url();

        let challenge = AuthChallenge {
            csrf_token: csrf_token.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
        };

        (auth_url.to_string(), challenge)
    }

    async fn exchange_code(&self, code: &str, pkce_verifier: &str) -> Result<String, OAuthError> {
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| OAuthError::Exchange(format!("HTTP client error: {e}")))?;

        let client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.client_secret.clone()))
            .set_token_uri(TokenUrl::new(self.token_url.clone()).expect("valid token URL"))
            .set_redirect_uri(
                RedirectUrl::new(self.redirect_url.clone()).expect("valid redirect URL"),
            );

        let token_response = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_string()))
            .request_async(&http_client)
            .await
            .map_err(|e| OAuthError::Exchange(e.to_string()))?;

        Ok(token_response.access_token().secret().clone())
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, OAuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(PROFILE_FETCH_TIMEOUT)
            .build()
            .map_err(|e| OAuthError::Profile(format!("HTTP client error: {e}")))?;

        let response = http_client
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| OAuthError::Profile(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OAuthError::Profile(format!(
                "userinfo returned {}",
                response.status()
            )));
        }

        let info: GoogleUserInfo = response
            .json()
            .await
            .map_err(|e| OAuthError::Profile(format!("malformed userinfo response: {e}")))?;

        Ok(profile_from_userinfo(info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_provider() -> GoogleProvider {
        let config = OauthConfig {
            client_id: "test-client-id".to_string(),
            client_secret: "test-client-secret".to_string(),
            redirect_uri: "http://localhost:8000/auth/google/callback".to_string(),
            scopes: "profile,email".to_string(),
            exchange_timeout_seconds: 10,
        };
        GoogleProvider::new(&config).expect("valid config")
    }

    #[test]
    fn new_rejects_invalid_redirect_uri() {
        let config = OauthConfig {
            client_id: "c".to_string(),
            client_secret: "s".to_string(),
            redirect_uri: "not a url".to_string(),
            scopes: "profile,email".to_string(),
            exchange_timeout_seconds: 10,
        };
        let err = GoogleProvider::new(&config).err().expect("should reject");
        assert!(matches!(err, OAuthError::Configuration(_)));
    }

    #[test]
    fn authorization_url_contains_provider_and_redirect() {
        let provider = test_provider();
        let (url, challenge) = provider.authorization_url();

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth"));
        assert!(url.contains("client_id=test-client-id"));
        assert!(url.contains("redirect_uri="));
        assert!(url.contains("callback"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope="));
        assert!(url.contains("profile"));
        assert!(url.contains("email"));
        assert!(url.contains("code_challenge="));
        assert!(url.contains(&format!("state={}", challenge.csrf_token)));
        assert!(!challenge.pkce_verifier.is_empty());
    }

    #[test]
    fn successive_challenges_are_unique() {
        let provider = test_provider();
        let (_, first) = provider.authorization_url();
        let (_, second) = provider.authorization_url();
        assert_ne!(first.csrf_token, second.csrf_token);
        assert_ne!(first.pkce_verifier, second.pkce_verifier);
    }

    #[test]
    fn userinfo_maps_to_profile() {
        let info = GoogleUserInfo {
            id: "109837624".to_string(),
            email: Some("alice@example.com".to_string()),
            name: Some("Alice".to_string()),
            picture: Some("https://lh3.googleusercontent.com/a".to_string()),
        };
        let profile = profile_from_userinfo(info);
        assert_eq!(profile.subject, "109837624");
        assert_eq!(profile.email.as_deref(), Some("alice@example.com"));
        assert_eq!(profile.display_name.as_deref(), Some("Alice"));
        assert_eq!(
            profile.avatar_url.as_deref(),
            Some("https://lh3.googleusercontent.com/a")
        );
    }

    #[test]
    fn userinfo_tolerates_sparse_response() {
        let info: GoogleUserInfo =
            serde_json::from_str(r#"{"id": "109837624"}"#).expect("deserialize");
        let profile = profile_from_userinfo(info);
        assert_eq!(profile.subject, "109837624");
        assert!(profile.email.is_none());
    }

    #[test]
    fn provider_name_is_google() {
        assert_eq!(test_provider().name(), "google");
    }
}
