//! The provider capability interface.
//!
//! The login flow is one state machine; everything provider-specific sits
//! behind [`OAuthProvider`]. Adding a provider means implementing this
//! trait and registering it under a name, without touching the flow itself.

use async_trait::async_trait;

use amber_gateway_identity::ProviderProfile;

/// Correlation material generated when building an authorization URL.
///
/// Carried across the redirect round trip in the login-state cookie and
/// checked on callback.
#[derive(Debug, Clone)]
pub struct AuthChallenge {
    /// CSRF/state token echoed back by the provider.
    pub csrf_token: String,
    /// PKCE code verifier matching the challenge embedded in the URL.
    pub pkce_verifier: String,
}

/// Capability interface for an external OAuth2 identity provider.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// The name this provider is registered and routed under.
    fn name(&self) -> &str;

    /// Builds the provider authorization URL and the correlation material
    /// to stash until the callback.
    fn authorization_url(&self) -> (String, AuthChallenge);

    /// Exchanges an authorization code for an access token.
    async fn exchange_code(&self, code: &str, pkce_verifier: &str) -> Result<String, OAuthError>;

    /// Resolves an access token into the provider's profile data.
    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, OAuthError>;
}

/// Errors terminating a login flow.
///
/// None of these crash the process; the flow boundary converts them into a
/// redirect to the failure landing target without leaking detail.
#[derive(Debug)]
pub enum OAuthError {
    /// Provider configuration was invalid. Surfaces at startup only.
    Configuration(String),
    /// The provider returned an error instead of an authorization code.
    ProviderRejected(String),
    /// The echoed state token did not match the stored login state.
    StateMismatch,
    /// The token exchange did not complete within the configured bound.
    Timeout,
    /// The token exchange failed.
    Exchange(String),
    /// The profile fetch failed.
    Profile(String),
}

impl std::fmt::Display for OAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "provider configuration error: {msg}"),
            Self::ProviderRejected(msg) => write!(f, "provider rejected the request: {msg}"),
            Self::StateMismatch => write!(f, "state token mismatch"),
            Self::Timeout => write!(f, "provider token exchange timed out"),
            Self::Exchange(msg) => write!(f, "token exchange failed: {msg}"),
            Self::Profile(msg) => write!(f, "profile fetch failed: {msg}"),
        }
    }
}

impl std::error::Error for OAuthError {}
