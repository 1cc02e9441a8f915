//! Authentication module for the amber-gateway server.
//!
//! This module composes the three trust mechanisms of the login flow and
//! keeps their boundaries explicit:
//! - The OAuth2 authorization-code exchange with the external provider
//!   (`provider`, `google`), used only during login.
//! - The short-lived login-state bridge (`bridge`), used only to survive
//!   the redirect round trip; never consulted afterwards.
//! - The stateless bearer token (issued in `routes`, checked in
//!   `middleware`), used for every subsequent API call with no session or
//!   store dependency.

pub mod bridge;
pub mod google;
pub mod middleware;
pub mod provider;
pub mod routes;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use std::collections::HashMap;
use std::sync::Arc;

use amber_gateway_identity::{Role, TokenIssuer, TokenVerifier};

use crate::config::{ClientConfig, ServerConfig};
use crate::db::Database;

pub use google::GoogleProvider;
pub use middleware::RequireAuth;
pub use provider::OAuthProvider;
pub use routes::{callback, login};

/// Shared application state.
pub struct AppState {
    /// Lazy process-wide database handle.
    pub db: Arc<Database>,
    /// Registered provider adapters, keyed by route name.
    pub providers: HashMap<String, Arc<dyn OAuthProvider>>,
    /// Mints bearer tokens after a completed exchange.
    pub token_issuer: TokenIssuer,
    /// Validates bearer tokens on protected routes.
    pub token_verifier: TokenVerifier,
    /// Key signing and encrypting the login-state cookie.
    pub cookie_key: Key,
    /// Client application redirect targets.
    pub client: ClientConfig,
    /// Login-state cookie lifetime in minutes.
    pub state_ttl_minutes: i64,
    /// Whether cookies carry the Secure flag.
    pub secure_cookies: bool,
    /// Bound on the provider token-exchange call.
    pub exchange_timeout: std::time::Duration,
}

impl AppState {
    /// Creates the application state from configuration and the registered
    /// providers.
    #[must_use]
    pub fn new(
        config: &ServerConfig,
        cookie_key: Key,
        db: Arc<Database>,
        providers: HashMap<String, Arc<dyn OAuthProvider>>,
    ) -> Self {
        Self {
            db,
            providers,
            token_issuer: TokenIssuer::new(&config.auth.token_secret, config.auth.token_ttl()),
            token_verifier: TokenVerifier::new(&config.auth.token_secret),
            cookie_key,
            client: config.client.clone(),
            state_ttl_minutes: config.auth.state_ttl_minutes,
            secure_cookies: config.auth.secure_cookies,
            exchange_timeout: config.oauth.exchange_timeout(),
        }
    }

    /// The client application URL receiving the issued token.
    ///
    /// The token rides in the query string, a logged/cacheable surface;
    /// accepted trade-off of this design, bounded by the token TTL.
    #[must_use]
    pub fn success_url(&self, token: &str, role: Role) -> String {
        format!(
            "{}{}?token={}&role={}",
            self.client.frontend_url,
            self.client.success_path,
            token,
            role.as_str()
        )
    }

    /// The client application URL the browser lands on after a failed flow.
    #[must_use]
    pub fn failure_url(&self) -> String {
        format!("{}{}", self.client.frontend_url, self.client.failure_path)
    }
}

/// Local handle to the cookie key, extractable from `Arc<AppState>`.
///
/// `Key` and `Arc` are both foreign types, so the orphan rule forbids
/// implementing `FromRef<Arc<AppState>>` on `Key` directly; the jar
/// extractor accepts any `FromRef` type convertible into `Key`.
#[derive(Clone)]
pub struct AppKey(Key);

impl FromRef<Arc<AppState>> for AppKey {
    fn from_ref(state: &Arc<AppState>) -> Self {
        Self(state.cookie_key.clone())
    }
}

impl From<AppKey> for Key {
    fn from(key: AppKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, OauthConfig};

    fn test_state() -> AppState {
        let config = ServerConfig {
            database_url: "postgres://localhost/amber_test".to_string(),
            listen_addr: "127.0.0.1:8000".to_string(),
            client: ClientConfig::default(),
            auth: AuthConfig {
                token_secret: "token-secret".to_string(),
                session_secret: "0123456789abcdef0123456789abcdef".to_string(),
                token_ttl_hours: 24,
                state_ttl_minutes: 5,
                secure_cookies: true,
            },
            oauth: OauthConfig {
                client_id: "client".to_string(),
                client_secret: "secret".to_string(),
                redirect_uri: "http://localhost:8000/auth/google/callback".to_string(),
                scopes: "profile,email".to_string(),
                exchange_timeout_seconds: 10,
            },
        };
        let key = config.auth.session_key().expect("key");
        let db = Arc::new(Database::new(config.database_url.clone()));
        AppState::new(&config, key, db, HashMap::new())
    }

    #[test]
    fn success_url_carries_token_and_role() {
        let state = test_state();
        let url = state.success_url("abc.def.ghi", Role::User);
        assert_eq!(
            url,
            "http://localhost:3000/auth/google-success?token=abc.def.ghi&role=user"
        );
    }

    #[test]
    fn failure_url_is_the_landing_page() {
        let state = test_state();
        assert_eq!(state.failure_url(), "http://localhost:3000/");
    }
}
