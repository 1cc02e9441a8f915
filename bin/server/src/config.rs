//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables.
//!
//! Environment-dependent values (callback URL, client application URL,
//! provider credentials, signing secrets, store connection string) are
//! configuration inputs, never baked-in protocol: the registered redirect
//! URI in particular must match what the provider has on file exactly, or
//! every callback fails at the provider side.

use axum_extra::extract::cookie::Key;
use serde::Deserialize;

/// Server configuration composed from section configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Address the HTTP listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Client application redirect targets.
    #[serde(default)]
    pub client: ClientConfig,

    /// Token and login-state configuration.
    pub auth: AuthConfig,

    /// OAuth provider configuration.
    pub oauth: OauthConfig,
}

/// Where the gateway sends the browser after the OAuth flow completes.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the client application.
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,

    /// Path on the client application that receives `token` and `role`
    /// query parameters after a successful login.
    #[serde(default = "default_success_path")]
    pub success_path: String,

    /// Path on the client application the browser lands on when the login
    /// flow fails.
    #[serde(default = "default_failure_path")]
    pub failure_path: String,
}

/// Token-signing and login-state configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign issued bearer tokens.
    pub token_secret: String,

    /// Secret used to sign and encrypt the login-state cookie. Must be at
    /// least 32 bytes.
    pub session_secret: String,

    /// Bearer token lifetime in hours.
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,

    /// Login-state cookie lifetime in minutes. Only needs to survive the
    /// redirect round trip to the provider and back.
    #[serde(default = "default_state_ttl_minutes")]
    pub state_ttl_minutes: i64,

    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true for production safety; set to false for local HTTP
    /// development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,
}

/// OAuth2 provider credentials and tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct OauthConfig {
    /// The OAuth2 client ID registered with the provider.
    pub client_id: String,

    /// The OAuth2 client secret.
    pub client_secret: String,

    /// The redirect URI for the OAuth2 callback. Must match the value
    /// registered with the provider exactly.
    pub redirect_uri: String,

    /// Scopes to request, as a comma-separated string.
    #[serde(default = "default_scopes")]
    pub scopes: String,

    /// Bound on the provider token-exchange call, in seconds.
    #[serde(default = "default_exchange_timeout_seconds")]
    pub exchange_timeout_seconds: u64,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_frontend_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_success_path() -> String {
    "/auth/google-success".to_string()
}

fn default_failure_path() -> String {
    "/".to_string()
}

fn default_token_ttl_hours() -> i64 {
    24
}

fn default_state_ttl_minutes() -> i64 {
    5
}

fn default_secure_cookies() -> bool {
    true
}

fn default_scopes() -> String {
    "profile,email".to_string()
}

fn default_exchange_timeout_seconds() -> u64 {
    10
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            frontend_url: default_frontend_url(),
            success_path: default_success_path(),
            failure_path: default_failure_path(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

impl AuthConfig {
    /// Returns the parsed token lifetime.
    #[must_use]
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.token_ttl_hours)
    }

    /// Derives the cookie-signing key from the session secret.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is shorter than 32 bytes.
    pub fn session_key(&self) -> Result<Key, config::ConfigError> {
        if self.session_secret.len() < 32 {
            return Err(config::ConfigError::Message(
                "auth.session_secret must be at least 32 bytes".to_string(),
            ));
        }
        Ok(Key::derive_from(self.session_secret.as_bytes()))
    }
}

impl OauthConfig {
    /// Returns the scopes to request, parsed from the comma-separated string.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        self.scopes.split(',').map(str::trim).collect()
    }

    /// Returns the bound applied to the provider token-exchange call.
    #[must_use]
    pub fn exchange_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.exchange_timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_auth_config(session_secret: &str) -> AuthConfig {
        AuthConfig {
            token_secret: "token-secret".to_string(),
            session_secret: session_secret.to_string(),
            token_ttl_hours: default_token_ttl_hours(),
            state_ttl_minutes: default_state_ttl_minutes(),
            secure_cookies: default_secure_cookies(),
        }
    }

    #[test]
    fn client_config_has_correct_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.frontend_url, "http://localhost:3000");
        assert_eq!(config.success_path, "/auth/google-success");
        assert_eq!(config.failure_path, "/");
    }

    #[test]
    fn auth_defaults() {
        let config = test_auth_config("0123456789abcdef0123456789abcdef");
        assert_eq!(config.token_ttl(), chrono::Duration::hours(24));
        assert_eq!(config.state_ttl_minutes, 5);
        assert!(config.secure_cookies);
    }

    #[test]
    fn session_key_rejects_short_secret() {
        let config = test_auth_config("too-short");
        assert!(config.session_key().is_err());
    }

    #[test]
    fn session_key_accepts_long_secret() {
        let config = test_auth_config("0123456789abcdef0123456789abcdef");
        assert!(config.session_key().is_ok());
    }

    #[test]
    fn oauth_scopes_parse_comma_separated() {
        let config = OauthConfig {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://localhost:8000/auth/google/callback".to_string(),
            scopes: "profile, email".to_string(),
            exchange_timeout_seconds: default_exchange_timeout_seconds(),
        };
        assert_eq!(config.scopes(), vec!["profile", "email"]);
        assert_eq!(config.exchange_timeout(), std::time::Duration::from_secs(10));
    }
}
