//! Login and callback routes for the delegated-authentication flow.
//!
//! The flow is a redirect round trip: the login leg stashes correlation
//! state in the bridge cookie and hands the browser to the provider; the
//! callback leg checks the echoed state against the stored state *before
//! anything else*, exchanges the code under a bounded timeout, resolves
//! the profile into a local identity, and sends the browser back to the
//! client application carrying a freshly issued token. Every failure path
//! lands on the configured failure target without leaking internal detail.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Redirect,
};
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;
use std::sync::Arc;
use tokio::time::timeout;

use amber_gateway_identity::IssueError;

use super::bridge::{self, LoginState};
use super::provider::OAuthError;
use super::{AppKey, AppState};
use crate::db::{IdentityRepository, StoreError};

/// Query parameters the provider sends to the callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code, present on success.
    code: Option<String>,
    /// Echo of the CSRF/state token.
    state: Option<String>,
    /// Provider-side error code, present on denial.
    error: Option<String>,
}

/// Initiates the delegated login flow by redirecting to the provider.
pub async fn login(
    State(app): State<Arc<AppState>>,
    Path(provider_name): Path<String>,
    jar: PrivateCookieJar<AppKey>,
) -> Result<(PrivateCookieJar<AppKey>, Redirect), StatusCode> {
    let provider = app
        .providers
        .get(&provider_name)
        .ok_or(StatusCode::NOT_FOUND)?;

    let (auth_url, challenge) = provider.authorization_url();

    let login_state = LoginState {
        provider: provider_name.clone(),
        csrf_token: challenge.csrf_token,
        pkce_verifier: challenge.pkce_verifier,
    };

    let jar = bridge::store_state(
        jar,
        &login_state,
        app.state_ttl_minutes,
        app.secure_cookies,
    );

    tracing::debug!(provider = %provider_name, "redirecting to provider");
    Ok((jar, Redirect::to(&auth_url)))
}

/// Completes the delegated login flow after the provider redirects back.
pub async fn callback(
    State(app): State<Arc<AppState>>,
    Path(provider_name): Path<String>,
    Query(query): Query<CallbackQuery>,
    jar: PrivateCookieJar<AppKey>,
) -> (PrivateCookieJar<AppKey>, Redirect) {
    // The bridge state is single-use: cleared whether or not the flow
    // completes.
    let (jar, stored) = bridge::take_state(jar);

    match complete_login(&app, &provider_name, &query, stored).await {
        Ok(redirect_url) => {
            tracing::info!(provider = %provider_name, "login completed");
            (jar, Redirect::to(&redirect_url))
        }
        Err(err) => {
            match &err {
                CallbackError::Store(_) | CallbackError::Issue(_) => {
                    tracing::error!(provider = %provider_name, error = %err, "login flow failed");
                }
                _ => {
                    tracing::warn!(provider = %provider_name, error = %err, "login flow rejected");
                }
            }
            (jar, Redirect::to(&app.failure_url()))
        }
    }
}

/// Error terminating a callback. Converted to a failure redirect at the
/// flow boundary; never surfaced to the client directly.
#[derive(Debug)]
enum CallbackError {
    UnknownProvider,
    OAuth(OAuthError),
    Store(StoreError),
    Issue(IssueError),
}

impl std::fmt::Display for CallbackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownProvider => write!(f, "unknown provider"),
            Self::OAuth(e) => write!(f, "{e}"),
            Self::Store(e) => write!(f, "{e}"),
            Self::Issue(e) => write!(f, "{e}"),
        }
    }
}

impl From<OAuthError> for CallbackError {
    fn from(e: OAuthError) -> Self {
        Self::OAuth(e)
    }
}

impl From<StoreError> for CallbackError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<IssueError> for CallbackError {
    fn from(e: IssueError) -> Self {
        Self::Issue(e)
    }
}

/// Validates the echoed state token against the stored login state.
///
/// Runs before any store access: a forged or replayed callback must be
/// rejected without touching the database.
fn validate_state(
    echoed: Option<&str>,
    stored: Option<LoginState>,
    provider_name: &str,
) -> Result<LoginState, OAuthError> {
    let state = stored.ok_or(OAuthError::StateMismatch)?;
    let echoed = echoed.ok_or(OAuthError::StateMismatch)?;

    if state.provider != provider_name || state.csrf_token != echoed {
        return Err(OAuthError::StateMismatch);
    }

    Ok(state)
}

async fn complete_login(
    app: &AppState,
    provider_name: &str,
    query: &CallbackQuery,
    stored: Option<LoginState>,
) -> Result<String, CallbackError> {
    let provider = app
        .providers
        .get(provider_name)
        .ok_or(CallbackError::UnknownProvider)?;

    if let Some(provider_error) = &query.error {
        return Err(OAuthError::ProviderRejected(provider_error.clone()).into());
    }

    let login_state = validate_state(query.state.as_deref(), stored, provider_name)?;

    let code = query
        .code
        .as_deref()
        .ok_or_else(|| OAuthError::ProviderRejected("no authorization code".to_string()))?;

    let access_token = timeout(
        app.exchange_timeout,
        provider.exchange_code(code, &login_state.pkce_verifier),
    )
    .await
    .map_err(|_| OAuthError::Timeout)??;

    let profile = provider.fetch_profile(&access_token).await?;

    let repo = IdentityRepository::new(app.db.clone());
    let identity = repo.find_or_create(provider.name(), &profile).await?;

    let token = app.token_issuer.issue(&identity)?;

    Ok(app.success_url(&token, identity.role()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_state() -> LoginState {
        LoginState {
            provider: "google".to_string(),
            csrf_token: "csrf_expected".to_string(),
            pkce_verifier: "verifier".to_string(),
        }
    }

    #[test]
    fn matching_state_is_accepted() {
        let state = validate_state(Some("csrf_expected"), Some(stored_state()), "google")
            .expect("should accept");
        assert_eq!(state.pkce_verifier, "verifier");
    }

    #[test]
    fn forged_state_is_rejected() {
        let err = validate_state(Some("csrf_forged"), Some(stored_state()), "google")
            .expect_err("should reject");
        assert!(matches!(err, OAuthError::StateMismatch));
    }

    #[test]
    fn absent_stored_state_is_rejected() {
        let err = validate_state(Some("csrf_expected"), None, "google").expect_err("should reject");
        assert!(matches!(err, OAuthError::StateMismatch));
    }

    #[test]
    fn absent_echoed_state_is_rejected() {
        let err =
            validate_state(None, Some(stored_state()), "google").expect_err("should reject");
        assert!(matches!(err, OAuthError::StateMismatch));
    }

    #[test]
    fn cross_provider_state_is_rejected() {
        // State minted for one provider must not complete another's flow
        let err = validate_state(Some("csrf_expected"), Some(stored_state()), "github")
            .expect_err("should reject");
        assert!(matches!(err, OAuthError::StateMismatch));
    }
}
