//! Token-protected API routes.
//!
//! These handlers trust the verified bearer token for authentication and
//! only touch the identity store to serve fresh profile data. The store can
//! be down without breaking token verification itself; only the routes that
//! need the store report 500 when it is unreachable.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::fmt;
use std::sync::Arc;

use amber_gateway_identity::Identity;

use crate::auth::{AppState, RequireAuth};
use crate::db::{IdentityRepository, StoreError};

/// Errors returned by the API routes.
#[derive(Debug)]
pub enum ApiError {
    /// The token was valid but no matching identity exists in the store.
    UnknownUser,
    /// The identity store failed or was unreachable.
    Store(StoreError),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownUser => write!(f, "no identity matches the presented token"),
            Self::Store(err) => write!(f, "identity store error: {err}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::UnknownUser => (StatusCode::NOT_FOUND, "User not found"),
            Self::Store(err) => {
                tracing::error!(error = %err, "identity store failure serving API request");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// Plain-text banner confirming the gateway is up.
pub async fn banner() -> &'static str {
    "Auth gateway running"
}

/// Returns the authenticated caller's stored identity.
///
/// The token alone proves who the caller is; the store lookup exists to
/// serve profile fields that may have changed since the token was issued.
pub async fn current_user(
    State(app): State<Arc<AppState>>,
    RequireAuth(claims): RequireAuth,
) -> Result<Json<Identity>, ApiError> {
    let repository = IdentityRepository::new(app.db.clone());
    let identity = repository
        .find_by_id(claims.user_id)
        .await?
        .ok_or(ApiError::UnknownUser)?;
    Ok(Json(identity))
}

/// Placeholder for a future credential-based login.
///
/// Delegated login through `/auth/{provider}` is the only supported flow;
/// this route exists so clients probing for password login get a stable
/// answer instead of a 404. It still confirms store connectivity so a
/// misconfigured deployment fails loudly here.
pub async fn password_login(State(app): State<Arc<AppState>>) -> Result<Response, ApiError> {
    app.db.ensure_connected().await?;
    Ok((
        StatusCode::NOT_IMPLEMENTED,
        Json(json!({ "message": "Password login is not supported; use /auth/google" })),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_user_maps_to_not_found() {
        let response = ApiError::UnknownUser.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_error_maps_to_internal_error() {
        let response = ApiError::Store(StoreError::Unavailable("connection refused".to_string()))
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn api_error_display() {
        assert_eq!(
            ApiError::UnknownUser.to_string(),
            "no identity matches the presented token"
        );
    }
}
