//! Bearer-token extractor for protected routes.
//!
//! Protected handlers take [`RequireAuth`] as an argument; the extractor
//! validates the `Authorization: Bearer` credential on every request and
//! injects the decoded claims. No session or store lookup happens here —
//! token validity is signature and expiry only.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use amber_gateway_identity::{Claims, VerifyError};

use super::AppState;

/// Extractor requiring a valid bearer token.
///
/// Rejects with 401 when no credential is presented and 403 when the
/// presented credential is malformed, mis-signed, or expired.
pub struct RequireAuth(pub Claims);

impl<S> FromRequestParts<S> for RequireAuth
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);

        let token = bearer_token(parts)?;
        let claims = app_state.token_verifier.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer credential");
            AuthRejection::from(e)
        })?;

        Ok(RequireAuth(claims))
    }
}

/// Pulls the bearer token out of the Authorization header.
///
/// Absence of the header is `Missing`; a present header with any other
/// scheme or an undecodable value is `Invalid`.
fn bearer_token(parts: &Parts) -> Result<&str, AuthRejection> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthRejection::Missing)?;

    let value = header.to_str().map_err(|_| AuthRejection::Invalid)?;
    value.strip_prefix("Bearer ").ok_or(AuthRejection::Invalid)
}

/// Rejection type for the bearer-token extractor.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthRejection {
    /// No credential presented at all.
    Missing,
    /// Credential presented but malformed, mis-signed, or expired.
    Invalid,
}

impl From<VerifyError> for AuthRejection {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Missing => Self::Missing,
            VerifyError::Invalid { .. } => Self::Invalid,
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Missing => (StatusCode::UNAUTHORIZED, "Authentication required").into_response(),
            Self::Invalid => (StatusCode::FORBIDDEN, "Invalid credential").into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_header(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/user");
        if let Some(v) = value {
            builder = builder.header(AUTHORIZATION, v);
        }
        let (parts, ()) = builder.body(()).expect("request").into_parts();
        parts
    }

    #[test]
    fn missing_header_is_missing() {
        let parts = parts_with_header(None);
        assert_eq!(bearer_token(&parts).unwrap_err(), AuthRejection::Missing);
    }

    #[test]
    fn non_bearer_scheme_is_invalid() {
        let parts = parts_with_header(Some("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&parts).unwrap_err(), AuthRejection::Invalid);
    }

    #[test]
    fn bearer_token_is_extracted() {
        let parts = parts_with_header(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&parts).expect("token"), "abc.def.ghi");
    }

    #[test]
    fn missing_maps_to_401_and_invalid_to_403() {
        assert_eq!(
            AuthRejection::Missing.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::Invalid.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn expired_credential_classifies_as_invalid() {
        let err = VerifyError::Invalid {
            reason: "ExpiredSignature".to_string(),
        };
        assert_eq!(AuthRejection::from(err), AuthRejection::Invalid);
    }
}
