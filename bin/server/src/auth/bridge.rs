//! Login-state bridge across the provider redirect round trip.
//!
//! The only server-side-ish state in the login flow is the correlation
//! material generated at the authorization leg: the CSRF token the provider
//! must echo back and the PKCE verifier for the code exchange. Instead of
//! holding it in process memory — which a cold-start or multi-instance
//! deployment would lose between the two legs — it rides with the client in
//! a short-lived signed+encrypted cookie. Nothing consults it after the
//! callback response is sent, and it is never required to validate an
//! issued token.

use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration as TimeDuration;

/// Login-state cookie name.
const LOGIN_STATE_COOKIE: &str = "login_state";

/// Correlation state carried across the redirect to the provider and back.
///
/// Holds no durable identity data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginState {
    /// Which provider adapter initiated the flow.
    pub provider: String,
    /// CSRF/state token the provider must echo back.
    pub csrf_token: String,
    /// PKCE code verifier for the token exchange.
    pub pkce_verifier: String,
}

/// Stores the login state in the bridge cookie.
pub fn store_state<K>(
    jar: PrivateCookieJar<K>,
    state: &LoginState,
    ttl_minutes: i64,
    secure: bool,
) -> PrivateCookieJar<K> {
    let state_json = serde_json::to_string(state).expect("serialize login state");

    let cookie = Cookie::build((LOGIN_STATE_COOKIE, state_json))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::minutes(ttl_minutes));

    jar.add(cookie)
}

/// Takes the login state out of the bridge cookie.
///
/// The cookie is removed unconditionally: whether the callback succeeds or
/// fails, the state is single-use.
pub fn take_state<K>(jar: PrivateCookieJar<K>) -> (PrivateCookieJar<K>, Option<LoginState>) {
    let state = jar
        .get(LOGIN_STATE_COOKIE)
        .and_then(|cookie| serde_json::from_str(cookie.value()).ok());

    let jar = jar.remove(Cookie::build(LOGIN_STATE_COOKIE).path("/"));
    (jar, state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_extra::extract::cookie::Key;

    fn test_jar() -> PrivateCookieJar {
        let key = Key::derive_from(b"an example very very secret key that is long enough");
        PrivateCookieJar::new(key)
    }

    fn test_state() -> LoginState {
        LoginState {
            provider: "google".to_string(),
            csrf_token: "csrf_abc".to_string(),
            pkce_verifier: "verifier_xyz".to_string(),
        }
    }

    #[test]
    fn store_then_take_roundtrip() {
        let jar = store_state(test_jar(), &test_state(), 5, true);
        let (_, state) = take_state(jar);
        assert_eq!(state, Some(test_state()));
    }

    #[test]
    fn take_removes_the_cookie() {
        let jar = store_state(test_jar(), &test_state(), 5, true);
        let (jar, _) = take_state(jar);
        let (_, second) = take_state(jar);
        assert_eq!(second, None);
    }

    #[test]
    fn take_from_empty_jar_is_none() {
        let (_, state) = take_state(test_jar());
        assert_eq!(state, None);
    }

    #[test]
    fn unparseable_state_yields_none() {
        let jar = test_jar().add(Cookie::new("login_state", "not-login-state-json"));
        let (_, state) = take_state(jar);
        assert_eq!(state, None);
    }
}
