//! The Identity domain type.
//!
//! An Identity is the local record established for an external provider
//! account. Identities are created after the first successful login and
//! are keyed by the provider's subject identifier; the internal `id` is
//! what issued tokens carry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use amber_gateway_core::UserId;

use crate::profile::ProviderProfile;
use crate::role::Role;

/// A local identity record, one per distinct provider account.
///
/// Exactly one Identity exists per `(provider, subject)` pair; that
/// uniqueness is enforced by the store, not by this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Internal gateway identity ID.
    id: UserId,
    /// Name of the provider adapter that authenticated the subject.
    provider: String,
    /// The provider's stable user identifier. Never reused across distinct
    /// provider accounts.
    subject: String,
    /// Email address. Best-effort: providers may omit it, in which case the
    /// empty string is stored.
    email: String,
    /// Display name, if the provider shared one.
    display_name: Option<String>,
    /// Avatar URL, if the provider shared one.
    avatar_url: Option<String>,
    /// The flat authorization role.
    role: Role,
    /// When the identity record was created.
    created_at: DateTime<Utc>,
    /// When the identity record was last updated.
    updated_at: DateTime<Utc>,
}

impl Identity {
    /// Creates a new identity from a provider profile.
    ///
    /// The internal ID is generated and the role defaults to `user`. Use
    /// this when resolving a first login.
    #[must_use]
    pub fn from_profile(provider: &str, profile: &ProviderProfile) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            provider: provider.to_string(),
            subject: profile.subject.clone(),
            email: profile.email.clone().unwrap_or_default(),
            display_name: profile.display_name.clone(),
            avatar_url: profile.avatar_url.clone(),
            role: Role::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates an identity with all fields specified.
    ///
    /// Use this when reconstituting an identity from storage.
    #[must_use]
    #[expect(clippy::too_many_arguments)]
    pub fn with_all_fields(
        id: UserId,
        provider: String,
        subject: String,
        email: String,
        display_name: Option<String>,
        avatar_url: Option<String>,
        role: Role,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            provider,
            subject,
            email,
            display_name,
            avatar_url,
            role,
            created_at,
            updated_at,
        }
    }

    /// Returns the internal gateway identity ID.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Returns the provider adapter name.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Returns the provider's subject identifier.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the email address (possibly empty).
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the display name, if available.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Returns the avatar URL, if available.
    #[must_use]
    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar_url.as_deref()
    }

    /// Returns the identity's role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns when the identity was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the identity was last updated.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_profile() -> ProviderProfile {
        ProviderProfile::new("109837624".to_string())
            .with_email(Some("alice@example.com".to_string()))
            .with_display_name(Some("Alice".to_string()))
            .with_avatar_url(Some("https://cdn.example.com/a.png".to_string()))
    }

    #[test]
    fn from_profile_maps_all_fields() {
        let identity = Identity::from_profile("google", &test_profile());

        assert!(identity.id().to_string().starts_with("usr_"));
        assert_eq!(identity.provider(), "google");
        assert_eq!(identity.subject(), "109837624");
        assert_eq!(identity.email(), "alice@example.com");
        assert_eq!(identity.display_name(), Some("Alice"));
        assert_eq!(identity.avatar_url(), Some("https://cdn.example.com/a.png"));
    }

    #[test]
    fn from_profile_defaults_role_to_user() {
        let identity = Identity::from_profile("google", &test_profile());
        assert_eq!(identity.role(), Role::User);
    }

    #[test]
    fn from_profile_tolerates_missing_email() {
        let profile = ProviderProfile::new("109837624".to_string());
        let identity = Identity::from_profile("google", &profile);
        assert_eq!(identity.email(), "");
        assert!(identity.display_name().is_none());
    }

    #[test]
    fn from_profile_sets_timestamps() {
        let before = Utc::now();
        let identity = Identity::from_profile("google", &test_profile());
        let after = Utc::now();

        assert!(identity.created_at() >= before);
        assert!(identity.created_at() <= after);
        assert_eq!(identity.created_at(), identity.updated_at());
    }

    #[test]
    fn with_all_fields_preserves_values() {
        let id = UserId::new();
        let created = Utc::now() - chrono::Duration::days(30);
        let updated = Utc::now() - chrono::Duration::days(1);

        let identity = Identity::with_all_fields(
            id,
            "google".to_string(),
            "109837624".to_string(),
            "alice@example.com".to_string(),
            Some("Alice".to_string()),
            None,
            Role::Admin,
            created,
            updated,
        );

        assert_eq!(identity.id(), id);
        assert_eq!(identity.provider(), "google");
        assert_eq!(identity.subject(), "109837624");
        assert_eq!(identity.email(), "alice@example.com");
        assert_eq!(identity.display_name(), Some("Alice"));
        assert!(identity.avatar_url().is_none());
        assert_eq!(identity.role(), Role::Admin);
        assert_eq!(identity.created_at(), created);
        assert_eq!(identity.updated_at(), updated);
    }

    #[test]
    fn identity_serialization_roundtrip() {
        let identity = Identity::from_profile("google", &test_profile());
        let json = serde_json::to_string(&identity).expect("serialize");
        let parsed: Identity = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(identity, parsed);
    }
}
