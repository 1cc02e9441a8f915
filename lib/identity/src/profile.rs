//! Profile claims returned by an external identity provider.

/// Profile data resolved from a provider after a successful code exchange.
///
/// Only the subject identifier is guaranteed; providers may omit any of the
/// other fields, and the gateway must tolerate that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    /// The provider's stable user identifier.
    pub subject: String,
    /// Email address, if the provider shared one.
    pub email: Option<String>,
    /// Display name, if the provider shared one.
    pub display_name: Option<String>,
    /// Avatar URL, if the provider shared one.
    pub avatar_url: Option<String>,
}

impl ProviderProfile {
    /// Creates a profile with only the subject identifier set.
    #[must_use]
    pub fn new(subject: String) -> Self {
        Self {
            subject,
            email: None,
            display_name: None,
            avatar_url: None,
        }
    }

    /// Sets the email claim.
    #[must_use]
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: Option<String>) -> Self {
        self.display_name = name;
        self
    }

    /// Sets the avatar URL.
    #[must_use]
    pub fn with_avatar_url(mut self, url: Option<String>) -> Self {
        self.avatar_url = url;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_profile_has_only_subject() {
        let profile = ProviderProfile::new("sub_123".to_string());
        assert_eq!(profile.subject, "sub_123");
        assert!(profile.email.is_none());
        assert!(profile.display_name.is_none());
        assert!(profile.avatar_url.is_none());
    }

    #[test]
    fn builder_sets_optional_fields() {
        let profile = ProviderProfile::new("sub_123".to_string())
            .with_email(Some("alice@example.com".to_string()))
            .with_display_name(Some("Alice".to_string()))
            .with_avatar_url(Some("https://cdn.example.com/a.png".to_string()));

        assert_eq!(profile.email.as_deref(), Some("alice@example.com"));
        assert_eq!(profile.display_name.as_deref(), Some("Alice"));
        assert_eq!(profile.avatar_url.as_deref(), Some("https://cdn.example.com/a.png"));
    }
}
