//! Identity domain types and stateless token handling for amber-gateway.
//!
//! This crate provides:
//! - The `Identity` entity (one record per external provider account)
//! - Role handling (`Role`, flat `user`/`admin` authorization signal)
//! - Provider profile claims (`ProviderProfile`)
//! - Stateless bearer tokens (`TokenIssuer`, `TokenVerifier`, `Claims`)
//!
//! # Trust model
//!
//! Three mechanisms with distinct lifetimes compose the login flow, and this
//! crate deliberately keeps them apart:
//! - The OAuth2 code exchange with the external provider produces a
//!   [`ProviderProfile`].
//! - The profile is resolved into a durable [`Identity`] keyed by the
//!   provider's subject identifier.
//! - A signed, time-bound token is minted from the identity. Token validity
//!   depends only on its signature and expiry; no session state is consulted
//!   at verification time.
//!
//! # Example
//!
//! ```
//! use amber_gateway_identity::{Identity, ProviderProfile, TokenIssuer, TokenVerifier};
//! use chrono::Duration;
//!
//! let profile = ProviderProfile::new("109837624".to_string())
//!     .with_email(Some("alice@example.com".to_string()))
//!     .with_display_name(Some("Alice".to_string()));
//!
//! let identity = Identity::from_profile("google", &profile);
//!
//! let issuer = TokenIssuer::new("server-held-secret", Duration::hours(24));
//! let token = issuer.issue(&identity).expect("issue token");
//!
//! let verifier = TokenVerifier::new("server-held-secret");
//! let claims = verifier.verify(&token).expect("verify token");
//! assert_eq!(claims.user_id, identity.id());
//! assert_eq!(claims.role, identity.role());
//! ```

pub mod identity;
pub mod profile;
pub mod role;
pub mod token;

// Re-export main types at crate root
pub use identity::Identity;
pub use profile::ProviderProfile;
pub use role::{ParseRoleError, Role};
pub use token::{Claims, IssueError, TokenIssuer, TokenVerifier, VerifyError};
