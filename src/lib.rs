#![doc = include_str!("../README.md")]

pub mod csrf;
pub mod error;
pub mod federation;
pub mod middleware;
pub mod oauth;
pub mod token;
pub mod types;

#[cfg(test)]
mod test_support;

// Re-exports for convenient access
pub use csrf::generate_state;
pub use error::Error;
pub use federation::{BackendClient, BackendConfig};
pub use oauth::{AuthClient, AuthorizationRequest, IdentityProfile, OAuthConfig};
pub use token::{SESSION_TTL, SessionClaims, SessionTokenIssuer, SignedSession};
pub use types::{AccessToken, AuthorizationCode, BackendSessionToken, Role};
