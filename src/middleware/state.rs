use std::sync::Arc;

use axum::extract::FromRef;

use super::config::AuthSettings;
use super::extractor::SessionReader;
use super::traits::{BackendDirectory, IdentityProvider};
use crate::token::SessionTokenIssuer;

/// Shared state for auth route handlers.
pub(super) struct AuthState<P, B> {
    pub(super) provider: Arc<P>,
    pub(super) backend: Arc<B>,
    pub(super) issuer: SessionTokenIssuer,
    pub(super) settings: AuthSettings,
}

// Manual Clone: avoid derive adding `P: Clone, B: Clone` bounds.
impl<P, B> Clone for AuthState<P, B> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            backend: self.backend.clone(),
            issuer: self.issuer.clone(),
            settings: self.settings.clone(),
        }
    }
}

// SessionUser requires a SessionReader to be extractable from state
impl<P: IdentityProvider, B: BackendDirectory> FromRef<AuthState<P, B>> for SessionReader {
    fn from_ref(state: &AuthState<P, B>) -> Self {
        SessionReader::new(state.issuer.clone(), state.settings.session_cookie_name.clone())
    }
}
