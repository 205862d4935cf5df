use std::future::Future;

use crate::error::Error;
use crate::federation::BackendClient;
use crate::oauth::{AuthClient, AuthorizationRequest, IdentityProfile};
use crate::types::{AccessToken, AuthorizationCode, BackendSessionToken, Role};

/// The identity provider side of the login sequence.
///
/// Implemented by [`AuthClient`] for CMU EntraID. Tests and alternative
/// deployments can supply their own.
pub trait IdentityProvider: Send + Sync + 'static {
    /// Authorization redirect for the login entry route.
    fn authorization_url(&self) -> Result<AuthorizationRequest, Error>;

    /// Swap a one-time code for an access token. Must not be retried.
    fn exchange_code(
        &self,
        code: &AuthorizationCode,
    ) -> impl Future<Output = Result<AccessToken, Error>> + Send;

    /// Fetch the caller's profile with the access token.
    fn fetch_profile(
        &self,
        access_token: &AccessToken,
    ) -> impl Future<Output = Result<IdentityProfile, Error>> + Send;
}

/// The backend identity service: federation at login, role lookup at the edge.
///
/// Implemented by [`BackendClient`].
pub trait BackendDirectory: Send + Sync + 'static {
    /// Present the profile and receive a backend session token.
    fn federate(
        &self,
        profile: &IdentityProfile,
    ) -> impl Future<Output = Result<BackendSessionToken, Error>> + Send;

    /// Role of the caller owning `token`. Callers bound this with a deadline.
    fn current_role(
        &self,
        token: &BackendSessionToken,
    ) -> impl Future<Output = Result<Role, Error>> + Send;
}

impl IdentityProvider for AuthClient {
    fn authorization_url(&self) -> Result<AuthorizationRequest, Error> {
        AuthClient::authorization_url(self)
    }

    fn exchange_code(
        &self,
        code: &AuthorizationCode,
    ) -> impl Future<Output = Result<AccessToken, Error>> + Send {
        AuthClient::exchange_code(self, code)
    }

    fn fetch_profile(
        &self,
        access_token: &AccessToken,
    ) -> impl Future<Output = Result<IdentityProfile, Error>> + Send {
        AuthClient::fetch_profile(self, access_token)
    }
}

impl BackendDirectory for BackendClient {
    fn federate(
        &self,
        profile: &IdentityProfile,
    ) -> impl Future<Output = Result<BackendSessionToken, Error>> + Send {
        BackendClient::federate(self, profile)
    }

    fn current_role(
        &self,
        token: &BackendSessionToken,
    ) -> impl Future<Output = Result<Role, Error>> + Send {
        BackendClient::current_role(self, token)
    }
}
