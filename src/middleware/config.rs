use super::extractor::SessionReader;
use super::gate::RoutePolicy;
use crate::federation::{BackendClient, BackendConfig};
use crate::oauth::{AuthClient, OAuthConfig};
use crate::token::SessionTokenIssuer;

/// Shared auth settings used by both config and runtime state.
#[derive(Debug, Clone)]
pub(crate) struct AuthSettings {
    pub(crate) session_cookie_name: String,
    pub(crate) backend_cookie_name: String,
    pub(crate) secure_cookies: bool,
    pub(crate) auth_path: String,
}

impl AuthSettings {
    fn defaults() -> Self {
        Self {
            session_cookie_name: "internal-session".into(),
            backend_cookie_name: "backend-session".into(),
            secure_cookies: true,
            auth_path: "/api/auth".into(),
        }
    }
}

/// Broker configuration: identity provider, backend, signing secret, cookies
/// and the route policy.
///
/// Nothing is validated here. Each operation checks the values it needs and
/// fails with a configuration error when one is missing.
///
/// Use [`from_env()`](BrokerConfig::from_env) for convention-based setup,
/// or [`new()`](BrokerConfig::new) with `with_*` methods for full control.
#[derive(Clone)]
pub struct BrokerConfig {
    pub(super) oauth: OAuthConfig,
    pub(super) backend: BackendConfig,
    pub(super) signing_secret: Option<String>,
    pub(super) settings: AuthSettings,
    pub(super) policy: RoutePolicy,
}

impl BrokerConfig {
    #[must_use]
    pub fn new(oauth: OAuthConfig, backend: BackendConfig) -> Self {
        Self {
            oauth,
            backend,
            signing_secret: None,
            settings: AuthSettings::defaults(),
            policy: RoutePolicy::default(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Env vars
    /// - `CMU_ENTRAID_URL`: authorize endpoint
    /// - `CMU_ENTRAID_GET_TOKEN_URL`: token endpoint
    /// - `CMU_ENTRAID_GET_BASIC_INFO`: profile endpoint
    /// - `CMU_ENTRAID_CLIENT_ID`, `CMU_ENTRAID_CLIENT_SECRET`: client credentials
    /// - `CMU_ENTRAID_REDIRECT_URL`: callback URI registered with EntraID
    /// - `SCOPE`: requested scope
    /// - `JWT_SECRET`: session assertion signing secret
    /// - `BACKEND_URL`: backend identity service base URL
    /// - `APP_ENV`: `"production"` enables `Secure` cookies
    ///
    /// Unset or empty variables are left unset and reported when first needed.
    #[must_use]
    pub fn from_env() -> Self {
        let mut oauth = OAuthConfig::new();
        oauth.auth_url = env("CMU_ENTRAID_URL");
        oauth.token_url = env("CMU_ENTRAID_GET_TOKEN_URL");
        oauth.profile_url = env("CMU_ENTRAID_GET_BASIC_INFO");
        oauth.client_id = env("CMU_ENTRAID_CLIENT_ID");
        oauth.client_secret = env("CMU_ENTRAID_CLIENT_SECRET");
        oauth.redirect_uri = env("CMU_ENTRAID_REDIRECT_URL");
        oauth.scope = env("SCOPE");

        let mut backend = BackendConfig::new();
        backend.base_url = env("BACKEND_URL");

        let production = env("APP_ENV").is_some_and(|v| v.eq_ignore_ascii_case("production"));

        let mut config = Self::new(oauth, backend).with_secure_cookies(production);
        config.signing_secret = env("JWT_SECRET");
        config
    }

    #[must_use]
    pub fn with_signing_secret(mut self, secret: impl Into<String>) -> Self {
        self.signing_secret = Some(secret.into());
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.session_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_backend_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.backend_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    /// Prefix of the login, sign-in, sign-out and who-am-I routes (default: `/api/auth`).
    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.settings.auth_path = path.into();
        self
    }

    #[must_use]
    pub fn with_route_policy(mut self, policy: RoutePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// EntraID client built from this config.
    #[must_use]
    pub fn auth_client(&self) -> AuthClient {
        AuthClient::new(self.oauth.clone())
    }

    /// Backend client built from this config.
    #[must_use]
    pub fn backend_client(&self) -> BackendClient {
        BackendClient::new(self.backend.clone())
    }

    /// Reader for the session cookie, for use as extractor state in app routes.
    #[must_use]
    pub fn session_reader(&self) -> SessionReader {
        SessionReader::new(self.issuer(), self.settings.session_cookie_name.clone())
    }

    #[must_use]
    pub fn route_policy(&self) -> &RoutePolicy {
        &self.policy
    }

    pub(super) fn issuer(&self) -> SessionTokenIssuer {
        SessionTokenIssuer::new(self.signing_secret.clone())
    }
}

fn env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
