use serde::{Deserialize, Serialize};
use url::Url;

use crate::csrf;
use crate::error::Error;
use crate::types::{AccessToken, AuthorizationCode};

/// CMU EntraID `OAuth2` configuration.
///
/// Every field is optional at construction. A value an operation needs but
/// does not find raises [`Error::Configuration`] at the moment of use, so a
/// partially configured deployment can still serve the routes that work.
///
/// ```rust,ignore
/// use cmu_entraid_gate::OAuthConfig;
///
/// let config = OAuthConfig::new()
///     .with_client_id("my-client-id")
///     .with_redirect_uri("https://my-app.com/cmuEntraIDCallback");
/// ```
#[derive(Clone, Default)]
#[non_exhaustive]
pub struct OAuthConfig {
    pub(crate) auth_url: Option<String>,
    pub(crate) token_url: Option<String>,
    pub(crate) profile_url: Option<String>,
    pub(crate) client_id: Option<String>,
    pub(crate) client_secret: Option<String>,
    pub(crate) redirect_uri: Option<String>,
    pub(crate) scope: Option<String>,
}

impl OAuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Authorization endpoint the login entry redirects to.
    #[must_use]
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    /// Basic-info endpoint returning the caller's profile.
    #[must_use]
    pub fn with_profile_url(mut self, url: impl Into<String>) -> Self {
        self.profile_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    #[must_use]
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    fn url(value: Option<&String>, name: &str) -> Result<Url, Error> {
        let raw = Self::text(value, name)?;
        raw.parse()
            .map_err(|e| Error::Configuration(format!("{name}: {e}")))
    }

    fn text<'a>(value: Option<&'a String>, name: &str) -> Result<&'a str, Error> {
        value
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::missing_config(name))
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("profile_url", &self.profile_url)
            .field("client_id", &self.client_id)
            .field("client_secret_set", &self.client_secret.is_some())
            .field("redirect_uri", &self.redirect_uri)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Authorization redirect plus the `state` to remember for the callback.
#[non_exhaustive]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

impl AuthorizationRequest {
    #[must_use]
    pub fn new(url: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: state.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Caller profile from the CMU EntraID basic-info endpoint.
///
/// Field names follow the upstream JSON so the same value can be forwarded
/// verbatim to the backend federation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct IdentityProfile {
    pub cmuitaccount_name: String,
    #[serde(default)]
    pub cmuitaccount: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub prename_id: Option<String>,
    #[serde(default, rename = "prename_TH")]
    pub prename_th: Option<String>,
    #[serde(default, rename = "prename_EN")]
    pub prename_en: Option<String>,
    #[serde(default, rename = "firstname_TH")]
    pub firstname_th: Option<String>,
    #[serde(default, rename = "firstname_EN")]
    pub firstname_en: Option<String>,
    #[serde(default, rename = "lastname_TH")]
    pub lastname_th: Option<String>,
    #[serde(default, rename = "lastname_EN")]
    pub lastname_en: Option<String>,
    #[serde(default)]
    pub organization_code: Option<String>,
    #[serde(default, rename = "organization_name_TH")]
    pub organization_name_th: Option<String>,
    #[serde(default, rename = "organization_name_EN")]
    pub organization_name_en: Option<String>,
    #[serde(default)]
    pub itaccounttype_id: Option<String>,
    #[serde(default, rename = "itaccounttype_TH")]
    pub itaccounttype_th: Option<String>,
    #[serde(default, rename = "itaccounttype_EN")]
    pub itaccounttype_en: Option<String>,
}

impl IdentityProfile {
    /// Profile with only the account name set.
    #[must_use]
    pub fn new(cmuitaccount_name: impl Into<String>) -> Self {
        Self {
            cmuitaccount_name: cmuitaccount_name.into(),
            cmuitaccount: None,
            student_id: None,
            prename_id: None,
            prename_th: None,
            prename_en: None,
            firstname_th: None,
            firstname_en: None,
            lastname_th: None,
            lastname_en: None,
            organization_code: None,
            organization_name_th: None,
            organization_name_en: None,
            itaccounttype_id: None,
            itaccounttype_th: None,
            itaccounttype_en: None,
        }
    }

    #[must_use]
    pub fn with_names_en(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.firstname_en = Some(first.into());
        self.lastname_en = Some(last.into());
        self
    }

    #[must_use]
    pub fn with_student_id(mut self, student_id: impl Into<String>) -> Self {
        self.student_id = Some(student_id.into());
        self
    }

    #[must_use]
    pub fn with_organization_code(mut self, code: impl Into<String>) -> Self {
        self.organization_code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_itaccounttype_id(mut self, id: impl Into<String>) -> Self {
        self.itaccounttype_id = Some(id.into());
        self
    }
}

/// `OAuth2` client for CMU EntraID.
pub struct AuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

impl AuthClient {
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Build the authorization redirect with a fresh `state`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the authorize URL, client id,
    /// redirect URI or scope is missing.
    pub fn authorization_url(&self) -> Result<AuthorizationRequest, Error> {
        let mut url = OAuthConfig::url(self.config.auth_url.as_ref(), "CMU_ENTRAID_URL")?;
        let client_id = OAuthConfig::text(self.config.client_id.as_ref(), "CMU_ENTRAID_CLIENT_ID")?;
        let redirect_uri =
            OAuthConfig::text(self.config.redirect_uri.as_ref(), "CMU_ENTRAID_REDIRECT_URL")?;
        let scope = OAuthConfig::text(self.config.scope.as_ref(), "SCOPE")?;
        let state = csrf::generate_state();

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", scope)
            .append_pair("state", &state);

        Ok(AuthorizationRequest {
            url: url.into(),
            state,
        })
    }

    /// Exchange an authorization code for an access token.
    ///
    /// The code is already validated by its type, so no request is issued
    /// for a malformed one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if endpoint or credentials are missing,
    /// or [`Error::UpstreamToken`] on transport failure, a non-success status,
    /// or a response without `access_token`.
    pub async fn exchange_code(&self, code: &AuthorizationCode) -> Result<AccessToken, Error> {
        let token_url =
            OAuthConfig::url(self.config.token_url.as_ref(), "CMU_ENTRAID_GET_TOKEN_URL")?;
        let client_id = OAuthConfig::text(self.config.client_id.as_ref(), "CMU_ENTRAID_CLIENT_ID")?;
        let client_secret =
            OAuthConfig::text(self.config.client_secret.as_ref(), "CMU_ENTRAID_CLIENT_SECRET")?;
        let redirect_uri =
            OAuthConfig::text(self.config.redirect_uri.as_ref(), "CMU_ENTRAID_REDIRECT_URL")?;
        let scope = OAuthConfig::text(self.config.scope.as_ref(), "SCOPE")?;

        let params = [
            ("code", code.as_str()),
            ("redirect_uri", redirect_uri),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("scope", scope),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http
            .post(token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Token endpoint unreachable");
                Error::UpstreamToken("token endpoint unreachable".into())
            })?;

        let response = ensure_success(response, "token exchange")
            .await
            .map_err(Error::UpstreamToken)?;

        let body = response.json::<TokenResponse>().await.map_err(|e| {
            tracing::error!(error = %e, "Malformed token response");
            Error::UpstreamToken("malformed token response".into())
        })?;

        body.access_token
            .filter(|t| !t.trim().is_empty())
            .map(AccessToken::from)
            .ok_or_else(|| {
                tracing::error!("Token response carried no access_token");
                Error::UpstreamToken("no access_token in response".into())
            })
    }

    /// Fetch the caller's profile with a bearer access token. Never retried.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UpstreamProfile`] for an empty token, transport failure,
    /// non-success status or an unparseable body; [`Error::Configuration`] if
    /// the profile URL is missing.
    pub async fn fetch_profile(&self, access_token: &AccessToken) -> Result<IdentityProfile, Error> {
        if access_token.is_empty() {
            return Err(Error::UpstreamProfile("empty access token".into()));
        }
        let profile_url =
            OAuthConfig::url(self.config.profile_url.as_ref(), "CMU_ENTRAID_GET_BASIC_INFO")?;

        let response = self
            .http
            .get(profile_url)
            .bearer_auth(access_token.as_str())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Profile endpoint unreachable");
                Error::UpstreamProfile("profile endpoint unreachable".into())
            })?;

        let response = ensure_success(response, "profile request")
            .await
            .map_err(Error::UpstreamProfile)?;

        response.json::<IdentityProfile>().await.map_err(|e| {
            tracing::error!(error = %e, "Malformed profile response");
            Error::UpstreamProfile("malformed profile response".into())
        })
    }
}

/// Checks the upstream status. The body is logged for diagnostics and
/// withheld from the returned message.
async fn ensure_success(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<reqwest::Response, String> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    tracing::error!(operation, status, body = %body, "Upstream rejected request");
    Err(format!("{operation} returned status {status}"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::extract::Form;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};

    use super::*;
    use crate::test_support::spawn_upstream;

    fn test_config(base: &str) -> OAuthConfig {
        OAuthConfig::new()
            .with_auth_url("https://login.example.com/authorize")
            .with_token_url(format!("{base}/token"))
            .with_profile_url(format!("{base}/basicinfo"))
            .with_client_id("test-client")
            .with_client_secret("test-secret")
            .with_redirect_uri("https://app.example.com/cmuEntraIDCallback")
            .with_scope("api://cmu/Mis.Account.Read.Me.Profile")
    }

    #[test]
    fn test_authorization_url_contains_params() {
        let client = AuthClient::new(test_config("http://unused"));
        let req = client.authorization_url().unwrap();

        assert!(req.url.starts_with("https://login.example.com/authorize?"));
        assert!(req.url.contains("response_type=code"));
        assert!(req.url.contains("client_id=test-client"));
        assert!(req.url.contains("redirect_uri=https%3A%2F%2Fapp.example.com%2FcmuEntraIDCallback"));
        assert!(req.url.contains("scope="));
        assert!(req.url.contains(&format!("state={}", req.state)));
    }

    #[test]
    fn test_authorization_url_requires_config() {
        let client = AuthClient::new(OAuthConfig::new().with_client_id("x"));
        let err = client.authorization_url().err().unwrap();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_invalid_auth_url_is_config_error() {
        let config = test_config("http://unused").with_auth_url("not a url");
        let err = AuthClient::new(config).authorization_url().err().unwrap();
        assert!(matches!(err, Error::Configuration(msg) if msg.starts_with("CMU_ENTRAID_URL")));
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let app = Router::new().route(
            "/token",
            post(|Form(form): Form<Vec<(String, String)>>| async move {
                let has = |k: &str, v: &str| form.iter().any(|(a, b)| a == k && b == v);
                assert!(has("code", "abc123"));
                assert!(has("grant_type", "authorization_code"));
                assert!(has("client_secret", "test-secret"));
                Json(serde_json::json!({ "access_token": "tok-1", "token_type": "Bearer" }))
            }),
        );
        let base = spawn_upstream(app).await;
        let client = AuthClient::new(test_config(&base));

        let token = client.exchange_code(&"abc123".parse().unwrap()).await.unwrap();
        assert_eq!(token.as_str(), "tok-1");
    }

    #[tokio::test]
    async fn test_exchange_code_rejected_hides_body() {
        let app = Router::new().route(
            "/token",
            post(|| async { (StatusCode::BAD_REQUEST, "invalid_grant: secret-detail") }),
        );
        let base = spawn_upstream(app).await;
        let client = AuthClient::new(test_config(&base));

        let err = client.exchange_code(&"abc123".parse().unwrap()).await.unwrap_err();
        assert!(matches!(err, Error::UpstreamToken(_)));
        assert!(!err.to_string().contains("secret-detail"));
    }

    #[tokio::test]
    async fn test_exchange_code_missing_access_token() {
        let app = Router::new().route(
            "/token",
            post(|| async { Json(serde_json::json!({ "token_type": "Bearer" })) }),
        );
        let base = spawn_upstream(app).await;
        let client = AuthClient::new(test_config(&base));

        let err = client.exchange_code(&"abc123".parse().unwrap()).await.unwrap_err();
        assert!(matches!(err, Error::UpstreamToken(_)));
    }

    #[tokio::test]
    async fn test_exchange_code_missing_secret_makes_no_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let app = Router::new().route(
            "/token",
            post(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Json(serde_json::json!({ "access_token": "tok-1" })) }
            }),
        );
        let base = spawn_upstream(app).await;
        let mut config = test_config(&base);
        config.client_secret = None;

        let err = AuthClient::new(config)
            .exchange_code(&"abc123".parse().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_profile_sends_bearer() {
        let app = Router::new().route(
            "/basicinfo",
            get(|headers: HeaderMap| async move {
                assert_eq!(headers["authorization"], "Bearer tok-1");
                Json(serde_json::json!({
                    "cmuitaccount_name": "u@cmu.ac.th",
                    "firstname_EN": "SOMCHAI",
                    "student_id": "650610000",
                    "itaccounttype_id": "StdAcc"
                }))
            }),
        );
        let base = spawn_upstream(app).await;
        let client = AuthClient::new(test_config(&base));

        let profile = client
            .fetch_profile(&AccessToken::from("tok-1".to_string()))
            .await
            .unwrap();
        assert_eq!(profile.cmuitaccount_name, "u@cmu.ac.th");
        assert_eq!(profile.firstname_en.as_deref(), Some("SOMCHAI"));
        assert_eq!(profile.student_id.as_deref(), Some("650610000"));
    }

    #[tokio::test]
    async fn test_fetch_profile_empty_token() {
        let client = AuthClient::new(test_config("http://127.0.0.1:9"));
        let err = client
            .fetch_profile(&AccessToken::from(String::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UpstreamProfile(_)));
    }

    #[tokio::test]
    async fn test_fetch_profile_unauthorized() {
        let app = Router::new().route(
            "/basicinfo",
            get(|| async { (StatusCode::UNAUTHORIZED, "expired") }),
        );
        let base = spawn_upstream(app).await;
        let client = AuthClient::new(test_config(&base));

        let err = client
            .fetch_profile(&AccessToken::from("tok-1".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UpstreamProfile(_)));
    }

    #[test]
    fn test_profile_serializes_upstream_keys() {
        let profile = IdentityProfile::new("u@cmu.ac.th").with_names_en("A", "B");
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["cmuitaccount_name"], "u@cmu.ac.th");
        assert_eq!(json["firstname_EN"], "A");
        assert_eq!(json["lastname_EN"], "B");
    }
}
