use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::Error;
use crate::oauth::IdentityProfile;
use crate::types::{BackendSessionToken, Role};

/// Backend identity service settings.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct BackendConfig {
    pub(crate) base_url: Option<String>,
    pub(crate) federation_path: String,
    pub(crate) role_path: String,
    pub(crate) role_deadline: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            federation_path: "/user/login".into(),
            role_path: "/user/me".into(),
            role_deadline: Duration::from_secs(2),
        }
    }
}

impl BackendConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Path receiving the `POST` of the identity profile (default: `/user/login`).
    #[must_use]
    pub fn with_federation_path(mut self, path: impl Into<String>) -> Self {
        self.federation_path = path.into();
        self
    }

    /// Path answering "who am I" for a backend token (default: `/user/me`).
    #[must_use]
    pub fn with_role_path(mut self, path: impl Into<String>) -> Self {
        self.role_path = path.into();
        self
    }

    /// Hard deadline for the role lookup on gated requests (default: 2s).
    #[must_use]
    pub fn with_role_deadline(mut self, deadline: Duration) -> Self {
        self.role_deadline = deadline;
        self
    }

    #[must_use]
    pub fn role_deadline(&self) -> Duration {
        self.role_deadline
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let base = self
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::missing_config("BACKEND_URL"))?;
        format!("{}{}", base.trim_end_matches('/'), path)
            .parse()
            .map_err(|e| Error::Configuration(format!("BACKEND_URL: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct FederationResponse {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhoAmI {
    role: String,
}

/// HTTP client for the backend identity service.
#[derive(Clone)]
pub struct BackendClient {
    config: BackendConfig,
    http: reqwest::Client,
}

impl BackendClient {
    #[must_use]
    pub fn new(config: BackendConfig) -> Self {
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
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Present a verified identity to the backend and receive its session token.
    ///
    /// A 2xx answer without a token is a failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] without `BACKEND_URL`, otherwise
    /// [`Error::BackendFederation`]; it carries the backend's status and body
    /// when the backend answered with a non-success status.
    pub async fn federate(&self, profile: &IdentityProfile) -> Result<BackendSessionToken, Error> {
        let url = self.config.endpoint(&self.config.federation_path)?;

        let response = self.http.post(url).json(profile).send().await.map_err(|e| {
            tracing::error!(error = %e, "Backend federation request failed");
            Error::BackendFederation {
                status: None,
                message: "Failed to reach backend".into(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "Backend rejected federation");
            return Err(Error::BackendFederation {
                status: Some(status.as_u16()),
                message: format!("Failed to save user to backend: {body}"),
            });
        }

        let token = match response.json::<FederationResponse>().await {
            Ok(body) => body.token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::error!(error = %e, "Malformed federation response");
                None
            }
        };

        token.map(BackendSessionToken::from).ok_or_else(|| Error::BackendFederation {
            status: None,
            message: "No token received from backend".into(),
        })
    }

    /// Ask the backend for the caller's role. Not time-bounded by itself;
    /// see `EdgeRoleResolver` for the deadline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] without `BACKEND_URL`, or
    /// [`Error::RoleLookup`] on transport failure, non-success status, or a
    /// body without `role`.
    pub async fn current_role(&self, token: &BackendSessionToken) -> Result<Role, Error> {
        let url = self.config.endpoint(&self.config.role_path)?;

        let response = self
            .http
            .get(url)
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(|e| Error::RoleLookup(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::RoleLookup(format!("status {}", status.as_u16())));
        }

        response
            .json::<WhoAmI>()
            .await
            .map(|me| Role(me.role))
            .map_err(|e| Error::RoleLookup(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};

    use super::*;
    use crate::test_support::spawn_upstream;

    fn client(base: &str) -> BackendClient {
        BackendClient::new(BackendConfig::new().with_base_url(format!("{base}/")))
    }

    #[tokio::test]
    async fn federate_returns_token() {
        let app = Router::new().route(
            "/user/login",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["cmuitaccount_name"], "u@cmu.ac.th");
                Json(serde_json::json!({ "token": "be-1" }))
            }),
        );
        let base = spawn_upstream(app).await;

        let token = client(&base)
            .federate(&IdentityProfile::new("u@cmu.ac.th"))
            .await
            .unwrap();
        assert_eq!(token.as_str(), "be-1");
    }

    #[tokio::test]
    async fn federate_forwards_backend_status_and_body() {
        let app = Router::new().route(
            "/user/login",
            post(|| async {
                (StatusCode::CONFLICT, Json(serde_json::json!({ "error": "duplicate" })))
            }),
        );
        let base = spawn_upstream(app).await;

        let err = client(&base)
            .federate(&IdentityProfile::new("u@cmu.ac.th"))
            .await
            .unwrap_err();
        match err {
            Error::BackendFederation { status, message } => {
                assert_eq!(status, Some(409));
                assert_eq!(message, r#"Failed to save user to backend: {"error":"duplicate"}"#);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn federate_without_token_fails() {
        let app = Router::new().route(
            "/user/login",
            post(|| async { Json(serde_json::json!({ "ok": true })) }),
        );
        let base = spawn_upstream(app).await;

        let err = client(&base)
            .federate(&IdentityProfile::new("u@cmu.ac.th"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BackendFederation { status: None, .. }));
        assert_eq!(err.to_string(), "No token received from backend");
    }

    #[tokio::test]
    async fn federate_unreachable_has_no_status() {
        // Port 9 (discard) is not listening locally.
        let err = client("http://127.0.0.1:9")
            .federate(&IdentityProfile::new("u@cmu.ac.th"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BackendFederation { status: None, .. }));
    }

    #[tokio::test]
    async fn federate_requires_base_url() {
        let err = BackendClient::new(BackendConfig::new())
            .federate(&IdentityProfile::new("u@cmu.ac.th"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn current_role_reads_role_field() {
        let app = Router::new().route(
            "/user/me",
            get(|headers: HeaderMap| async move {
                assert_eq!(headers["authorization"], "Bearer be-1");
                Json(serde_json::json!({ "role": "admin", "email": "u@cmu.ac.th" }))
            }),
        );
        let base = spawn_upstream(app).await;

        let role = client(&base)
            .current_role(&BackendSessionToken::from("be-1".to_string()))
            .await
            .unwrap();
        assert_eq!(role, Role::from("admin"));
    }

    #[tokio::test]
    async fn current_role_non_success_is_error() {
        let app = Router::new().route(
            "/user/me",
            get(|| async { StatusCode::UNAUTHORIZED }),
        );
        let base = spawn_upstream(app).await;

        let err = client(&base)
            .current_role(&BackendSessionToken::from("be-1".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RoleLookup(_)));
    }
}
