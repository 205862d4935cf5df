use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;

use super::cookies;
use super::error::AuthError;
use crate::token::{SessionClaims, SessionTokenIssuer};

/// Verifies the internal session cookie.
///
/// Make it reachable from your router state with [`FromRef`] to use
/// [`SessionUser`] in app handlers, or pass it as the state directly.
#[derive(Debug, Clone)]
pub struct SessionReader {
    issuer: SessionTokenIssuer,
    cookie_name: String,
}

impl SessionReader {
    #[must_use]
    pub fn new(issuer: SessionTokenIssuer, cookie_name: impl Into<String>) -> Self {
        Self {
            issuer,
            cookie_name: cookie_name.into(),
        }
    }

    /// Claims from the session cookie in `jar`.
    ///
    /// # Errors
    ///
    /// [`AuthError::Unauthenticated`] without a cookie,
    /// [`AuthError::SessionExpired`] when the assertion does not verify.
    pub fn read(&self, jar: &CookieJar) -> Result<SessionClaims, AuthError> {
        let token = cookies::value(jar, &self.cookie_name).ok_or(AuthError::Unauthenticated)?;
        self.issuer.verify(&token).map_err(|e| {
            tracing::debug!(error = %e, "Session cookie rejected");
            AuthError::SessionExpired
        })
    }
}

/// Authenticated caller extracted from the session cookie.
///
/// Returns `401 Unauthorized` if no valid session exists.
///
/// # Example
///
/// ```rust,ignore
/// async fn dashboard(user: SessionUser) -> impl IntoResponse {
///     format!("Hello, {}", user.claims.cmuitaccount_name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub claims: SessionClaims,
}

impl<S> FromRequestParts<S> for SessionUser
where
    SessionReader: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let reader = SessionReader::from_ref(state);
        reader.read(&jar).map(|claims| Self { claims })
    }
}

#[cfg(test)]
mod tests {
    use axum_extra::extract::cookie::Cookie;
    use time::OffsetDateTime;

    use super::*;
    use crate::oauth::IdentityProfile;

    fn reader() -> SessionReader {
        SessionReader::new(
            SessionTokenIssuer::new(Some("secret".into())),
            "internal-session",
        )
    }

    #[test]
    fn reads_valid_cookie() {
        let signed = SessionTokenIssuer::new(Some("secret".into()))
            .issue(&IdentityProfile::new("u@cmu.ac.th"), OffsetDateTime::now_utc())
            .unwrap();
        let jar = CookieJar::new().add(Cookie::new("internal-session", signed.token));

        let claims = reader().read(&jar).unwrap();
        assert_eq!(claims.cmuitaccount_name, "u@cmu.ac.th");
    }

    #[test]
    fn missing_cookie_is_unauthenticated() {
        let err = reader().read(&CookieJar::new()).unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated));
    }

    #[test]
    fn forged_cookie_is_expired() {
        let jar = CookieJar::new().add(Cookie::new("internal-session", "forged.token.value"));
        let err = reader().read(&jar).unwrap_err();
        assert!(matches!(err, AuthError::SessionExpired));
    }
}
