use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::{Duration, OffsetDateTime};

use super::config::AuthSettings;
use crate::token::SESSION_TTL;
use crate::types::BackendSessionToken;

const STATE_COOKIE_NAME: &str = "__entraid_state";

/// Create the `state` cookie for the authorization request.
pub(super) fn state_cookie(state: &str, secure: bool, auth_path: &str) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE_NAME, state.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(auth_path.to_string())
        .max_age(Duration::minutes(5))
        .build()
}

/// Create removal cookie for the `state` cookie.
pub(super) fn clear_state_cookie(auth_path: &str) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE_NAME, ""))
        .path(auth_path.to_string())
        .max_age(Duration::ZERO)
        .build()
}

/// Get the stored `state` from cookies.
pub(super) fn get_state(jar: &CookieJar) -> Option<String> {
    jar.get(STATE_COOKIE_NAME).map(|c| c.value().to_string())
}

/// Build the session cookie pair. Both expire at `issued_at + 1h`.
///
/// The internal session cookie is HttpOnly. The backend cookie is left
/// readable by scripts because the browser app sends it as a bearer token.
pub(super) fn session_pair(
    settings: &AuthSettings,
    session_token: &str,
    backend_token: &BackendSessionToken,
    issued_at: OffsetDateTime,
) -> (Cookie<'static>, Cookie<'static>) {
    let expires = issued_at + SESSION_TTL;

    let session = Cookie::build((
        settings.session_cookie_name.clone(),
        session_token.to_string(),
    ))
    .http_only(true)
    .secure(settings.secure_cookies)
    .same_site(SameSite::Lax)
    .path("/")
    .max_age(SESSION_TTL)
    .expires(expires)
    .build();

    let backend = Cookie::build((
        settings.backend_cookie_name.clone(),
        backend_token.as_str().to_string(),
    ))
    .http_only(false)
    .secure(settings.secure_cookies)
    .same_site(SameSite::Lax)
    .path("/")
    .max_age(SESSION_TTL)
    .expires(expires)
    .build();

    (session, backend)
}

/// Removal cookies for the session pair, always emitted together.
pub(super) fn clear_session_pair(settings: &AuthSettings) -> (Cookie<'static>, Cookie<'static>) {
    let clear = |name: &str| {
        Cookie::build((name.to_string(), ""))
            .path("/")
            .max_age(Duration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .build()
    };
    (
        clear(&settings.session_cookie_name),
        clear(&settings.backend_cookie_name),
    )
}

/// Add both session cookies to the jar in one step.
pub(super) fn write_session(jar: CookieJar, pair: (Cookie<'static>, Cookie<'static>)) -> CookieJar {
    let (session, backend) = pair;
    jar.add(session).add(backend)
}

/// Non-empty cookie value by name.
pub(super) fn value(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

pub(super) fn backend_token(jar: &CookieJar, name: &str) -> Option<BackendSessionToken> {
    value(jar, name).map(BackendSessionToken::from)
}
