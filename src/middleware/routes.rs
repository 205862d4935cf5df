use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::CookieJar;
use time::OffsetDateTime;

use super::config::BrokerConfig;
use super::cookies;
use super::error::AuthError;
use super::extractor::SessionUser;
use super::state::AuthState;
use super::traits::{BackendDirectory, IdentityProvider};
use super::types::{ApiResponse, MeResponse, SignInRequest};
use crate::error::Error;
use crate::types::AuthorizationCode;

/// Create the CMU EntraID authentication router.
///
/// Routes, under the configured auth path:
/// - `GET  /login`   redirect to EntraID
/// - `POST /signin`  complete the login with `{ "authorizationCode": ... }`
/// - `POST /signout` clear both session cookies
/// - `GET  /me`      claims of the current session
pub fn auth_routes<P, B>(config: &BrokerConfig, provider: P, backend: B) -> Router
where
    P: IdentityProvider,
    B: BackendDirectory,
{
    let auth_path = config.settings.auth_path.trim_end_matches('/').to_string();

    let state = AuthState {
        provider: Arc::new(provider),
        backend: Arc::new(backend),
        issuer: config.issuer(),
        settings: config.settings.clone(),
    };

    Router::new()
        .route(&format!("{auth_path}/login"), get(login::<P, B>))
        .route(&format!("{auth_path}/signin"), post(signin::<P, B>))
        .route(&format!("{auth_path}/signout"), post(signout::<P, B>))
        .route(&format!("{auth_path}/me"), get(me))
        .with_state(state)
}

// ── Login ──────────────────────────────────────────────────────────

async fn login<P: IdentityProvider, B: BackendDirectory>(
    State(state): State<AuthState<P, B>>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AuthError> {
    let auth_req = state.provider.authorization_url()?;

    let state_cookie = cookies::state_cookie(
        &auth_req.state,
        state.settings.secure_cookies,
        &state.settings.auth_path,
    );

    Ok((jar.add(state_cookie), Redirect::to(&auth_req.url)))
}

// ── Sign-in ────────────────────────────────────────────────────────

async fn signin<P: IdentityProvider, B: BackendDirectory>(
    State(state): State<AuthState<P, B>>,
    jar: CookieJar,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<ApiResponse>), AuthError> {
    let Json(request) = payload.map_err(|e| {
        tracing::debug!(error = %e, "Unreadable sign-in body");
        Error::InvalidInput("Invalid authorization code".into())
    })?;

    let code: AuthorizationCode = request
        .authorization_code
        .ok_or_else(|| Error::InvalidInput("Invalid authorization code".into()))?
        .try_into()?;

    if let (Some(expected), Some(received)) = (cookies::get_state(&jar), request.state.as_deref()) {
        if expected != received {
            tracing::warn!("OAuth state mismatch");
            return Err(Error::InvalidInput("State mismatch".into()).into());
        }
    }

    let access_token = state.provider.exchange_code(&code).await.inspect_err(|e| {
        tracing::error!(error = %e, "Token exchange failed");
    })?;

    let profile = state
        .provider
        .fetch_profile(&access_token)
        .await
        .inspect_err(|e| {
            tracing::error!(error = %e, "Profile request failed");
        })?;
    drop(access_token);

    let issued_at = OffsetDateTime::now_utc();
    let (session, backend_token) = tokio::try_join!(
        async { state.issuer.issue(&profile, issued_at) },
        state.backend.federate(&profile),
    )?;

    let pair = cookies::session_pair(&state.settings, &session.token, &backend_token, issued_at);
    let jar = cookies::write_session(jar, pair)
        .add(cookies::clear_state_cookie(&state.settings.auth_path));

    tracing::info!(account = %profile.cmuitaccount_name, "CMU EntraID login successful");

    Ok((jar, Json(ApiResponse::ok())))
}

// ── Sign-out ───────────────────────────────────────────────────────

async fn signout<P: IdentityProvider, B: BackendDirectory>(
    State(state): State<AuthState<P, B>>,
    jar: CookieJar,
) -> (CookieJar, Json<ApiResponse>) {
    let pair = cookies::clear_session_pair(&state.settings);
    (cookies::write_session(jar, pair), Json(ApiResponse::ok()))
}

// ── Who am I ───────────────────────────────────────────────────────

async fn me(user: SessionUser) -> Json<MeResponse> {
    Json(MeResponse {
        ok: true,
        profile: user.claims,
    })
}
