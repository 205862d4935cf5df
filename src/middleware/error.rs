use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::types::ApiResponse;
use crate::error::Error;

/// Authentication errors for the middleware layer.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No session cookie on the request.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Session cookie present but its assertion is forged, malformed or expired.
    #[error("Session expired")]
    SessionExpired,

    /// A login stage failed. No cookie is written alongside this response.
    #[error(transparent)]
    Login(#[from] Error),
}

impl AuthError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated | Self::SessionExpired => StatusCode::UNAUTHORIZED,
            Self::Login(err) => match err {
                Error::InvalidInput(_) | Error::UpstreamToken(_) | Error::UpstreamProfile(_) => {
                    StatusCode::BAD_REQUEST
                }
                Error::BackendFederation {
                    status: Some(status),
                    ..
                } => StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Login(Error::Configuration(_) | Error::TokenSigning(_)) => {
                tracing::error!(error = %self, "Auth internal error");
                "Internal error".to_string()
            }
            Self::Login(err) => {
                tracing::warn!(error = %err, status = status.as_u16(), "Login failed");
                err.to_string()
            }
            Self::Unauthenticated | Self::SessionExpired => self.to_string(),
        };
        (status, Json(ApiResponse::error(message))).into_response()
    }
}
