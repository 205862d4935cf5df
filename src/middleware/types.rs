use serde::{Deserialize, Serialize};

use crate::token::SessionClaims;

/// Body of the login completion request.
///
/// The code is kept as a raw string here so a malformed value surfaces as
/// `InvalidInput` from the handler rather than as a JSON rejection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    #[serde(default)]
    pub authorization_code: Option<String>,
    /// Echo of the `state` query parameter from the callback URL.
    #[serde(default)]
    pub state: Option<String>,
}

/// `{ ok }` envelope shared by every auth endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            ok: true,
            message: None,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: Some(message.into()),
        }
    }
}

/// Who-am-I payload: the verified session claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    pub ok: bool,
    pub profile: SessionClaims,
}
