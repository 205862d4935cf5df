use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

use crate::error::Error;

const MAX_CODE_LEN: usize = 2048;

/// One-time authorization code from the EntraID redirect.
///
/// Guaranteed well-formed by construction: non-empty, at most 2048 bytes,
/// no whitespace or control characters. Parsing happens before any network
/// call so a malformed code never costs a round trip.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct AuthorizationCode(String);

impl AuthorizationCode {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AuthorizationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthorizationCode(..)")
    }
}

impl std::str::FromStr for AuthorizationCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl TryFrom<String> for AuthorizationCode {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.is_empty() {
            return Err(Error::InvalidInput("Invalid authorization code".into()));
        }
        if s.len() > MAX_CODE_LEN
            || s.chars().any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(Error::InvalidInput("Malformed authorization code".into()));
        }
        Ok(Self(s))
    }
}

/// EntraID bearer credential. Lives only for the profile fetch.
#[derive(Clone, PartialEq, Eq, From, Into)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// Backend-scoped bearer token obtained through federation.
///
/// Forwarded by the browser as `Authorization: Bearer` on API calls, so it is
/// stored in a script-readable cookie. Its lifetime is enforced by cookie expiry.
#[derive(Clone, PartialEq, Eq, From, Into)]
pub struct BackendSessionToken(String);

impl BackendSessionToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for BackendSessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BackendSessionToken(..)")
    }
}

/// Role reported by the backend for the current caller.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct Role(pub String);

impl Role {
    pub const UNKNOWN: &'static str = "unknown";

    /// Fallback for any failed or timed-out lookup. Never satisfies a role check.
    #[must_use]
    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_owned())
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN
    }

    /// `true` only for an exact match against a known role.
    #[must_use]
    pub fn satisfies(&self, required: &str) -> bool {
        !self.is_unknown() && self.0 == required
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_codes() {
        assert!("abc123".parse::<AuthorizationCode>().is_ok());
        assert!("0.AXEA-abc_def~ghi".parse::<AuthorizationCode>().is_ok());
    }

    #[test]
    fn empty_code_rejected() {
        let err = "".parse::<AuthorizationCode>().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn whitespace_and_control_rejected() {
        assert!("   ".parse::<AuthorizationCode>().is_err());
        assert!("abc 123".parse::<AuthorizationCode>().is_err());
        assert!("abc\n".parse::<AuthorizationCode>().is_err());
        assert!("abc\u{0}".parse::<AuthorizationCode>().is_err());
    }

    #[test]
    fn oversized_code_rejected() {
        let long = "a".repeat(MAX_CODE_LEN + 1);
        assert!(long.parse::<AuthorizationCode>().is_err());
        let edge = "a".repeat(MAX_CODE_LEN);
        assert!(edge.parse::<AuthorizationCode>().is_ok());
    }

    #[test]
    fn code_deserializes_through_validation() {
        let ok: Result<AuthorizationCode, _> = serde_json::from_str("\"abc123\"");
        assert_eq!(ok.unwrap().as_str(), "abc123");
        let bad: Result<AuthorizationCode, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }

    #[test]
    fn secrets_are_not_printed() {
        let token = AccessToken::from("tok-1".to_string());
        assert!(!format!("{token:?}").contains("tok-1"));
        let backend = BackendSessionToken::from("be-1".to_string());
        assert!(!format!("{backend:?}").contains("be-1"));
    }

    #[test]
    fn unknown_role_never_satisfies() {
        assert!(!Role::unknown().satisfies("unknown"));
        assert!(!Role::unknown().satisfies("admin"));
        assert!(Role::from("admin").satisfies("admin"));
        assert!(!Role::from("user").satisfies("admin"));
    }
}
