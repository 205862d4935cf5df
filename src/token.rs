use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::error::Error;
use crate::oauth::IdentityProfile;

/// Lifetime of both the session assertion and the backend session cookie.
pub const SESSION_TTL: Duration = Duration::hours(1);

/// Claims embedded in the internal session assertion.
///
/// Every identity field is copied from the [`IdentityProfile`]; nothing here
/// is looked up from anywhere else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct SessionClaims {
    pub cmuitaccount_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmuitaccount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, rename = "prename_TH", skip_serializing_if = "Option::is_none")]
    pub prename_th: Option<String>,
    #[serde(default, rename = "prename_EN", skip_serializing_if = "Option::is_none")]
    pub prename_en: Option<String>,
    #[serde(default, rename = "firstname_TH", skip_serializing_if = "Option::is_none")]
    pub firstname_th: Option<String>,
    #[serde(default, rename = "firstname_EN", skip_serializing_if = "Option::is_none")]
    pub firstname_en: Option<String>,
    #[serde(default, rename = "lastname_TH", skip_serializing_if = "Option::is_none")]
    pub lastname_th: Option<String>,
    #[serde(default, rename = "lastname_EN", skip_serializing_if = "Option::is_none")]
    pub lastname_en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_code: Option<String>,
    #[serde(default, rename = "organization_name_TH", skip_serializing_if = "Option::is_none")]
    pub organization_name_th: Option<String>,
    #[serde(default, rename = "organization_name_EN", skip_serializing_if = "Option::is_none")]
    pub organization_name_en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub itaccounttype_id: Option<String>,
    #[serde(default, rename = "itaccounttype_TH", skip_serializing_if = "Option::is_none")]
    pub itaccounttype_th: Option<String>,
    #[serde(default, rename = "itaccounttype_EN", skip_serializing_if = "Option::is_none")]
    pub itaccounttype_en: Option<String>,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds. Always `iat + 3600`.
    pub exp: i64,
}

impl SessionClaims {
    /// Project a profile into session claims issued at `issued_at`.
    #[must_use]
    pub fn from_profile(profile: &IdentityProfile, issued_at: OffsetDateTime) -> Self {
        let iat = issued_at.unix_timestamp();
        Self {
            cmuitaccount_name: profile.cmuitaccount_name.clone(),
            cmuitaccount: profile.cmuitaccount.clone(),
            student_id: profile.student_id.clone(),
            prename_th: profile.prename_th.clone(),
            prename_en: profile.prename_en.clone(),
            firstname_th: profile.firstname_th.clone(),
            firstname_en: profile.firstname_en.clone(),
            lastname_th: profile.lastname_th.clone(),
            lastname_en: profile.lastname_en.clone(),
            organization_code: profile.organization_code.clone(),
            organization_name_th: profile.organization_name_th.clone(),
            organization_name_en: profile.organization_name_en.clone(),
            itaccounttype_id: profile.itaccounttype_id.clone(),
            itaccounttype_th: profile.itaccounttype_th.clone(),
            itaccounttype_en: profile.itaccounttype_en.clone(),
            iat,
            exp: iat + SESSION_TTL.whole_seconds(),
        }
    }
}

/// A minted session assertion and the claims it carries.
#[derive(Debug, Clone)]
pub struct SignedSession {
    pub token: String,
    pub claims: SessionClaims,
}

/// Mints and verifies HS256 session assertions.
///
/// Holds the signing secret as given; an absent or empty secret is only
/// reported when a token is requested, and then always as an error.
#[derive(Clone)]
pub struct SessionTokenIssuer {
    secret: Option<String>,
}

impl SessionTokenIssuer {
    #[must_use]
    pub fn new(secret: Option<String>) -> Self {
        Self { secret }
    }

    fn secret(&self) -> Result<&[u8], Error> {
        self.secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::as_bytes)
            .ok_or_else(|| Error::missing_config("JWT_SECRET"))
    }

    /// Sign the claims projected from `profile`, expiring one hour after `issued_at`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the secret is missing or empty,
    /// or [`Error::TokenSigning`] if encoding fails.
    pub fn issue(
        &self,
        profile: &IdentityProfile,
        issued_at: OffsetDateTime,
    ) -> Result<SignedSession, Error> {
        let key = EncodingKey::from_secret(self.secret()?);
        let claims = SessionClaims::from_profile(profile, issued_at);
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &key)
            .map_err(|e| Error::TokenSigning(e.to_string()))?;
        Ok(SignedSession { token, claims })
    }

    /// Verify signature and expiry of a session assertion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the secret is missing, or
    /// [`Error::Token`] if the token is malformed, forged or expired.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, Error> {
        let key = DecodingKey::from_secret(self.secret()?);
        let validation = Validation::new(Algorithm::HS256);
        jsonwebtoken::decode::<SessionClaims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|e| Error::Token(e.to_string()))
    }
}

impl std::fmt::Debug for SessionTokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokenIssuer")
            .field("secret_set", &self.secret.is_some())
            .finish()
    }
}
