#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed or missing authorization code, or a mismatched `state`.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to exchange authorization code: {0}")]
    UpstreamToken(String),

    #[error("Failed to fetch identity profile: {0}")]
    UpstreamProfile(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Carries the backend's own status when it answered at all.
    #[error("{message}")]
    BackendFederation {
        status: Option<u16>,
        message: String,
    },

    #[error("Failed to sign session token: {0}")]
    TokenSigning(String),

    #[error("Session token verification error: {0}")]
    Token(String),

    #[error("Role lookup failed: {0}")]
    RoleLookup(String),

    #[error("Role lookup timed out")]
    Timeout,
}

impl Error {
    pub(crate) fn missing_config(name: &str) -> Self {
        Self::Configuration(format!("{name} is required"))
    }
}
