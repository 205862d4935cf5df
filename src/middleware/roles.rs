use std::sync::Arc;
use std::time::Duration;

use super::traits::BackendDirectory;
use crate::error::Error;
use crate::types::{BackendSessionToken, Role};

/// Time-bounded role lookup for gated requests.
///
/// The lookup future is dropped when the deadline passes, which abandons the
/// in-flight request. Every failure collapses to [`Role::unknown`].
pub struct EdgeRoleResolver<B> {
    backend: Arc<B>,
    deadline: Duration,
}

impl<B> Clone for EdgeRoleResolver<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            deadline: self.deadline,
        }
    }
}

impl<B: BackendDirectory> EdgeRoleResolver<B> {
    #[must_use]
    pub fn new(backend: Arc<B>, deadline: Duration) -> Self {
        Self { backend, deadline }
    }

    pub async fn resolve(&self, token: Option<&BackendSessionToken>) -> Role {
        let Some(token) = token else {
            tracing::debug!("No backend session cookie; role unknown");
            return Role::unknown();
        };

        match tokio::time::timeout(self.deadline, self.backend.current_role(token)).await {
            Ok(Ok(role)) => role,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Role lookup failed");
                Role::unknown()
            }
            Err(_) => {
                tracing::warn!(
                    error = %Error::Timeout,
                    deadline_ms = self.deadline.as_millis() as u64,
                    "Role lookup abandoned"
                );
                Role::unknown()
            }
        }
    }
}
