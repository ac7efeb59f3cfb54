//! Error types for seam substitution

use crate::seam::SeamName;
use wasmstan_backend::BackendError;

/// Seam substitution error type
#[derive(Debug, thiserror::Error)]
pub enum SeamError {
    /// Collaborator never published the seam; its interface changed
    #[error("seam '{0}' is not published by the collaborator")]
    SeamMissing(SeamName),

    /// Substitutions are already installed on this registry
    #[error("substitutions already installed")]
    AlreadyInstalled,

    /// Service runner asked to start twice
    #[error("service already running on {0}")]
    AlreadyRunning(wasmstan_backend::Endpoint),

    /// Backend supervisor failed
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// HTTP request through a client session failed
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl SeamError {
    /// Whether this is a binding failure rather than a runtime failure
    #[inline]
    #[must_use]
    pub fn is_binding_failure(&self) -> bool {
        matches!(self, Self::SeamMissing(_) | Self::AlreadyInstalled)
    }
}
