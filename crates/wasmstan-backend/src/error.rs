//! Error types for the backend supervisor
//!
//! Provides error handling for:
//! - Locating and spawning the backend executable
//! - Readiness failures (early exit, never reachable)
//! - Version banner probing

use crate::endpoint::Endpoint;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

/// Backend supervisor error type
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Runtime executable could not be located
    #[error("backend executable not found: {}", program.display())]
    ExecutableNotFound {
        /// Program that was looked up
        program: PathBuf,
    },

    /// Spawning failed for another reason
    #[error("failed to spawn {}: {source}", program.display())]
    Spawn {
        /// Program being spawned
        program: PathBuf,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Backend process exited before it accepted connections
    #[error("backend exited before listening on {endpoint} ({status})")]
    Exited {
        /// Address it was supposed to bind
        endpoint: Endpoint,
        /// How it exited
        status: ExitStatus,
    },

    /// Backend never became reachable within the readiness bound
    #[error("backend failed to become ready on {endpoint} within {waited:?}")]
    NotReady {
        /// Address that was polled
        endpoint: Endpoint,
        /// Time spent polling
        waited: Duration,
    },

    /// Requested port is already bound by another process
    #[error("port {endpoint} is already in use: {source}")]
    PortInUse {
        /// Address that could not be bound
        endpoint: Endpoint,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// No free port could be reserved
    #[error("could not reserve a port on {host}: {source}")]
    PortAllocation {
        /// Host the port was requested on
        host: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// `--version` probe exited unsuccessfully
    #[error("backend version probe failed ({status}): {stderr}")]
    VersionProbe {
        /// Probe exit status
        status: ExitStatus,
        /// What the probe wrote to stderr
        stderr: String,
    },

    /// Other I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackendError {
    /// Whether the backend could not be brought up (as opposed to a missing executable)
    #[inline]
    #[must_use]
    pub fn is_startup_failure(&self) -> bool {
        matches!(
            self,
            Self::Exited { .. }
                | Self::NotReady { .. }
                | Self::PortInUse { .. }
                | Self::PortAllocation { .. }
                | Self::Spawn { .. }
        )
    }

    /// Whether the executable itself is missing
    #[inline]
    #[must_use]
    pub fn is_missing_executable(&self) -> bool {
        matches!(self, Self::ExecutableNotFound { .. })
    }

    pub(crate) fn from_spawn(program: PathBuf, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::ExecutableNotFound { program }
        } else {
            Self::Spawn { program, source }
        }
    }
}
