//! Error types for harness runs
//!
//! Every error maps to one [`ErrorCategory`], and every category to an exit
//! code outside the test runner's own 0-5 range.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::process::ExitStatus;
use wasmstan_backend::BackendError;
use wasmstan_filter::FilterError;
use wasmstan_seams::SeamError;

/// Exit code reported when the run is interrupted
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Infrastructure failure class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Environment or toolchain missing, reported before any side effect
    Precondition,
    /// Backend exited early or never became reachable
    BackendStartup,
    /// Collaborator does not expose an expected seam
    SeamBinding,
    /// Anything else touching the filesystem or processes
    Io,
    /// SIGINT or SIGTERM before the suite finished
    Interrupted,
}

impl ErrorCategory {
    /// Process exit code (sysexits)
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Precondition => 78,
            Self::BackendStartup => 69,
            Self::SeamBinding => 70,
            Self::Io => 74,
            Self::Interrupted => INTERRUPTED_EXIT_CODE,
        }
    }

    /// Stable lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Precondition => "precondition",
            Self::BackendStartup => "backend-startup",
            Self::SeamBinding => "seam-binding",
            Self::Io => "io",
            Self::Interrupted => "interrupted",
        }
    }
}

impl Display for ErrorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Harness error type
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Toolchain location variable unset or empty
    #[error("{var} is not set; point it at the compilation toolchain")]
    MissingToolchain {
        /// Variable that was checked
        var: String,
    },

    /// Compiler not found on the search path
    #[error("{compiler} not found on PATH; install and activate the WebAssembly toolchain")]
    CompilerNotFound {
        /// Compiler that was looked up
        compiler: String,
    },

    /// Compiler found but `--version` failed
    #[error("{compiler} --version failed ({status}); the WebAssembly toolchain is broken")]
    CompilerFailed {
        /// Compiler that was run
        compiler: String,
        /// How it exited
        status: ExitStatus,
    },

    /// A backend script is missing from the checkout
    #[error("backend file missing: {}", path.display())]
    MissingBackendFile {
        /// Expected location
        path: PathBuf,
    },

    /// Library could not be determined
    #[error("library selection: {0}")]
    Library(#[from] FilterError),

    /// Configuration file unreadable or invalid
    #[error("config {}: {message}", path.display())]
    Config {
        /// File that was loaded
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// Backend supervisor failed
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Seam installation or use failed
    #[error(transparent)]
    Seam(#[from] SeamError),

    /// Test runner could not be spawned
    #[error("failed to run {program}: {source}")]
    Runner {
        /// Runner program
        program: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Shutdown requested before the test runner was started
    #[error("interrupted while {phase}")]
    Interrupted {
        /// What the harness was doing
        phase: &'static str,
    },

    /// Other I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// Failure class of this error
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingToolchain { .. }
            | Self::CompilerNotFound { .. }
            | Self::CompilerFailed { .. }
            | Self::MissingBackendFile { .. }
            | Self::Library(_)
            | Self::Config { .. } => ErrorCategory::Precondition,
            Self::Backend(e) | Self::Seam(SeamError::Backend(e)) => backend_category(e),
            Self::Seam(e) if e.is_binding_failure() => ErrorCategory::SeamBinding,
            Self::Seam(SeamError::AlreadyRunning(_)) => ErrorCategory::BackendStartup,
            Self::Seam(_) | Self::Runner { .. } | Self::Io(_) => ErrorCategory::Io,
            Self::Interrupted { .. } => ErrorCategory::Interrupted,
        }
    }

    /// Process exit code for this error
    #[inline]
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }
}

fn backend_category(error: &BackendError) -> ErrorCategory {
    match error {
        BackendError::ExecutableNotFound { .. } => ErrorCategory::Precondition,
        BackendError::Io(_) => ErrorCategory::Io,
        _ => ErrorCategory::BackendStartup,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wasmstan_backend::Endpoint;
    use wasmstan_seams::SeamName;

    #[test]
    fn categories_map_to_distinct_exit_codes() {
        let codes = [
            ErrorCategory::Precondition,
            ErrorCategory::BackendStartup,
            ErrorCategory::SeamBinding,
            ErrorCategory::Io,
            ErrorCategory::Interrupted,
        ]
        .map(ErrorCategory::exit_code);

        for (i, a) in codes.iter().enumerate() {
            assert!(*a > 5, "exit code {a} collides with runner codes");
            assert!(codes[i + 1..].iter().all(|b| a != b));
        }
    }

    #[test]
    fn backend_errors_are_classified() {
        let not_ready = HarnessError::from(BackendError::NotReady {
            endpoint: Endpoint::default(),
            waited: Duration::from_secs(10),
        });
        assert_eq!(not_ready.category(), ErrorCategory::BackendStartup);
        assert_eq!(not_ready.exit_code(), 69);

        let missing = HarnessError::from(SeamError::Backend(BackendError::ExecutableNotFound {
            program: PathBuf::from("node"),
        }));
        assert_eq!(missing.category(), ErrorCategory::Precondition);
    }

    #[test]
    fn seam_errors_are_binding_failures() {
        let err = HarnessError::from(SeamError::SeamMissing(SeamName::ClientLocator));
        assert_eq!(err.category(), ErrorCategory::SeamBinding);
        assert_eq!(err.exit_code(), 70);
        assert!(err.to_string().contains("client-locator"));
    }

    #[test]
    fn preconditions_exit_with_config_code() {
        let err = HarnessError::MissingToolchain {
            var: "CMDSTAN_PATH".to_string(),
        };
        assert_eq!(err.exit_code(), 78);
        assert!(err.to_string().starts_with("CMDSTAN_PATH is not set"));
    }

    #[test]
    fn early_interrupt_exits_like_suite_interrupt() {
        let err = HarnessError::Interrupted {
            phase: "starting the backend",
        };
        assert_eq!(err.category(), ErrorCategory::Interrupted);
        assert_eq!(err.exit_code(), INTERRUPTED_EXIT_CODE);
        assert_eq!(err.to_string(), "interrupted while starting the backend");
    }
}
