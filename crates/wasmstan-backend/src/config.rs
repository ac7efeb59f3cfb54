//! Backend configuration
//!
//! Durations are kept as milliseconds so the structs round-trip through TOML.

use crate::endpoint::{Endpoint, DEFAULT_HOST, DEFAULT_PORT};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// How to launch and supervise the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Runtime executable (looked up on `PATH` when not a path)
    pub runtime: PathBuf,
    /// Arguments passed to the runtime before the entry script
    pub runtime_args: Vec<String>,
    /// Backend checkout; scripts are resolved against it and it is the child's cwd
    pub root: PathBuf,
    /// Server entry script, relative to `root`
    pub entry_script: PathBuf,
    /// Command-line front end used for `--version`, relative to `root`
    pub cli_script: PathBuf,
    /// Host to bind
    pub host: String,
    /// Port to bind; `0` picks a free port
    pub port: u16,
    /// Inherit the backend's stdout/stderr instead of discarding them
    pub inherit_output: bool,
    /// Explicit version banner; skips the `--version` probe when set
    pub version: Option<String>,
    /// Readiness polling
    pub readiness: ReadinessConfig,
    /// Grace period between SIGTERM and a hard kill, in milliseconds
    pub terminate_grace_ms: u64,
}

impl BackendConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With backend checkout root
    #[inline]
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// With runtime executable and its leading arguments
    #[must_use]
    pub fn with_runtime<I, S>(mut self, runtime: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runtime = runtime.into();
        self.runtime_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// With server entry script
    #[inline]
    #[must_use]
    pub fn with_entry_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.entry_script = script.into();
        self
    }

    /// With bind address
    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// With readiness polling
    #[inline]
    #[must_use]
    pub fn with_readiness(mut self, readiness: ReadinessConfig) -> Self {
        self.readiness = readiness;
        self
    }

    /// With explicit version banner
    #[inline]
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Configured bind address
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    /// Entry script resolved against `root`
    #[must_use]
    pub fn entry_script_path(&self) -> PathBuf {
        self.root.join(&self.entry_script)
    }

    /// CLI script resolved against `root`
    #[must_use]
    pub fn cli_script_path(&self) -> PathBuf {
        self.root.join(&self.cli_script)
    }

    /// Grace period before a hard kill
    #[inline]
    #[must_use]
    pub fn terminate_grace(&self) -> Duration {
        Duration::from_millis(self.terminate_grace_ms)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            runtime: PathBuf::from("node"),
            runtime_args: vec!["--experimental-worker".to_string()],
            root: PathBuf::from("."),
            entry_script: PathBuf::from("server/main.js"),
            cli_script: PathBuf::from("cmdstan.js"),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            inherit_output: false,
            version: None,
            readiness: ReadinessConfig::default(),
            terminate_grace_ms: 3_000,
        }
    }
}

/// Bounded connect-and-retry settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Give up after this long, in milliseconds
    pub timeout_ms: u64,
    /// Pause between attempts, in milliseconds
    pub poll_interval_ms: u64,
    /// Bound on a single connect attempt, in milliseconds
    pub connect_timeout_ms: u64,
}

impl ReadinessConfig {
    /// Overall bound
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Pause between attempts
    #[inline]
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Bound on one attempt
    #[inline]
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            poll_interval_ms: 100,
            connect_timeout_ms: 500,
        }
    }
}
