//! Orchestration of one harness run
//!
//! check preconditions -> probe backend version -> install seams -> start
//! backend -> run filtered suite -> stop backend -> uninstall seams.
//!
//! The interrupt future is watched through every phase. Teardown runs on
//! every path once seams are installed, including runner failures and
//! interrupts. A backend that fails to start, or whose start is interrupted,
//! is killed before the error surfaces.

use crate::config::HarnessConfig;
use crate::error::{HarnessError, INTERRUPTED_EXIT_CODE};
use crate::preconditions;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use uuid::Uuid;
use wasmstan_backend::{backend_version, Endpoint, EndpointRegistry, Supervisor};
use wasmstan_filter::{build_filter, FilterExpression, Library};
use wasmstan_seams::{install, uninstall, ClientSession, HarnessSeams, SeamRegistry, ServiceRunner};

/// Environment variables exported to the test runner
pub mod env {
    /// `http://<host>:<port>` of the running backend
    pub const BACKEND_URL: &str = "WASMSTAN_BACKEND_URL";
    /// Bound host
    pub const BACKEND_HOST: &str = "WASMSTAN_BACKEND_HOST";
    /// Bound port
    pub const BACKEND_PORT: &str = "WASMSTAN_BACKEND_PORT";
    /// Version banner model identities are derived from
    pub const BACKEND_VERSION: &str = "WASMSTAN_BACKEND_VERSION";
}

/// How the suite ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "code", rename_all = "lowercase")]
pub enum HarnessOutcome {
    /// Runner exited 0
    Passed,
    /// Runner exited with this non-zero code
    Failed(i32),
    /// Interrupted before the runner finished
    Interrupted,
}

impl HarnessOutcome {
    /// Process exit code mirroring the suite
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Passed => 0,
            Self::Failed(code) => code,
            Self::Interrupted => INTERRUPTED_EXIT_CODE,
        }
    }

    fn from_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(0) => Self::Passed,
            Some(code) => Self::Failed(code),
            None => {
                tracing::warn!(%status, "runner terminated by signal");
                Self::Failed(1)
            }
        }
    }
}

/// Record of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Unique id of this run
    pub run_id: Uuid,
    /// Library whose suite ran
    pub library: Library,
    /// Where the backend listened
    pub endpoint: Endpoint,
    /// Backend version banner
    pub backend_version: String,
    /// Expression passed to the runner
    pub filter: String,
    /// When the run began
    pub started_at: DateTime<Utc>,
    /// When teardown finished
    pub finished_at: DateTime<Utc>,
    /// How the suite ended
    pub outcome: HarnessOutcome,
}

/// One harness run against a seam registry
#[derive(Debug)]
pub struct Harness<'r> {
    config: HarnessConfig,
    registry: &'r SeamRegistry,
    run_id: Uuid,
}

impl Harness<'static> {
    /// Harness over the process-wide registry
    #[must_use]
    pub fn global(config: HarnessConfig) -> Self {
        Self::new(config, SeamRegistry::global())
    }
}

impl<'r> Harness<'r> {
    /// Harness installing into `registry`
    #[must_use]
    pub fn new(config: HarnessConfig, registry: &'r SeamRegistry) -> Self {
        Self {
            config,
            registry,
            run_id: Uuid::new_v4(),
        }
    }

    /// Id tagging this run's logs and summary
    #[inline]
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Library whose suite will run
    ///
    /// # Errors
    /// [`HarnessError::Library`] if none is configured and the checkout
    /// directory name matches no library
    pub fn library(&self) -> Result<Library, HarnessError> {
        match self.config.library {
            Some(library) => Ok(library),
            None => {
                let dir = &self.config.library_dir;
                let dir = if dir.is_absolute() {
                    dir.clone()
                } else {
                    std::env::current_dir()?.join(dir)
                };
                Ok(Library::detect(&dir)?)
            }
        }
    }

    /// Run the suite; resolving `interrupt` kills the runner and tears down
    ///
    /// `interrupt` is observed from the first precondition onwards. Before
    /// the runner starts it ends the run with [`HarnessError::Interrupted`];
    /// afterwards the outcome is [`HarnessOutcome::Interrupted`].
    ///
    /// # Errors
    /// Any infrastructure failure; test failures are reported through
    /// [`RunSummary::outcome`] instead
    pub async fn run<F>(self, interrupt: F) -> Result<RunSummary, HarnessError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(interrupt);
        let started_at = Utc::now();
        let library = self.library()?;

        let version = tokio::select! {
            version = self.prepare() => version?,
            () = interrupt.as_mut() => {
                return Err(HarnessError::Interrupted {
                    phase: "checking preconditions",
                });
            }
        };
        let version_text = String::from_utf8_lossy(&version).into_owned();
        tracing::info!(%library, backend_version = %version_text, "preconditions met");

        let supervisor = Supervisor::new(
            self.config.backend.clone(),
            EndpointRegistry::with_fallback(self.config.backend.endpoint()),
        );
        let seams = HarnessSeams::new(supervisor, version)
            .with_client_dir(self.config.backend.root.join("client"));
        let set = install(self.registry, seams.substitutions())?;

        let filter = build_filter(library);
        let result = self.run_installed(&filter, &version_text, interrupt.as_mut()).await;

        if let Err(e) = seams.runner.stop().await {
            tracing::warn!(error = %e, "backend teardown failed");
        }
        uninstall(self.registry, set);

        let (endpoint, outcome) = result?;
        let summary = RunSummary {
            run_id: self.run_id,
            library,
            endpoint,
            backend_version: version_text,
            filter: filter.to_string(),
            started_at,
            finished_at: Utc::now(),
            outcome,
        };
        tracing::info!(outcome = ?summary.outcome, exit_code = outcome.exit_code(), "run finished");
        Ok(summary)
    }

    async fn prepare(&self) -> Result<Vec<u8>, HarnessError> {
        preconditions::check(&self.config).await?;
        Ok(backend_version(&self.config.backend).await?)
    }

    async fn run_installed<F>(
        &self,
        filter: &FilterExpression,
        version: &str,
        mut interrupt: Pin<&mut F>,
    ) -> Result<(Endpoint, HarnessOutcome), HarnessError>
    where
        F: Future<Output = ()>,
    {
        let backend = &self.config.backend;
        let runner = self.registry.service_runner()?;

        // Dropping an unfinished start kills the half-started child
        let bound = tokio::select! {
            bound = runner.start(&backend.host, backend.port) => bound?,
            () = interrupt.as_mut() => {
                return Err(HarnessError::Interrupted {
                    phase: "starting the backend",
                });
            }
        };
        tracing::info!(endpoint = %bound, "backend listening");

        let session = ClientSession::connect_via(self.registry)?;
        let endpoint = session.endpoint().clone();

        let mut command = self.runner_command(filter, &endpoint, version);
        let mut child = command.spawn().map_err(|source| HarnessError::Runner {
            program: self.config.runner.program.clone(),
            source,
        })?;
        tracing::info!(program = %self.config.runner.program, %filter, "test suite started");

        let outcome = tokio::select! {
            status = child.wait() => HarnessOutcome::from_status(status?),
            () = interrupt.as_mut() => {
                tracing::warn!("interrupted, stopping test runner");
                if let Err(e) = child.start_kill() {
                    tracing::warn!(error = %e, "failed to kill test runner");
                }
                if let Err(e) = child.wait().await {
                    tracing::warn!(error = %e, "failed to reap test runner");
                }
                HarnessOutcome::Interrupted
            }
        };
        Ok((endpoint, outcome))
    }

    fn runner_command(&self, filter: &FilterExpression, endpoint: &Endpoint, version: &str) -> Command {
        let mut command = Command::new(&self.config.runner.program);
        command
            .args(&self.config.runner.args)
            .args(filter.runner_args())
            .current_dir(&self.config.library_dir)
            .env(env::BACKEND_URL, endpoint.http_url(""))
            .env(env::BACKEND_HOST, &endpoint.host)
            .env(env::BACKEND_PORT, endpoint.port.to_string())
            .env(env::BACKEND_VERSION, version)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_exit_codes() {
        assert_eq!(HarnessOutcome::Passed.exit_code(), 0);
        assert_eq!(HarnessOutcome::Failed(5).exit_code(), 5);
        assert_eq!(HarnessOutcome::Interrupted.exit_code(), 130);
    }

    #[test]
    fn outcome_serializes_tagged() {
        let json = serde_json::to_value(HarnessOutcome::Failed(1)).unwrap();
        assert_eq!(json, serde_json::json!({ "outcome": "failed", "code": 1 }));
        let json = serde_json::to_value(HarnessOutcome::Passed).unwrap();
        assert_eq!(json, serde_json::json!({ "outcome": "passed" }));
    }

    #[test]
    fn library_detected_from_checkout_dir() {
        let dir = tempfile::tempdir().unwrap();
        let checkout = dir.path().join("pystan");
        std::fs::create_dir(&checkout).unwrap();

        let registry = SeamRegistry::new();
        let harness = Harness::new(HarnessConfig::new().with_library_dir(&checkout), &registry);
        assert_eq!(harness.library().unwrap(), Library::Pystan);

        let harness = Harness::new(HarnessConfig::new().with_library_dir(dir.path()), &registry);
        assert_eq!(harness.library().unwrap_err().exit_code(), 78);
    }
}
