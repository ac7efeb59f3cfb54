//! Process supervisor
//!
//! Owns the backend child process: spawn it bound to `host:port`, wait until
//! it accepts connections, publish the endpoint, and tear it down.
//!
//! One [`BackendProcess`] exists per successful [`Supervisor::start`].
//! Dropping it without calling [`BackendProcess::terminate`] still kills the
//! child (kill-on-drop), so a panicking run cannot orphan the backend.

use crate::config::BackendConfig;
use crate::endpoint::{Endpoint, EndpointRegistry};
use crate::error::BackendError;
use crate::readiness::{ensure_port_free, free_port, wait_until_ready};
use chrono::{DateTime, Utc};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::timeout;

/// Upper bound on reaping a process after a hard kill
const REAP_TIMEOUT: Duration = Duration::from_secs(1);

/// A spawned backend child
#[derive(Debug)]
pub struct BackendProcess {
    child: Child,
    pid: u32,
    endpoint: Endpoint,
    started_at: DateTime<Utc>,
    alive: bool,
    grace: Duration,
}

impl BackendProcess {
    /// OS process id
    #[inline]
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Where the backend listens
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Bound host
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.endpoint.host
    }

    /// Bound port
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.endpoint.port
    }

    /// When the process was spawned
    #[inline]
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whether the process is still running and has not been terminated
    pub fn is_alive(&mut self) -> bool {
        if self.alive && !matches!(self.child.try_wait(), Ok(None)) {
            self.alive = false;
        }
        self.alive
    }

    /// Stop the backend
    ///
    /// Sends SIGTERM (a hard kill on non-Unix targets), waits up to the
    /// configured grace period, then kills. Never fails; calling it again,
    /// or on a process that already exited, does nothing.
    pub async fn terminate(&mut self) {
        if !self.alive {
            tracing::debug!(pid = self.pid, "backend already terminated");
            return;
        }
        self.alive = false;

        match self.child.try_wait() {
            Ok(Some(status)) => {
                tracing::info!(pid = self.pid, %status, "backend had already exited");
                return;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(pid = self.pid, error = %e, "could not poll backend status"),
        }

        if let Err(e) = self.request_shutdown() {
            tracing::warn!(pid = self.pid, error = %e, "failed to signal backend");
        }

        match timeout(self.grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::info!(pid = self.pid, %status, "backend stopped");
            }
            Ok(Err(e)) => {
                tracing::warn!(pid = self.pid, error = %e, "error waiting for backend exit");
            }
            Err(_) => {
                tracing::warn!(pid = self.pid, grace = ?self.grace, "backend ignored SIGTERM, killing");
                if let Err(e) = self.child.start_kill() {
                    tracing::warn!(pid = self.pid, error = %e, "failed to kill backend");
                }
                if timeout(REAP_TIMEOUT, self.child.wait()).await.is_err() {
                    tracing::warn!(pid = self.pid, "backend not reaped after kill");
                }
            }
        }
    }

    #[cfg(unix)]
    fn request_shutdown(&mut self) -> std::io::Result<()> {
        send_sigterm(self.pid)
    }

    #[cfg(not(unix))]
    fn request_shutdown(&mut self) -> std::io::Result<()> {
        self.child.start_kill()
    }
}

impl Drop for BackendProcess {
    fn drop(&mut self) {
        if self.alive {
            tracing::warn!(pid = self.pid, "backend dropped without terminate, killing");
        }
    }
}

#[cfg(unix)]
fn send_sigterm(pid: u32) -> std::io::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let pid = i32::try_from(pid)
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "pid out of range"))?;
    kill(Pid::from_raw(pid), Signal::SIGTERM).map_err(std::io::Error::from)
}

/// Starts and stops the backend, publishing its endpoint
#[derive(Debug, Clone)]
pub struct Supervisor {
    config: BackendConfig,
    registry: EndpointRegistry,
}

impl Supervisor {
    /// Create supervisor writing to `registry`
    #[inline]
    #[must_use]
    pub fn new(config: BackendConfig, registry: EndpointRegistry) -> Self {
        Self { config, registry }
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Registry this supervisor publishes to
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// Start on the configured host and port
    ///
    /// # Errors
    /// See [`Supervisor::start`]
    pub async fn start_default(&self) -> Result<BackendProcess, BackendError> {
        let (host, port) = (self.config.host.clone(), self.config.port);
        self.start(&host, port).await
    }

    /// Spawn the backend bound to `host:port` and wait until it listens
    ///
    /// Port `0` picks a free port first; any other port must be free before
    /// the spawn, so a listener that is not ours is never mistaken for the
    /// backend. The registry is only updated once the backend accepts
    /// connections.
    ///
    /// # Errors
    /// - [`BackendError::PortInUse`] if something already listens on `host:port`
    /// - [`BackendError::ExecutableNotFound`] if the runtime is missing
    /// - [`BackendError::Exited`] / [`BackendError::NotReady`] if it never listens;
    ///   the child is killed before returning
    pub async fn start(&self, host: &str, port: u16) -> Result<BackendProcess, BackendError> {
        let endpoint = if port == 0 {
            Endpoint::new(host, free_port(host).await?)
        } else {
            let endpoint = Endpoint::new(host, port);
            ensure_port_free(&endpoint).await?;
            endpoint
        };

        let mut command = self.command(&endpoint);
        let child = command
            .spawn()
            .map_err(|e| BackendError::from_spawn(self.config.runtime.clone(), e))?;
        let pid = child.id().unwrap_or_default();
        tracing::info!(pid, %endpoint, runtime = %self.config.runtime.display(), "backend spawned");

        let mut process = BackendProcess {
            child,
            pid,
            endpoint,
            started_at: Utc::now(),
            alive: true,
            grace: self.config.terminate_grace(),
        };

        let ready = wait_until_ready(&process.endpoint, &self.config.readiness, || {
            process.child.try_wait()
        })
        .await;

        match ready {
            Ok(waited) => {
                tracing::info!(pid, endpoint = %process.endpoint, ?waited, "backend ready");
                self.registry.set(process.host(), process.port());
                Ok(process)
            }
            Err(e) => {
                tracing::error!(pid, error = %e, "backend failed to start");
                process.terminate().await;
                Err(e)
            }
        }
    }

    /// Stop `process` and unpublish its endpoint
    pub async fn terminate(&self, process: &mut BackendProcess) {
        process.terminate().await;
        if self.registry.bound().as_ref() == Some(process.endpoint()) {
            self.registry.clear();
        }
    }

    fn command(&self, endpoint: &Endpoint) -> Command {
        let mut command = Command::new(&self.config.runtime);
        command
            .args(&self.config.runtime_args)
            .arg(self.config.entry_script_path())
            .arg(&endpoint.host)
            .arg(endpoint.port.to_string())
            .current_dir(&self.config.root)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        if self.config.inherit_output {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReadinessConfig;

    fn quick_readiness() -> ReadinessConfig {
        ReadinessConfig {
            timeout_ms: 500,
            poll_interval_ms: 20,
            connect_timeout_ms: 100,
        }
    }

    #[tokio::test]
    async fn missing_runtime_is_reported() {
        let config = BackendConfig::new()
            .with_runtime("/nonexistent/wasmstan-runtime", Vec::<String>::new())
            .with_readiness(quick_readiness());
        let supervisor = Supervisor::new(config, EndpointRegistry::new());

        let err = supervisor.start("127.0.0.1", 0).await.unwrap_err();
        assert!(err.is_missing_executable(), "{err}");
        assert!(supervisor.registry().bound().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn immediate_exit_is_a_startup_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = BackendConfig::new()
            .with_root(dir.path())
            .with_runtime("sh", ["-c", "exit 3"])
            .with_readiness(ReadinessConfig {
                timeout_ms: 5_000,
                ..quick_readiness()
            });
        let supervisor = Supervisor::new(config, EndpointRegistry::new());

        let err = supervisor.start("127.0.0.1", 0).await.unwrap_err();
        match err {
            BackendError::Exited { status, .. } => assert_eq!(status.code(), Some(3)),
            other => panic!("expected Exited, got {other:?}"),
        }
        assert!(supervisor.registry().bound().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn terminate_stops_with_sigterm_before_grace_runs_out() {
        use nix::sys::signal::Signal;
        use std::os::unix::process::ExitStatusExt;

        let child = Command::new("sleep").arg("30").kill_on_drop(true).spawn().unwrap();
        let pid = child.id().unwrap();
        let mut process = BackendProcess {
            child,
            pid,
            endpoint: Endpoint::default(),
            started_at: Utc::now(),
            alive: true,
            grace: Duration::from_secs(5),
        };

        let started = std::time::Instant::now();
        process.terminate().await;

        let status = process.child.try_wait().unwrap().unwrap();
        assert_eq!(status.signal(), Some(Signal::SIGTERM as i32));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!process.is_alive());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn occupied_port_is_not_published() {
        let squatter = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = squatter.local_addr().unwrap().port();
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("spawned");
        let config = BackendConfig::new()
            .with_root(dir.path())
            .with_runtime("sh", ["-c", "touch spawned; sleep 0.3; exit 1"])
            .with_readiness(quick_readiness());
        let supervisor = Supervisor::new(config, EndpointRegistry::new());

        let err = supervisor.start("127.0.0.1", port).await.unwrap_err();
        match &err {
            BackendError::PortInUse { endpoint, .. } => assert_eq!(endpoint.port, port),
            other => panic!("expected PortInUse, got {other:?}"),
        }
        assert!(err.is_startup_failure());
        assert!(supervisor.registry().bound().is_none());
        assert!(!marker.exists(), "backend must not be spawned onto a taken port");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn silent_process_times_out_and_is_killed() {
        let dir = tempfile::tempdir().unwrap();
        let config = BackendConfig::new()
            .with_root(dir.path())
            .with_runtime("sh", ["-c", "sleep 30"])
            .with_readiness(quick_readiness());
        let supervisor = Supervisor::new(config, EndpointRegistry::new());

        let started = std::time::Instant::now();
        let err = supervisor.start("127.0.0.1", 0).await.unwrap_err();
        assert!(matches!(err, BackendError::NotReady { .. }), "{err}");
        assert!(err.is_startup_failure());
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
