//! Testing utilities for the wasmstan workspace
//!
//! Shared fixtures: throwaway backend trees, executable scripts, fake seams.

#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
#[cfg(target_os = "linux")]
use std::time::Duration;
use tempfile::TempDir;
use wasmstan_backend::{BackendConfig, Endpoint, ReadinessConfig};
use wasmstan_identity::{resolve, ModelIdentity};
use wasmstan_seams::{ClientLocator, ModelNamer, SeamError, SeamRegistry, ServiceRunner};

pub const ENTRY_SCRIPT: &str = "server/main.js";
pub const CLI_SCRIPT: &str = "cmdstan.js";

/// Temporary backend checkout with entry script, CLI script and client dir
#[derive(Debug)]
pub struct BackendTree {
    dir: TempDir,
}

impl BackendTree {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("server")).unwrap();
        fs::create_dir_all(dir.path().join("client")).unwrap();
        fs::write(dir.path().join(ENTRY_SCRIPT), "// backend entry\n").unwrap();
        fs::write(dir.path().join(CLI_SCRIPT), "// backend cli\n").unwrap();
        fs::write(dir.path().join("client/index.html"), "<html></html>\n").unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn remove(&self, relative: &str) {
        fs::remove_file(self.root().join(relative)).unwrap();
    }

    /// Config running `runtime` (with no runtime args) from this tree
    pub fn config(&self, runtime: impl Into<PathBuf>) -> BackendConfig {
        BackendConfig::new()
            .with_root(self.root())
            .with_runtime(runtime, Vec::<String>::new())
            .with_readiness(quick_readiness())
    }
}

impl Default for BackendTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Readiness settings short enough for tests
pub fn quick_readiness() -> ReadinessConfig {
    ReadinessConfig {
        timeout_ms: 5_000,
        poll_interval_ms: 25,
        connect_timeout_ms: 200,
    }
}

/// Write an executable `#!/bin/sh` script into `dir`
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Whether `pid` is gone or a zombie waiting to be reaped
#[cfg(target_os = "linux")]
pub fn has_exited(pid: u32) -> bool {
    match fs::read_to_string(format!("/proc/{pid}/stat")) {
        Err(_) => true,
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.trim_start().chars().next())
            .is_some_and(|state| matches!(state, 'Z' | 'X')),
    }
}

/// Poll [`has_exited`] for up to `within`
#[cfg(target_os = "linux")]
pub async fn wait_for_exit(pid: u32, within: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if has_exited(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    has_exited(pid)
}

/// Pid a script wrote into `path`
pub fn read_pid(path: &Path) -> u32 {
    fs::read_to_string(path).unwrap().trim().parse().unwrap()
}

/// Port nothing listens on right now
pub async fn free_port() -> u16 {
    wasmstan_backend::readiness::free_port("127.0.0.1").await.unwrap()
}

/// Model namer that records every program it names
#[derive(Debug, Default)]
pub struct RecordingNamer {
    seen: Mutex<Vec<String>>,
}

impl RecordingNamer {
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }
}

impl ModelNamer for RecordingNamer {
    fn model_name(&self, program_code: &str) -> ModelIdentity {
        self.seen.lock().push(program_code.to_string());
        resolve(program_code.as_bytes(), b"recording")
    }
}

/// Service runner that records calls and starts nothing
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<String>>,
}

impl RecordingRunner {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ServiceRunner for RecordingRunner {
    async fn start(&self, host: &str, port: u16) -> Result<Endpoint, SeamError> {
        self.calls.lock().push(format!("start {host}:{port}"));
        Ok(Endpoint::new(host, port))
    }

    async fn stop(&self) -> Result<(), SeamError> {
        self.calls.lock().push("stop".to_string());
        Ok(())
    }
}

/// Locator pointing at a fixed endpoint
#[derive(Debug)]
pub struct StaticLocator(pub Endpoint);

impl ClientLocator for StaticLocator {
    fn locate(&self) -> Result<Endpoint, SeamError> {
        Ok(self.0.clone())
    }
}

/// Registry with the collaborator defaults published
pub fn published_registry() -> SeamRegistry {
    let registry = SeamRegistry::new();
    wasmstan_seams::defaults::publish_defaults(&registry);
    registry
}

/// Registry publishing only a namer and a locator
pub fn partial_registry() -> SeamRegistry {
    let registry = SeamRegistry::new();
    registry.publish_model_namer(Arc::new(RecordingNamer::default()));
    registry.publish_client_locator(Arc::new(StaticLocator(Endpoint::default())));
    registry
}
