//! Full harness runs with the stub backend and scripted test runners
#![cfg(unix)]

use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use wasmstan_backend::readiness::probe;
use wasmstan_filter::Library;
use wasmstan_harness::{ErrorCategory, Harness, HarnessConfig, HarnessError, HarnessOutcome};
use wasmstan_seams::{SeamName, SeamRegistry};
use wasmstan_test_utils::{partial_registry, published_registry, write_script, BackendTree};

const STUB: &str = env!("CARGO_BIN_EXE_stub-backend");

struct Fixture {
    tree: BackendTree,
    scratch: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            tree: BackendTree::new(),
            scratch: tempfile::tempdir().unwrap(),
        }
    }

    fn script(&self, name: &str, body: &str) -> PathBuf {
        write_script(self.scratch.path(), name, body)
    }

    fn out(&self) -> PathBuf {
        self.scratch.path().join("runner.out")
    }

    /// Runner that records its arguments and backend env, then exits with `code`
    fn recording_runner(&self, code: i32) -> PathBuf {
        let out = self.out();
        self.script(
            "runner",
            &format!(
                "printf '%s\\n' \"$@\" > {out}\necho \"url=$WASMSTAN_BACKEND_URL\" >> {out}\necho \"version=$WASMSTAN_BACKEND_VERSION\" >> {out}\nexit {code}",
                out = out.display()
            ),
        )
    }

    fn config(&self, runner: &Path) -> HarnessConfig {
        let compiler = self.script("em++", "exit 0");
        HarnessConfig::new()
            .with_library(Library::Pystan)
            .with_library_dir(self.scratch.path())
            .with_toolchain_path("/opt/cmdstan")
            .with_compiler(compiler.to_string_lossy())
            .with_runner(runner.to_string_lossy(), Vec::<String>::new())
            .with_backend(self.tree.config(STUB).with_endpoint("127.0.0.1", 0))
    }
}

fn assert_restored(registry: &SeamRegistry) {
    assert!(!registry.is_installed());
    assert_eq!(registry.locate().unwrap().port, 8080);
    assert_eq!(registry.routes().unwrap().len(), 7);
}

#[tokio::test]
async fn passing_suite_runs_filtered_against_live_backend() {
    let fixture = Fixture::new();
    let registry = published_registry();
    let namer_before = registry.model_namer().unwrap();

    let config = fixture.config(&fixture.recording_runner(0));
    let summary = Harness::new(config, &registry).run(std::future::pending()).await.unwrap();

    assert_eq!(summary.outcome, HarnessOutcome::Passed);
    assert_eq!(summary.outcome.exit_code(), 0);
    assert_eq!(summary.library, Library::Pystan);
    assert_ne!(summary.endpoint.port, 0);

    let recorded = std::fs::read_to_string(fixture.out()).unwrap();
    let lines: Vec<&str> = recorded.lines().collect();
    assert_eq!(
        lines,
        [
            "-k",
            "not test_fit_cache and not test_nan_inf",
            format!("url=http://127.0.0.1:{}", summary.endpoint.port).as_str(),
            format!("version={}", summary.backend_version).as_str(),
        ]
    );

    assert_restored(&registry);
    assert!(Arc::ptr_eq(&namer_before, &registry.model_namer().unwrap()));
    assert!(!probe(&summary.endpoint, Duration::from_millis(200)).await);
}

#[tokio::test]
async fn failing_suite_exit_code_propagates() {
    let fixture = Fixture::new();
    let registry = published_registry();

    let config = fixture.config(&fixture.recording_runner(3));
    let summary = Harness::new(config, &registry).run(std::future::pending()).await.unwrap();

    assert_eq!(summary.outcome, HarnessOutcome::Failed(3));
    assert_eq!(summary.outcome.exit_code(), 3);
    assert_restored(&registry);
}

#[tokio::test]
async fn interrupt_kills_runner_and_tears_down() {
    let fixture = Fixture::new();
    let registry = published_registry();
    let runner = fixture.script("slow-runner", "exec sleep 30");

    let config = fixture.config(&runner);
    let started = std::time::Instant::now();
    let summary = Harness::new(config, &registry)
        .run(tokio::time::sleep(Duration::from_millis(300)))
        .await
        .unwrap();

    assert_eq!(summary.outcome, HarnessOutcome::Interrupted);
    assert_eq!(summary.outcome.exit_code(), 130);
    assert!(started.elapsed() < Duration::from_secs(20));
    assert_restored(&registry);
    assert!(!probe(&summary.endpoint, Duration::from_millis(200)).await);
}

#[tokio::test]
async fn backend_that_never_listens_is_a_startup_failure() {
    let fixture = Fixture::new();
    let registry = published_registry();
    let runtime = fixture.script(
        "dead-runtime",
        "case \"$*\" in *--version*) echo dead 1.0; exit 0;; esac\nexit 1",
    );

    let mut config = fixture.config(&fixture.recording_runner(0));
    config.backend.runtime = runtime;

    let err = Harness::new(config, &registry).run(std::future::pending()).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::BackendStartup, "{err}");
    assert_eq!(err.exit_code(), 69);
    assert!(!fixture.out().exists(), "runner must not start");
    assert_restored(&registry);
}

#[tokio::test]
async fn missing_seam_fails_before_backend_starts() {
    let fixture = Fixture::new();
    let registry = partial_registry();

    let config = fixture.config(&fixture.recording_runner(0));
    let err = Harness::new(config, &registry).run(std::future::pending()).await.unwrap_err();

    assert!(
        matches!(&err, HarnessError::Seam(wasmstan_seams::SeamError::SeamMissing(SeamName::ServiceRunner))),
        "{err}"
    );
    assert_eq!(err.exit_code(), 70);
    assert!(!registry.is_installed());
    assert!(!fixture.out().exists());
}

#[tokio::test]
async fn missing_toolchain_fails_before_anything_runs() {
    let fixture = Fixture::new();
    let registry = published_registry();

    let mut config = fixture.config(&fixture.recording_runner(0));
    config.toolchain_path = None;

    let err = Harness::new(config, &registry).run(std::future::pending()).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Precondition);
    assert_eq!(err.exit_code(), 78);
    assert!(!registry.is_installed());
}

#[tokio::test]
async fn missing_runner_tears_down_backend() {
    let fixture = Fixture::new();
    let registry = published_registry();

    let config = fixture.config(Path::new("/nonexistent/pytest"));
    let err = Harness::new(config, &registry).run(std::future::pending()).await.unwrap_err();

    assert!(matches!(err, HarnessError::Runner { .. }), "{err}");
    assert_eq!(err.exit_code(), 74);
    assert_restored(&registry);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn interrupt_during_readiness_wait_kills_backend() {
    let fixture = Fixture::new();
    let registry = published_registry();
    let pidfile = fixture.scratch.path().join("backend.pid");
    let runtime = fixture.script(
        "silent-backend",
        &format!("echo $$ > {}\nexec sleep 30", pidfile.display()),
    );

    let mut config = fixture.config(&fixture.recording_runner(0));
    config.backend.runtime = runtime;
    config.backend.version = Some("silent 1.0".to_string());
    config.backend.readiness.timeout_ms = 20_000;

    let started = std::time::Instant::now();
    let err = Harness::new(config, &registry)
        .run(tokio::time::sleep(Duration::from_millis(500)))
        .await
        .unwrap_err();

    assert!(
        matches!(err, HarnessError::Interrupted { phase: "starting the backend" }),
        "{err}"
    );
    assert_eq!(err.exit_code(), 130);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!fixture.out().exists(), "runner must not start");
    assert_restored(&registry);

    let pid = wasmstan_test_utils::read_pid(&pidfile);
    assert!(
        wasmstan_test_utils::wait_for_exit(pid, Duration::from_secs(2)).await,
        "backend {pid} outlived the interrupt"
    );
}

#[tokio::test]
async fn interrupt_during_preconditions_installs_nothing() {
    let fixture = Fixture::new();
    let registry = published_registry();
    let hanging_compiler = fixture.script("hanging-em++", "exec sleep 30");

    let config = fixture
        .config(&fixture.recording_runner(0))
        .with_compiler(hanging_compiler.to_string_lossy());

    let err = Harness::new(config, &registry)
        .run(tokio::time::sleep(Duration::from_millis(300)))
        .await
        .unwrap_err();

    assert!(
        matches!(err, HarnessError::Interrupted { phase: "checking preconditions" }),
        "{err}"
    );
    assert_eq!(err.exit_code(), 130);
    assert!(!registry.is_installed());
    assert!(!fixture.out().exists());
}
