//! Harness configuration
//!
//! Layered in order: defaults, an optional TOML file, environment variables,
//! then command-line flags (applied by the binary through the `with_*`
//! builders).

use crate::error::HarnessError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use wasmstan_backend::BackendConfig;
use wasmstan_filter::Library;

/// Default variable naming the compilation toolchain
pub const DEFAULT_TOOLCHAIN_VAR: &str = "CMDSTAN_PATH";

/// Default WebAssembly compiler driver
pub const DEFAULT_COMPILER: &str = "em++";

/// External test runner invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Runner executable
    pub program: String,
    /// Arguments placed before the selection filter
    pub args: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: "pytest".to_string(),
            args: Vec::new(),
        }
    }
}

/// Full configuration of one harness run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Library under test; detected from `library_dir` when unset
    pub library: Option<Library>,
    /// Library checkout the runner executes in
    pub library_dir: PathBuf,
    /// Name of the variable locating the compilation toolchain
    pub toolchain_var: String,
    /// Value of `toolchain_var`, filled from the environment
    pub toolchain_path: Option<PathBuf>,
    /// WebAssembly compiler that must be on the search path
    pub compiler: String,
    /// Test runner
    pub runner: RunnerConfig,
    /// Backend process
    pub backend: BackendConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            library: None,
            library_dir: PathBuf::from("."),
            toolchain_var: DEFAULT_TOOLCHAIN_VAR.to_string(),
            toolchain_path: None,
            compiler: DEFAULT_COMPILER.to_string(),
            runner: RunnerConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a TOML file; missing keys take their defaults
    ///
    /// # Errors
    /// [`HarnessError::Config`] if the file cannot be read or parsed
    pub fn from_file(path: &Path) -> Result<Self, HarnessError> {
        let text = std::fs::read_to_string(path).map_err(|e| HarnessError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml(&text).map_err(|message| HarnessError::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    fn from_toml(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    /// Overlay values from the process environment
    ///
    /// # Errors
    /// See [`HarnessConfig::apply_env_from`]
    pub fn apply_env(self) -> Result<Self, HarnessError> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Overlay values read through `lookup`
    ///
    /// Reads the toolchain variable plus `WASMSTAN_LIBRARY`,
    /// `WASMSTAN_LIBRARY_DIR`, `WASMSTAN_BACKEND_ROOT`, `WASMSTAN_RUNTIME`,
    /// `WASMSTAN_HOST`, `WASMSTAN_PORT`, `WASMSTAN_RUNNER` and
    /// `WASMSTAN_BACKEND_DEBUG`.
    ///
    /// # Errors
    /// [`HarnessError::Config`] for an unparsable library name or port
    pub fn apply_env_from<F>(mut self, lookup: F) -> Result<Self, HarnessError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let invalid = |var: &str, message: String| HarnessError::Config {
            path: PathBuf::from(format!("${var}")),
            message,
        };

        if let Some(path) = lookup(&self.toolchain_var) {
            self.toolchain_path = Some(PathBuf::from(path));
        }
        if let Some(name) = lookup("WASMSTAN_LIBRARY") {
            let library = name
                .parse()
                .map_err(|e: wasmstan_filter::FilterError| invalid("WASMSTAN_LIBRARY", e.to_string()))?;
            self.library = Some(library);
        }
        if let Some(dir) = lookup("WASMSTAN_LIBRARY_DIR") {
            self.library_dir = PathBuf::from(dir);
        }
        if let Some(root) = lookup("WASMSTAN_BACKEND_ROOT") {
            self.backend.root = PathBuf::from(root);
        }
        if let Some(runtime) = lookup("WASMSTAN_RUNTIME") {
            self.backend.runtime = PathBuf::from(runtime);
        }
        if let Some(host) = lookup("WASMSTAN_HOST") {
            self.backend.host = host;
        }
        if let Some(port) = lookup("WASMSTAN_PORT") {
            self.backend.port = port
                .parse()
                .map_err(|e: std::num::ParseIntError| invalid("WASMSTAN_PORT", e.to_string()))?;
        }
        if let Some(program) = lookup("WASMSTAN_RUNNER") {
            self.runner.program = program;
        }
        if let Some(flag) = lookup("WASMSTAN_BACKEND_DEBUG") {
            self.backend.inherit_output = !matches!(flag.as_str(), "" | "0" | "false");
        }
        Ok(self)
    }

    /// With library under test
    #[inline]
    #[must_use]
    pub fn with_library(mut self, library: Library) -> Self {
        self.library = Some(library);
        self
    }

    /// With library checkout directory
    #[inline]
    #[must_use]
    pub fn with_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.library_dir = dir.into();
        self
    }

    /// With toolchain location
    #[inline]
    #[must_use]
    pub fn with_toolchain_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.toolchain_path = Some(path.into());
        self
    }

    /// With compiler driver
    #[inline]
    #[must_use]
    pub fn with_compiler(mut self, compiler: impl Into<String>) -> Self {
        self.compiler = compiler.into();
        self
    }

    /// With runner program and leading arguments
    #[must_use]
    pub fn with_runner<I, S>(mut self, program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runner = RunnerConfig {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        };
        self
    }

    /// With backend configuration
    #[inline]
    #[must_use]
    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_node_invocation() {
        let config = HarnessConfig::new();
        assert_eq!(config.toolchain_var, "CMDSTAN_PATH");
        assert_eq!(config.compiler, "em++");
        assert_eq!(config.runner.program, "pytest");
        assert_eq!(config.backend.port, 8080);
        assert!(config.library.is_none());
    }

    #[test]
    fn toml_overrides_nested_values() {
        let config = HarnessConfig::from_toml(
            r#"
            library = "pystan"
            compiler = "clang++"

            [runner]
            program = "python"
            args = ["-m", "pytest", "-x"]

            [backend]
            root = "/opt/wasmstan"
            port = 0

            [backend.readiness]
            timeout_ms = 2500
            "#,
        )
        .unwrap();

        assert_eq!(config.library, Some(Library::Pystan));
        assert_eq!(config.compiler, "clang++");
        assert_eq!(config.runner.args, ["-m", "pytest", "-x"]);
        assert_eq!(config.backend.root, PathBuf::from("/opt/wasmstan"));
        assert_eq!(config.backend.port, 0);
        assert_eq!(config.backend.readiness.timeout_ms, 2500);
        assert_eq!(config.backend.readiness.poll_interval_ms, 100);
        assert_eq!(config.backend.host, "localhost");
    }

    #[test]
    fn bad_toml_reports_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harness.toml");
        std::fs::write(&path, "library = 3").unwrap();

        let err = HarnessConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, HarnessError::Config { path: p, .. } if p == path));
    }

    #[test]
    fn environment_layer() {
        let config = HarnessConfig::new()
            .apply_env_from(env(&[
                ("CMDSTAN_PATH", "/opt/cmdstan"),
                ("WASMSTAN_LIBRARY", "httpstan"),
                ("WASMSTAN_PORT", "9191"),
                ("WASMSTAN_BACKEND_DEBUG", "1"),
            ]))
            .unwrap();

        assert_eq!(config.toolchain_path, Some(PathBuf::from("/opt/cmdstan")));
        assert_eq!(config.library, Some(Library::Httpstan));
        assert_eq!(config.backend.port, 9191);
        assert!(config.backend.inherit_output);
    }

    #[test]
    fn environment_rejects_bad_port() {
        let err = HarnessConfig::new()
            .apply_env_from(env(&[("WASMSTAN_PORT", "eighty")]))
            .unwrap_err();
        assert_eq!(err.exit_code(), 78);
    }

    #[test]
    fn custom_toolchain_var_is_honoured() {
        let mut config = HarnessConfig::new();
        config.toolchain_var = "STAN_HOME".to_string();
        let config = config
            .apply_env_from(env(&[("CMDSTAN_PATH", "/ignored"), ("STAN_HOME", "/stan")]))
            .unwrap();
        assert_eq!(config.toolchain_path, Some(PathBuf::from("/stan")));
    }
}
