//! wasmstan Harness
//!
//! Runs the httpstan or pystan test suite against a locally spawned wasmstan
//! backend instead of the upstream compilation service.
//!
//! # Core Concepts
//!
//! - [`HarnessConfig`]: layered configuration (defaults, TOML, environment, flags)
//! - [`preconditions::check`]: toolchain and backend checks before any spawn
//! - [`Harness::run`]: install seams, start backend, run the filtered suite, tear down
//! - [`HarnessError::category`]: infrastructure failures kept apart from test failures
//! - [`ShutdownSignals`]: SIGINT/SIGTERM observed for the whole run
//!
//! # Example
//!
//! ```rust,ignore
//! use wasmstan_harness::{Harness, HarnessConfig, ShutdownSignals};
//!
//! let config = HarnessConfig::new().apply_env()?.with_library_dir("../httpstan");
//! let signals = ShutdownSignals::register()?;
//! let summary = Harness::global(config).run(signals.recv()).await?;
//! std::process::exit(summary.outcome.exit_code());
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod config;
mod error;
pub mod preconditions;
mod run;
mod signals;

pub use config::{HarnessConfig, RunnerConfig, DEFAULT_COMPILER, DEFAULT_TOOLCHAIN_VAR};
pub use error::{ErrorCategory, HarnessError, INTERRUPTED_EXIT_CODE};
pub use run::{env, Harness, HarnessOutcome, RunSummary};
pub use signals::ShutdownSignals;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
