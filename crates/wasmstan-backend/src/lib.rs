//! wasmstan Backend
//!
//! Lifecycle of the out-of-process compilation backend.
//!
//! # Core Concepts
//!
//! - [`Supervisor`]: spawns the backend, waits for readiness, publishes its endpoint
//! - [`BackendProcess`]: the one live child per run; terminate is idempotent
//! - [`EndpointRegistry`]: shared `{host, port}` record read by client seams
//! - [`backend_version`]: version banner fed into model identities
//!
//! # Example
//!
//! ```rust,ignore
//! use wasmstan_backend::{BackendConfig, EndpointRegistry, Supervisor};
//!
//! let registry = EndpointRegistry::new();
//! let supervisor = Supervisor::new(BackendConfig::new().with_root("/opt/wasmstan"), registry.clone());
//!
//! let mut backend = supervisor.start("localhost", 8080).await?;
//! assert_eq!(registry.get().port, backend.port());
//! supervisor.terminate(&mut backend).await;
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod config;
mod endpoint;
mod error;
mod process;
pub mod readiness;
mod version;

pub use config::{BackendConfig, ReadinessConfig};
pub use endpoint::{Endpoint, EndpointRegistry, DEFAULT_HOST, DEFAULT_PORT};
pub use error::BackendError;
pub use process::{BackendProcess, Supervisor};
pub use version::backend_version;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
