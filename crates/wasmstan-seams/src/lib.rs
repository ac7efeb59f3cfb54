//! wasmstan Seams
//!
//! Capability seams through which the harness rebinds collaborator libraries
//! onto the wasmstan backend without editing them.
//!
//! # Core Concepts
//!
//! - [`SeamRegistry`]: current binding of each seam, looked up at call time
//! - [`install`] / [`uninstall`]: swap harness bindings in, then restore originals
//! - [`HarnessSeams`]: content-addressed naming, supervised runner, registry locator
//! - [`ClientSession`]: a client connection resolved through the locator seam
//!
//! # Example
//!
//! ```rust,ignore
//! use wasmstan_seams::{defaults, install, uninstall, HarnessSeams, SeamRegistry};
//!
//! let registry = SeamRegistry::new();
//! defaults::publish_defaults(&registry);
//!
//! let seams = HarnessSeams::new(supervisor, version);
//! let set = install(&registry, seams.substitutions())?;
//! registry.service_runner()?.start("localhost", 0).await?;
//! // ... run the suite ...
//! registry.service_runner()?.stop().await?;
//! uninstall(&registry, set);
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod adapters;
mod client;
pub mod defaults;
mod error;
mod registry;
mod seam;
mod substitution;

pub use adapters::{
    ContentAddressedNamer, HarnessSeams, RegistryLocator, StaticClientRoutes, SupervisedRunner,
    STATIC_PREFIX,
};
pub use client::{ClientSession, API_PREFIX};
pub use error::SeamError;
pub use registry::SeamRegistry;
pub use seam::{ClientLocator, Method, ModelNamer, Route, RouteSetup, RouteTable, SeamName, ServiceRunner};
pub use substitution::{install, uninstall, Binding, SubstitutionSet, Substitutions, Wrapper};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
