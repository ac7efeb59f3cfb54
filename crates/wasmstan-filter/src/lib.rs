//! wasmstan Filter
//!
//! Test selection for upstream suites run against the wasmstan backend.
//!
//! # Core Concepts
//!
//! - [`Library`]: which collaborator's suite is being run
//! - [`ExclusionList`]: fixed, reasoned list of tests the backend cannot pass
//! - [`build_filter`]: the `-k` expression selecting everything else
//!
//! # Example
//!
//! ```rust
//! use wasmstan_filter::{build_filter, Library};
//!
//! let filter = build_filter(Library::Pystan);
//! assert_eq!(filter.to_string(), "not test_fit_cache and not test_nan_inf");
//! assert!(filter.matches("test_basic"));
//! assert!(!filter.matches("test_fit_cache_hit"));
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod error;
mod exclusion;
mod expression;
mod library;

pub use error::FilterError;
pub use exclusion::{Exclusion, ExclusionList, ExclusionReason};
pub use expression::{build_filter, FilterExpression};
pub use library::Library;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
