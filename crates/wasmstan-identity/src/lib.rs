//! wasmstan Identity
//!
//! Deterministic model identities for the substitute compilation backend.
//!
//! # Core Concepts
//!
//! - [`resolve`]: `(source, backend version) -> models/<16 hex>`
//! - [`ModelIdentity`]: opaque token compared by equality or prefix
//! - [`PrefixIdentity`]: non-injective stand-in equal to any `models/...` string
//!
//! # Example
//!
//! ```rust
//! use wasmstan_identity::resolve;
//!
//! let name = resolve(b"data { int n; }", b"v1.2.3");
//! assert!(name.as_str().starts_with("models/"));
//! assert_eq!(name, resolve(b"data { int n; }", b"v1.2.3"));
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod identity;
mod prefix;

pub use identity::{resolve, IdentityError, ModelIdentity, ID_HEX_LEN, MODEL_NAMESPACE};
pub use prefix::{PrefixIdentity, PLACEHOLDER_ID};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
