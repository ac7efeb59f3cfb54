//! Endpoint registry
//!
//! [`EndpointRegistry`] records where the active backend listens. The
//! supervisor writes it once the backend is confirmed live; client-side seams
//! read it whenever they open a connection.

use parking_lot::RwLock;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Host the upstream service binds by default
pub const DEFAULT_HOST: &str = "localhost";

/// Port the upstream service binds by default
pub const DEFAULT_PORT: u16 = 8080;

/// A `host:port` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Endpoint {
    /// Host name or address
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl Endpoint {
    /// Create new endpoint
    #[inline]
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `http://host:port` followed by `path`
    #[must_use]
    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}:{}{}", self.host, self.port, path)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Default)]
struct Slot {
    endpoint: Endpoint,
    bound: bool,
}

/// Shared `{host, port}` record
///
/// Cheap to clone; clones share the same record. Single writer (the
/// supervisor), many readers.
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    inner: Arc<RwLock<Slot>>,
}

impl EndpointRegistry {
    /// Registry pointing at [`Endpoint::default`] until a backend binds
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pointing at `endpoint` until a backend binds
    #[must_use]
    pub fn with_fallback(endpoint: Endpoint) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Slot {
                endpoint,
                bound: false,
            })),
        }
    }

    /// Record the endpoint a live backend listens on
    pub fn set(&self, host: impl Into<String>, port: u16) {
        let endpoint = Endpoint::new(host, port);
        tracing::debug!(%endpoint, "endpoint registry updated");
        let mut slot = self.inner.write();
        slot.endpoint = endpoint;
        slot.bound = true;
    }

    /// Current endpoint (the fallback if no backend has bound yet)
    #[must_use]
    pub fn get(&self) -> Endpoint {
        self.inner.read().endpoint.clone()
    }

    /// Endpoint of a live backend, if one has bound
    #[must_use]
    pub fn bound(&self) -> Option<Endpoint> {
        let slot = self.inner.read();
        slot.bound.then(|| slot.endpoint.clone())
    }

    /// Forget the bound backend, keeping its endpoint as the fallback
    pub fn clear(&self) {
        self.inner.write().bound = false;
    }
}
