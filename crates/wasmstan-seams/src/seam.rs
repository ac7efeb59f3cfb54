//! Seam definitions
//!
//! Each seam is one capability a collaborator library exposes and the harness
//! may rebind: how models are named, how a service is started, how a client
//! finds its server, and which routes a service registers.

use crate::error::SeamError;
use async_trait::async_trait;
use std::fmt::{self, Debug, Display, Formatter};
use std::path::PathBuf;
use wasmstan_backend::Endpoint;
use wasmstan_identity::ModelIdentity;

/// Names of the rebindable seams
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SeamName {
    /// Program source -> model identity
    ModelNaming,
    /// Start/stop a listening service
    ServiceRunner,
    /// Locate the server a client talks to
    ClientLocator,
    /// Register a service's routes
    RouteSetup,
}

impl SeamName {
    /// All seams, in declaration order
    pub const ALL: [SeamName; 4] = [
        Self::ModelNaming,
        Self::ServiceRunner,
        Self::ClientLocator,
        Self::RouteSetup,
    ];

    /// Stable lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ModelNaming => "model-naming",
            Self::ServiceRunner => "service-runner",
            Self::ClientLocator => "client-locator",
            Self::RouteSetup => "route-setup",
        }
    }
}

impl Display for SeamName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity seam
pub trait ModelNamer: Send + Sync + Debug {
    /// Identity for `program_code`
    fn model_name(&self, program_code: &str) -> ModelIdentity;
}

/// Server-lifecycle seam
#[async_trait]
pub trait ServiceRunner: Send + Sync + Debug {
    /// Start serving on `host:port`, returning where the service actually listens
    async fn start(&self, host: &str, port: u16) -> Result<Endpoint, SeamError>;

    /// Stop serving; stopping a stopped service is a no-op
    async fn stop(&self) -> Result<(), SeamError>;
}

/// Client-connection seam
pub trait ClientLocator: Send + Sync + Debug {
    /// Server a new client connection should use
    fn locate(&self) -> Result<Endpoint, SeamError>;
}

/// Route-registration seam
pub trait RouteSetup: Send + Sync + Debug {
    /// Add this service's routes to `routes`
    fn setup_routes(&self, routes: &mut RouteTable);
}

/// HTTP method of a registered route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
}

/// One registered route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Handler route
    Handler {
        /// HTTP method
        method: Method,
        /// Path pattern, `{name}` marks a parameter
        pattern: String,
    },
    /// Directory served as static files
    Static {
        /// URL prefix
        prefix: String,
        /// Directory on disk
        dir: PathBuf,
    },
}

/// Ordered list of registered routes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a GET handler
    pub fn get(&mut self, pattern: impl Into<String>) -> &mut Self {
        self.routes.push(Route::Handler {
            method: Method::Get,
            pattern: pattern.into(),
        });
        self
    }

    /// Register a POST handler
    pub fn post(&mut self, pattern: impl Into<String>) -> &mut Self {
        self.routes.push(Route::Handler {
            method: Method::Post,
            pattern: pattern.into(),
        });
        self
    }

    /// Serve `dir` under `prefix`
    pub fn add_static(&mut self, prefix: impl Into<String>, dir: impl Into<PathBuf>) -> &mut Self {
        self.routes.push(Route::Static {
            prefix: prefix.into(),
            dir: dir.into(),
        });
        self
    }

    /// Registered routes in order
    #[inline]
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Number of routes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether nothing is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Whether a route with this pattern or static prefix exists
    #[must_use]
    pub fn contains(&self, pattern: &str) -> bool {
        self.routes.iter().any(|route| match route {
            Route::Handler { pattern: p, .. } => p == pattern,
            Route::Static { prefix, .. } => prefix == pattern,
        })
    }
}
