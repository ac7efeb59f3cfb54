//! Harness bindings
//!
//! The implementations [`crate::install`] swaps in: content-addressed model
//! naming, a service runner backed by the [`Supervisor`], a client locator
//! reading the [`EndpointRegistry`], and a route setup that adds the static
//! client UI on top of the original routes.

use crate::error::SeamError;
use crate::seam::{ClientLocator, ModelNamer, RouteSetup, RouteTable, ServiceRunner};
use crate::substitution::Substitutions;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use wasmstan_backend::{BackendProcess, Endpoint, EndpointRegistry, Supervisor};
use wasmstan_identity::{resolve, ModelIdentity};

/// URL prefix the client UI is served under
pub const STATIC_PREFIX: &str = "/static";

/// Names models by hashing source and backend version
#[derive(Debug, Clone)]
pub struct ContentAddressedNamer {
    backend_version: Vec<u8>,
}

impl ContentAddressedNamer {
    /// Create namer for the backend identified by `backend_version`
    #[inline]
    #[must_use]
    pub fn new(backend_version: impl Into<Vec<u8>>) -> Self {
        Self {
            backend_version: backend_version.into(),
        }
    }
}

impl ModelNamer for ContentAddressedNamer {
    fn model_name(&self, program_code: &str) -> ModelIdentity {
        resolve(program_code.as_bytes(), &self.backend_version)
    }
}

/// Service runner that supervises the backend process
#[derive(Debug)]
pub struct SupervisedRunner {
    supervisor: Supervisor,
    process: Mutex<Option<BackendProcess>>,
}

impl SupervisedRunner {
    /// Create runner around `supervisor`
    #[inline]
    #[must_use]
    pub fn new(supervisor: Supervisor) -> Self {
        Self {
            supervisor,
            process: Mutex::new(None),
        }
    }

    /// Endpoint of the running backend, if any
    pub async fn endpoint(&self) -> Option<Endpoint> {
        self.process.lock().await.as_ref().map(|p| p.endpoint().clone())
    }

    /// Whether a backend is running
    pub async fn is_running(&self) -> bool {
        match self.process.lock().await.as_mut() {
            Some(process) => process.is_alive(),
            None => false,
        }
    }
}

#[async_trait]
impl ServiceRunner for SupervisedRunner {
    async fn start(&self, host: &str, port: u16) -> Result<Endpoint, SeamError> {
        let mut slot = self.process.lock().await;
        if let Some(running) = slot.as_mut() {
            if running.is_alive() {
                return Err(SeamError::AlreadyRunning(running.endpoint().clone()));
            }
        }

        let process = self.supervisor.start(host, port).await?;
        let endpoint = process.endpoint().clone();
        *slot = Some(process);
        Ok(endpoint)
    }

    async fn stop(&self) -> Result<(), SeamError> {
        let taken = self.process.lock().await.take();
        if let Some(mut process) = taken {
            self.supervisor.terminate(&mut process).await;
        }
        Ok(())
    }
}

/// Client locator reading the endpoint registry
#[derive(Debug, Clone)]
pub struct RegistryLocator {
    registry: EndpointRegistry,
}

impl RegistryLocator {
    /// Create locator over `registry`
    #[inline]
    #[must_use]
    pub fn new(registry: EndpointRegistry) -> Self {
        Self { registry }
    }
}

impl ClientLocator for RegistryLocator {
    fn locate(&self) -> Result<Endpoint, SeamError> {
        Ok(self.registry.get())
    }
}

/// Original routes plus a static directory
#[derive(Debug)]
pub struct StaticClientRoutes {
    inner: Arc<dyn RouteSetup>,
    prefix: String,
    dir: PathBuf,
}

impl StaticClientRoutes {
    /// Serve `dir` under [`STATIC_PREFIX`] after `inner`'s routes
    #[must_use]
    pub fn new(inner: Arc<dyn RouteSetup>, dir: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            prefix: STATIC_PREFIX.to_string(),
            dir: dir.into(),
        }
    }
}

impl RouteSetup for StaticClientRoutes {
    fn setup_routes(&self, routes: &mut RouteTable) {
        self.inner.setup_routes(routes);
        routes.add_static(self.prefix.clone(), self.dir.clone());
    }
}

/// Everything the harness rebinds for one run
#[derive(Debug)]
pub struct HarnessSeams {
    /// Identity seam
    pub namer: Arc<ContentAddressedNamer>,
    /// Server-lifecycle seam
    pub runner: Arc<SupervisedRunner>,
    /// Client-connection seam
    pub locator: Arc<RegistryLocator>,
    /// Directory served as the client UI, if any
    pub client_dir: Option<PathBuf>,
}

impl HarnessSeams {
    /// Bindings for a backend run by `supervisor` reporting `backend_version`
    #[must_use]
    pub fn new(supervisor: Supervisor, backend_version: impl Into<Vec<u8>>) -> Self {
        let registry = supervisor.registry().clone();
        Self {
            namer: Arc::new(ContentAddressedNamer::new(backend_version)),
            runner: Arc::new(SupervisedRunner::new(supervisor)),
            locator: Arc::new(RegistryLocator::new(registry)),
            client_dir: None,
        }
    }

    /// Also serve `dir` as the client UI
    #[inline]
    #[must_use]
    pub fn with_client_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.client_dir = Some(dir.into());
        self
    }

    /// Substitution request for [`crate::install`]
    #[must_use]
    pub fn substitutions(&self) -> Substitutions {
        let substitutions = Substitutions::new()
            .model_namer(self.namer.clone())
            .service_runner(self.runner.clone())
            .client_locator(self.locator.clone());

        match self.client_dir.clone() {
            Some(dir) => substitutions.wrap_route_setup(move |original| {
                Arc::new(StaticClientRoutes::new(original, dir))
            }),
            None => substitutions,
        }
    }
}
