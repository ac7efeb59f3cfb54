//! Collaborator-side default bindings
//!
//! What the upstream libraries do on their own when nothing is substituted:
//! a client that always dials one fixed address, a runner that assumes the
//! service is already up, the v1 route table, and a single placeholder model
//! name. A registry seeded with [`publish_defaults`] is what the harness
//! installs over.

use crate::error::SeamError;
use crate::registry::SeamRegistry;
use crate::seam::{ClientLocator, ModelNamer, RouteSetup, RouteTable, ServiceRunner};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use wasmstan_backend::Endpoint;
use wasmstan_identity::ModelIdentity;

/// Names every program after the placeholder model
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderNamer;

impl ModelNamer for PlaceholderNamer {
    fn model_name(&self, _program_code: &str) -> ModelIdentity {
        ModelIdentity::zero()
    }
}

/// Client that always dials the same address
#[derive(Debug, Clone, Default)]
pub struct FixedLocator(pub Endpoint);

impl ClientLocator for FixedLocator {
    fn locate(&self) -> Result<Endpoint, SeamError> {
        Ok(self.0.clone())
    }
}

/// Runner that starts nothing and reports the address it was given
#[derive(Debug, Default)]
pub struct ExternalRunner {
    serving: Mutex<Option<Endpoint>>,
}

impl ExternalRunner {
    /// Address last passed to `start`, until `stop`
    #[must_use]
    pub fn serving(&self) -> Option<Endpoint> {
        self.serving.lock().clone()
    }
}

#[async_trait]
impl ServiceRunner for ExternalRunner {
    async fn start(&self, host: &str, port: u16) -> Result<Endpoint, SeamError> {
        let endpoint = Endpoint::new(host, port);
        *self.serving.lock() = Some(endpoint.clone());
        Ok(endpoint)
    }

    async fn stop(&self) -> Result<(), SeamError> {
        self.serving.lock().take();
        Ok(())
    }
}

/// The compilation service's v1 HTTP routes
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceRoutes;

impl RouteSetup for ServiceRoutes {
    fn setup_routes(&self, routes: &mut RouteTable) {
        routes
            .get("/v1/health")
            .get("/v1/list-models")
            .post("/v1/models/{model_id}/params")
            .post("/v1/models/{model_id}/fits")
            .get("/v1/models/{model_id}/fits/{fit_id}")
            .get("/v1/operations/{operation_id}")
            .get("/v1/models/{model_id}/model.{ext}");
    }
}

/// Publish the collaborator defaults for every seam
pub fn publish_defaults(registry: &SeamRegistry) {
    registry.publish_model_namer(Arc::new(PlaceholderNamer));
    registry.publish_service_runner(Arc::new(ExternalRunner::default()));
    registry.publish_client_locator(Arc::new(FixedLocator::default()));
    registry.publish_route_setup(Arc::new(ServiceRoutes));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seam::SeamName;

    #[test]
    fn placeholder_namer_ignores_source() {
        let a = PlaceholderNamer.model_name("data { int n; }");
        let b = PlaceholderNamer.model_name("parameters { real y; }");
        assert_eq!(a, b);
        assert_eq!(a, "models/0000000000000000");
    }

    #[tokio::test]
    async fn external_runner_tracks_address() {
        let runner = ExternalRunner::default();
        let endpoint = runner.start("localhost", 8080).await.unwrap();
        assert_eq!(runner.serving(), Some(endpoint));

        runner.stop().await.unwrap();
        runner.stop().await.unwrap();
        assert!(runner.serving().is_none());
    }

    #[test]
    fn defaults_publish_every_seam() {
        let registry = SeamRegistry::new();
        publish_defaults(&registry);

        assert_eq!(registry.names(), SeamName::ALL.to_vec());
        assert_eq!(registry.locate().unwrap(), Endpoint::new("localhost", 8080));
        assert!(registry.routes().unwrap().contains("/v1/health"));
    }
}
