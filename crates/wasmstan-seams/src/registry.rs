//! Seam registry
//!
//! Provides [`SeamRegistry`], the table of current seam bindings.
//! Collaborators publish their own implementations; consumers look bindings
//! up at call time, so a later [`crate::install`] is observed everywhere.
//! [`SeamRegistry::global`] is the process-wide instance; separate instances
//! can be passed around explicitly instead.

use crate::error::SeamError;
use crate::seam::{ClientLocator, ModelNamer, RouteSetup, RouteTable, SeamName, ServiceRunner};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;
use wasmstan_backend::Endpoint;
use wasmstan_identity::ModelIdentity;

static GLOBAL: Lazy<SeamRegistry> = Lazy::new(SeamRegistry::new);

#[derive(Debug, Default)]
pub(crate) struct Bindings {
    pub(crate) model_namer: Option<Arc<dyn ModelNamer>>,
    pub(crate) service_runner: Option<Arc<dyn ServiceRunner>>,
    pub(crate) client_locator: Option<Arc<dyn ClientLocator>>,
    pub(crate) route_setup: Option<Arc<dyn RouteSetup>>,
    pub(crate) installed: bool,
}

impl Bindings {
    pub(crate) fn contains(&self, seam: SeamName) -> bool {
        match seam {
            SeamName::ModelNaming => self.model_namer.is_some(),
            SeamName::ServiceRunner => self.service_runner.is_some(),
            SeamName::ClientLocator => self.client_locator.is_some(),
            SeamName::RouteSetup => self.route_setup.is_some(),
        }
    }
}

/// Current binding of every seam
#[derive(Debug, Default)]
pub struct SeamRegistry {
    pub(crate) bindings: RwLock<Bindings>,
}

impl SeamRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry
    #[inline]
    #[must_use]
    pub fn global() -> &'static SeamRegistry {
        &GLOBAL
    }

    /// Publish the collaborator's model naming
    pub fn publish_model_namer(&self, namer: Arc<dyn ModelNamer>) {
        self.bindings.write().model_namer = Some(namer);
    }

    /// Publish the collaborator's service runner
    pub fn publish_service_runner(&self, runner: Arc<dyn ServiceRunner>) {
        self.bindings.write().service_runner = Some(runner);
    }

    /// Publish the collaborator's client locator
    pub fn publish_client_locator(&self, locator: Arc<dyn ClientLocator>) {
        self.bindings.write().client_locator = Some(locator);
    }

    /// Publish the collaborator's route setup
    pub fn publish_route_setup(&self, setup: Arc<dyn RouteSetup>) {
        self.bindings.write().route_setup = Some(setup);
    }

    /// Check if a seam is published
    #[must_use]
    pub fn contains(&self, seam: SeamName) -> bool {
        self.bindings.read().contains(seam)
    }

    /// Published seams
    #[must_use]
    pub fn names(&self) -> Vec<SeamName> {
        let bindings = self.bindings.read();
        SeamName::ALL.into_iter().filter(|s| bindings.contains(*s)).collect()
    }

    /// Whether harness substitutions are currently installed
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.bindings.read().installed
    }

    /// Current model naming binding
    ///
    /// # Errors
    /// [`SeamError::SeamMissing`] if nothing is published
    pub fn model_namer(&self) -> Result<Arc<dyn ModelNamer>, SeamError> {
        self.bindings
            .read()
            .model_namer
            .clone()
            .ok_or(SeamError::SeamMissing(SeamName::ModelNaming))
    }

    /// Current service runner binding
    ///
    /// # Errors
    /// [`SeamError::SeamMissing`] if nothing is published
    pub fn service_runner(&self) -> Result<Arc<dyn ServiceRunner>, SeamError> {
        self.bindings
            .read()
            .service_runner
            .clone()
            .ok_or(SeamError::SeamMissing(SeamName::ServiceRunner))
    }

    /// Current client locator binding
    ///
    /// # Errors
    /// [`SeamError::SeamMissing`] if nothing is published
    pub fn client_locator(&self) -> Result<Arc<dyn ClientLocator>, SeamError> {
        self.bindings
            .read()
            .client_locator
            .clone()
            .ok_or(SeamError::SeamMissing(SeamName::ClientLocator))
    }

    /// Current route setup binding
    ///
    /// # Errors
    /// [`SeamError::SeamMissing`] if nothing is published
    pub fn route_setup(&self) -> Result<Arc<dyn RouteSetup>, SeamError> {
        self.bindings
            .read()
            .route_setup
            .clone()
            .ok_or(SeamError::SeamMissing(SeamName::RouteSetup))
    }

    /// Name `program_code` through the current binding
    ///
    /// # Errors
    /// [`SeamError::SeamMissing`] if nothing is published
    pub fn model_name(&self, program_code: &str) -> Result<ModelIdentity, SeamError> {
        Ok(self.model_namer()?.model_name(program_code))
    }

    /// Locate the server through the current binding
    ///
    /// # Errors
    /// [`SeamError::SeamMissing`] if nothing is published, or the locator's own error
    pub fn locate(&self) -> Result<Endpoint, SeamError> {
        self.client_locator()?.locate()
    }

    /// Build the route table through the current binding
    ///
    /// # Errors
    /// [`SeamError::SeamMissing`] if nothing is published
    pub fn routes(&self) -> Result<RouteTable, SeamError> {
        let mut table = RouteTable::new();
        self.route_setup()?.setup_routes(&mut table);
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmstan_identity::resolve;

    #[derive(Debug)]
    struct Namer;

    impl ModelNamer for Namer {
        fn model_name(&self, program_code: &str) -> ModelIdentity {
            resolve(program_code.as_bytes(), b"test")
        }
    }

    #[derive(Debug)]
    struct Fixed(Endpoint);

    impl ClientLocator for Fixed {
        fn locate(&self) -> Result<Endpoint, SeamError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn registry_new_empty() {
        let registry = SeamRegistry::new();
        assert!(registry.names().is_empty());
        assert!(!registry.is_installed());
    }

    #[test]
    fn lookup_of_unpublished_seam_fails() {
        let registry = SeamRegistry::new();
        let err = registry.model_name("data {}").unwrap_err();
        assert!(matches!(err, SeamError::SeamMissing(SeamName::ModelNaming)));
        assert!(matches!(
            registry.locate(),
            Err(SeamError::SeamMissing(SeamName::ClientLocator))
        ));
    }

    #[test]
    fn published_seams_are_listed_and_used() {
        let registry = SeamRegistry::new();
        registry.publish_model_namer(Arc::new(Namer));
        registry.publish_client_locator(Arc::new(Fixed(Endpoint::new("h", 1))));

        assert_eq!(registry.names(), vec![SeamName::ModelNaming, SeamName::ClientLocator]);
        assert_eq!(
            registry.model_name("data {}").unwrap(),
            resolve(b"data {}", b"test")
        );
        assert_eq!(registry.locate().unwrap(), Endpoint::new("h", 1));
    }

    #[test]
    fn global_is_a_single_instance() {
        assert!(std::ptr::eq(SeamRegistry::global(), SeamRegistry::global()));
    }
}
