//! Installing and removing harness substitutions
//!
//! [`install`] swaps harness implementations into a [`SeamRegistry`] and
//! returns the displaced originals as a [`SubstitutionSet`]; [`uninstall`]
//! puts them back. Every seam is checked before anything is swapped, so a
//! missing seam leaves the registry untouched.

use crate::error::SeamError;
use crate::registry::{Bindings, SeamRegistry};
use crate::seam::{ClientLocator, ModelNamer, RouteSetup, SeamName, ServiceRunner};
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

/// Builds a replacement from the original binding
pub type Wrapper<T> = Box<dyn FnOnce(Arc<T>) -> Arc<T> + Send>;

/// How a seam is rebound
pub enum Binding<T: ?Sized> {
    /// Discard the original
    Replace(Arc<T>),
    /// Keep the original reachable from the replacement
    Wrap(Wrapper<T>),
}

impl<T: ?Sized> Binding<T> {
    fn apply(self, original: &Arc<T>) -> Arc<T> {
        match self {
            Self::Replace(replacement) => replacement,
            Self::Wrap(wrap) => wrap(Arc::clone(original)),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Replace(_) => "replace",
            Self::Wrap(_) => "wrap",
        }
    }
}

impl<T: ?Sized> Debug for Binding<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Requested rebindings; seams left as `None` keep their current binding
#[derive(Debug, Default)]
pub struct Substitutions {
    model_namer: Option<Binding<dyn ModelNamer>>,
    service_runner: Option<Binding<dyn ServiceRunner>>,
    client_locator: Option<Binding<dyn ClientLocator>>,
    route_setup: Option<Binding<dyn RouteSetup>>,
}

impl Substitutions {
    /// Create empty request
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace model naming
    #[must_use]
    pub fn model_namer(mut self, namer: Arc<dyn ModelNamer>) -> Self {
        self.model_namer = Some(Binding::Replace(namer));
        self
    }

    /// Replace the service runner
    #[must_use]
    pub fn service_runner(mut self, runner: Arc<dyn ServiceRunner>) -> Self {
        self.service_runner = Some(Binding::Replace(runner));
        self
    }

    /// Replace the client locator
    #[must_use]
    pub fn client_locator(mut self, locator: Arc<dyn ClientLocator>) -> Self {
        self.client_locator = Some(Binding::Replace(locator));
        self
    }

    /// Wrap the route setup
    #[must_use]
    pub fn wrap_route_setup<F>(mut self, wrap: F) -> Self
    where
        F: FnOnce(Arc<dyn RouteSetup>) -> Arc<dyn RouteSetup> + Send + 'static,
    {
        self.route_setup = Some(Binding::Wrap(Box::new(wrap)));
        self
    }

    /// Seams this request rebinds
    #[must_use]
    pub fn seams(&self) -> Vec<SeamName> {
        let requested = [
            (SeamName::ModelNaming, self.model_namer.is_some()),
            (SeamName::ServiceRunner, self.service_runner.is_some()),
            (SeamName::ClientLocator, self.client_locator.is_some()),
            (SeamName::RouteSetup, self.route_setup.is_some()),
        ];
        requested
            .into_iter()
            .filter_map(|(seam, present)| present.then_some(seam))
            .collect()
    }
}

/// Originals displaced by [`install`]
#[derive(Debug)]
#[must_use = "dropping a SubstitutionSet leaves the harness bindings installed"]
pub struct SubstitutionSet {
    model_namer: Option<Arc<dyn ModelNamer>>,
    service_runner: Option<Arc<dyn ServiceRunner>>,
    client_locator: Option<Arc<dyn ClientLocator>>,
    route_setup: Option<Arc<dyn RouteSetup>>,
}

impl SubstitutionSet {
    /// Seams currently overridden
    #[must_use]
    pub fn seams(&self) -> Vec<SeamName> {
        let overridden = [
            (SeamName::ModelNaming, self.model_namer.is_some()),
            (SeamName::ServiceRunner, self.service_runner.is_some()),
            (SeamName::ClientLocator, self.client_locator.is_some()),
            (SeamName::RouteSetup, self.route_setup.is_some()),
        ];
        overridden
            .into_iter()
            .filter_map(|(seam, present)| present.then_some(seam))
            .collect()
    }

    /// Original model naming, if overridden
    #[must_use]
    pub fn original_model_namer(&self) -> Option<&Arc<dyn ModelNamer>> {
        self.model_namer.as_ref()
    }

    /// Original service runner, if overridden
    #[must_use]
    pub fn original_service_runner(&self) -> Option<&Arc<dyn ServiceRunner>> {
        self.service_runner.as_ref()
    }

    /// Original client locator, if overridden
    #[must_use]
    pub fn original_client_locator(&self) -> Option<&Arc<dyn ClientLocator>> {
        self.client_locator.as_ref()
    }

    /// Original route setup, if overridden
    #[must_use]
    pub fn original_route_setup(&self) -> Option<&Arc<dyn RouteSetup>> {
        self.route_setup.as_ref()
    }
}

fn swap<T: ?Sized>(
    slot: &mut Option<Arc<T>>,
    binding: Option<Binding<T>>,
) -> Option<Arc<T>> {
    let binding = binding?;
    let original = slot.take()?;
    *slot = Some(binding.apply(&original));
    Some(original)
}

/// Rebind the requested seams in `registry`
///
/// # Errors
/// - [`SeamError::AlreadyInstalled`] if a previous set was not uninstalled
/// - [`SeamError::SeamMissing`] naming the first requested seam the
///   collaborator never published; nothing is swapped in that case
pub fn install(registry: &SeamRegistry, substitutions: Substitutions) -> Result<SubstitutionSet, SeamError> {
    let mut bindings = registry.bindings.write();
    if bindings.installed {
        return Err(SeamError::AlreadyInstalled);
    }

    let requested = substitutions.seams();
    if let Some(missing) = requested.iter().copied().find(|seam| !bindings.contains(*seam)) {
        tracing::error!(seam = %missing, "collaborator does not publish seam");
        return Err(SeamError::SeamMissing(missing));
    }

    let Bindings {
        model_namer,
        service_runner,
        client_locator,
        route_setup,
        installed,
    } = &mut *bindings;

    let set = SubstitutionSet {
        model_namer: swap(model_namer, substitutions.model_namer),
        service_runner: swap(service_runner, substitutions.service_runner),
        client_locator: swap(client_locator, substitutions.client_locator),
        route_setup: swap(route_setup, substitutions.route_setup),
    };
    *installed = true;

    tracing::info!(seams = ?requested, "harness substitutions installed");
    Ok(set)
}

/// Restore the bindings displaced by [`install`]
pub fn uninstall(registry: &SeamRegistry, set: SubstitutionSet) {
    let seams = set.seams();
    let mut bindings = registry.bindings.write();

    if let Some(original) = set.model_namer {
        bindings.model_namer = Some(original);
    }
    if let Some(original) = set.service_runner {
        bindings.service_runner = Some(original);
    }
    if let Some(original) = set.client_locator {
        bindings.client_locator = Some(original);
    }
    if let Some(original) = set.route_setup {
        bindings.route_setup = Some(original);
    }
    bindings.installed = false;

    tracing::info!(?seams, "harness substitutions removed");
}
