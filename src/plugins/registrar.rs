//! Extensibility registrar.
//!
//! A single-use builder that accumulates parts and resource providers during
//! startup and is consumed once to produce the immutable [`Registries`].

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use super::error::RegistrationError;
use super::loader::ModuleHandle;
use super::parts::{ApplicationPart, PartRegistry};
use super::resources::{EmbeddedProvider, ResourceChain, ResourceProvider, ShadowPolicy};

/// Final, read-only output of startup registration
#[derive(Debug)]
pub struct Registries {
    pub parts: PartRegistry,
    pub resources: ResourceChain,
    /// Keeps every loaded module (and its load context) alive
    pub modules: Vec<Arc<ModuleHandle>>,
}

#[derive(Debug)]
pub struct ExtensibilityRegistrar {
    parts: PartRegistry,
    resources: ResourceChain,
    modules: Vec<Arc<ModuleHandle>>,
    registered_paths: HashSet<PathBuf>,
    embedded_root: String,
}

impl ExtensibilityRegistrar {
    /// Start from the host's own provider. Embedded module resources are
    /// served from under `embedded_root`.
    #[must_use]
    pub fn new(
        host_provider: Box<dyn ResourceProvider>,
        shadowing: ShadowPolicy,
        embedded_root: impl Into<String>,
    ) -> Self {
        Self {
            parts: PartRegistry::new(),
            resources: ResourceChain::new(host_provider, shadowing),
            modules: Vec::new(),
            registered_paths: HashSet::new(),
            embedded_root: embedded_root.into(),
        }
    }

    /// Register a part the host links in itself
    pub fn add_static_part(&mut self, part: ApplicationPart) {
        info!("Registered static part {}", part.name);
        self.parts.push(part);
    }

    /// Append a code module to the part registry
    ///
    /// # Errors
    /// Returns [`RegistrationError::NotACodeModule`] for a resources handle.
    pub fn register_part(&mut self, handle: &Arc<ModuleHandle>) -> Result<(), RegistrationError> {
        let ModuleHandle::Code(module) = handle.as_ref() else {
            return Err(RegistrationError::NotACodeModule(
                handle.bundle().name().to_string(),
            ));
        };

        self.note_module_path(handle);

        let part = ApplicationPart::from_handle(handle);
        info!(
            "Registered part {} ({} route(s)) from {}",
            part.name,
            part.routes.len(),
            module.bundle().module().display()
        );
        self.parts.push(part);
        self.retain(handle);
        Ok(())
    }

    /// Compose a provider for the handle's embedded resources onto the chain,
    /// after everything already in it
    ///
    /// # Errors
    /// Returns [`RegistrationError::NoResources`] for a code module that
    /// embeds nothing.
    pub fn register_resources(
        &mut self,
        handle: &Arc<ModuleHandle>,
    ) -> Result<(), RegistrationError> {
        if !handle.has_resources() {
            return Err(RegistrationError::NoResources(
                handle.bundle().name().to_string(),
            ));
        }

        // A code handle was already noted when its part was registered
        if matches!(handle.as_ref(), ModuleHandle::Resources(_)) {
            self.note_module_path(handle);
        }

        let module = handle.module();
        let provider = EmbeddedProvider::new(
            module.bundle().name(),
            &self.embedded_root,
            &module.image().resources,
        );
        info!(
            "Registered {} resource(s) from {}",
            provider.len(),
            module.bundle().name()
        );

        let chain = std::mem::take(&mut self.resources);
        self.resources = chain.compose(Box::new(provider));
        self.retain(handle);
        Ok(())
    }

    /// Warn when a module file that is already registered comes in again
    fn note_module_path(&mut self, handle: &ModuleHandle) -> bool {
        let path = handle.bundle().module();
        if self.registered_paths.insert(path.to_path_buf()) {
            return false;
        }

        warn!(
            "{} was loaded more than once; each copy is isolated and kept in memory",
            path.display()
        );
        true
    }

    fn retain(&mut self, handle: &Arc<ModuleHandle>) {
        if !self.modules.iter().any(|m| m.id() == handle.id()) {
            self.modules.push(Arc::clone(handle));
        }
    }

    /// Consume the registrar
    #[must_use]
    pub fn finish(self) -> Registries {
        Registries {
            parts: self.parts,
            resources: self.resources,
            modules: self.modules,
        }
    }
}
