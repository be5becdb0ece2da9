//! Host composition root.
//!
//! Startup runs in two hooks, enforced by the types:
//! [`PluginHost::configure_extensibility`] scans, loads and registers every
//! bundle, then [`ExtensibleHost::configure_request_pipeline`] freezes the part
//! registry and the composed resource chain for the request pipeline.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::plugins::{
    AmbientResolver, ApplicationPart, Bundle, BundleLoader, BundleState, DirectoryProvider,
    ExtensibilityRegistrar, HandleId, HostAmbientResolver, ModuleHandle, ModuleLoader,
    PartRegistry, PluginScanner, RegistrationError, ResourceChain, ResourceProvider,
};

/// Terminal state of one discovered bundle
#[derive(Debug, Clone, Serialize)]
pub struct BundleOutcome {
    pub bundle: Bundle,
    pub state: BundleState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<HandleId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Startup diagnostics, one outcome per bundle in discovery order
#[derive(Debug, Clone, Serialize)]
pub struct StartupReport {
    pub started_at: DateTime<Utc>,
    pub scan_root: PathBuf,
    pub outcomes: Vec<BundleOutcome>,
}

impl StartupReport {
    pub fn registered(&self) -> impl Iterator<Item = &BundleOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.state == BundleState::Registered)
    }

    pub fn failed(&self) -> impl Iterator<Item = &BundleOutcome> {
        self.outcomes.iter().filter(|o| o.state == BundleState::Failed)
    }
}

/// Host before any plugin has been touched
pub struct PluginHost {
    config: Config,
    loader: BundleLoader,
    static_parts: Vec<ApplicationPart>,
}

impl PluginHost {
    /// Build a host whose ambient layer comes from the config
    ///
    /// # Errors
    /// Returns an error if the scan directory cannot be determined.
    pub fn new(config: Config, loader: Box<dyn ModuleLoader>) -> Result<Self> {
        let scan_root = config.plugins.scan_root()?;
        let ambient = HostAmbientResolver::new(
            config.plugins.ambient_search_dirs(&scan_root),
            config.plugins.extension.clone(),
            config.plugins.system_search,
        );
        Ok(Self::with_ambient(config, loader, Arc::new(ambient)))
    }

    #[must_use]
    pub fn with_ambient(
        config: Config,
        loader: Box<dyn ModuleLoader>,
        ambient: Arc<dyn AmbientResolver>,
    ) -> Self {
        Self {
            config,
            loader: BundleLoader::new(loader, ambient),
            static_parts: Vec::new(),
        }
    }

    /// Register a part compiled into the host. Static parts precede plugins.
    #[must_use]
    pub fn with_static_part(mut self, part: ApplicationPart) -> Self {
        self.static_parts.push(part);
        self
    }

    /// Scan, load and register every plugin bundle.
    ///
    /// Bundles that fail to load are recorded and skipped.
    ///
    /// # Errors
    /// Fails if the plugin directory cannot be read or the registrar hits an
    /// invariant violation. A host with no working plugins still succeeds.
    pub fn configure_extensibility(self) -> Result<ExtensibleHost> {
        let started_at = Utc::now();
        let scan_root = self.config.plugins.scan_root()?;
        let scanner = PluginScanner::from_config(&self.config.plugins)
            .context("Invalid plugin naming convention")?;

        let paths = scanner
            .scan(&scan_root)
            .context("Cannot determine the plugin set")?;
        info!(
            "Found {} plugin module(s) in {}",
            paths.len(),
            scan_root.display()
        );

        let web_root = self.config.resources.web_root_dir()?;
        let mut registrar = ExtensibilityRegistrar::new(
            Box::new(DirectoryProvider::new("host", web_root)),
            self.config.resources.shadowing,
            self.config.resources.embedded_root.clone(),
        );

        for part in self.static_parts {
            registrar.add_static_part(part);
        }

        let mut outcomes = Vec::with_capacity(paths.len());
        for path in paths {
            let kind = scanner.classify(&path);
            let Some(bundle) = Bundle::from_module(path.clone(), kind) else {
                warn!("Ignoring {}: not a usable module path", path.display());
                continue;
            };
            outcomes.push(load_and_register(&self.loader, &mut registrar, bundle)?);
        }

        let report = StartupReport {
            started_at,
            scan_root,
            outcomes,
        };
        info!(
            "Plugin startup finished: {} registered, {} failed",
            report.registered().count(),
            report.failed().count()
        );

        Ok(ExtensibleHost { registrar, report })
    }
}

fn load_and_register(
    loader: &BundleLoader,
    registrar: &mut ExtensibilityRegistrar,
    bundle: Bundle,
) -> Result<BundleOutcome> {
    let name = bundle.name().to_string();
    let mut state = BundleState::Discovered;
    state.advance(&name, BundleState::Classified)?;
    debug!("Classified {} as {}", name, bundle.kind());
    state.advance(&name, BundleState::Loading)?;

    let handle = match loader.load(&bundle) {
        Ok(handle) => Arc::new(handle),
        Err(e) => {
            warn!("Skipping plugin {}: {}", bundle.module().display(), e);
            state.advance(&name, BundleState::Failed)?;
            return Ok(BundleOutcome {
                bundle,
                state,
                handle: None,
                error: Some(e.to_string()),
            });
        }
    };
    state.advance(&name, BundleState::Loaded)?;

    register(registrar, &handle)?;
    state.advance(&name, BundleState::Registered)?;

    Ok(BundleOutcome {
        bundle,
        state,
        handle: Some(handle.id()),
        error: None,
    })
}

fn register(
    registrar: &mut ExtensibilityRegistrar,
    handle: &Arc<ModuleHandle>,
) -> Result<(), RegistrationError> {
    if matches!(handle.as_ref(), ModuleHandle::Code(_)) {
        registrar.register_part(handle)?;
    }
    if handle.has_resources() {
        registrar.register_resources(handle)?;
    }
    Ok(())
}

/// Host with every plugin registered, before the request pipeline is built
#[derive(Debug)]
pub struct ExtensibleHost {
    registrar: ExtensibilityRegistrar,
    report: StartupReport,
}

impl ExtensibleHost {
    #[must_use]
    pub fn report(&self) -> &StartupReport {
        &self.report
    }

    /// Freeze the registries and hand them to the request pipeline
    #[must_use]
    pub fn configure_request_pipeline(self) -> ComposedHost {
        let registries = self.registrar.finish();
        info!(
            "Request pipeline gets {} part(s) and {} resource provider(s)",
            registries.parts.len(),
            registries.resources.len()
        );

        ComposedHost {
            parts: registries.parts,
            resources: registries.resources,
            modules: registries.modules,
            report: self.report,
        }
    }
}

/// Fully composed host: the immutable registries the rest of the application
/// consumes
#[derive(Debug)]
pub struct ComposedHost {
    parts: PartRegistry,
    resources: ResourceChain,
    modules: Vec<Arc<ModuleHandle>>,
    report: StartupReport,
}

impl ComposedHost {
    #[must_use]
    pub fn parts(&self) -> &PartRegistry {
        &self.parts
    }

    /// The single composed provider for static file serving
    #[must_use]
    pub fn resources(&self) -> &ResourceChain {
        &self.resources
    }

    #[must_use]
    pub fn modules(&self) -> &[Arc<ModuleHandle>] {
        &self.modules
    }

    #[must_use]
    pub fn report(&self) -> &StartupReport {
        &self.report
    }

    #[must_use]
    pub fn lookup_resource(&self, path: &str) -> Option<Vec<u8>> {
        self.resources.lookup(path)
    }
}
