// Module loading through isolated contexts:
// - One fresh LoadContext per load call, never shared or reused
// - Native modules opened with libloading, declarations copied out
// - Declared imports resolved bundle-first, then ambient
// - Failures are per-bundle and never abort the caller
use libloading::Symbol;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::api::{Import, ModuleDeclare, ModuleImage, DECLARE_SYMBOL};
use super::bundle::{Bundle, ModuleKind};
use super::context::{AmbientResolver, LoadContext};
use super::error::LoadError;

/// Platform facility that turns a module file into a [`ModuleImage`].
///
/// Every dependency the module needs must be requested through `context`.
pub trait ModuleLoader {
    fn load(&self, path: &Path, context: &mut LoadContext) -> Result<ModuleImage, LoadError>;
}

/// Loads native shared libraries exporting the anvil module declaration
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeModuleLoader;

impl ModuleLoader for NativeModuleLoader {
    fn load(&self, path: &Path, context: &mut LoadContext) -> Result<ModuleImage, LoadError> {
        if !path.is_file() {
            return Err(LoadError::FileNotFound(path.to_path_buf()));
        }

        let image = {
            let library = context.open_library(path)?;

            // Safety: the symbol type matches the exported entry point of the
            // module ABI, and the declaration is copied before the borrow ends.
            unsafe {
                let declare: Symbol<ModuleDeclare> = library.get(DECLARE_SYMBOL).map_err(|e| {
                    LoadError::incompatible(path, format!("no module declaration export: {e}"))
                })?;

                ModuleImage::from_declaration(declare())
                    .map_err(|reason| LoadError::incompatible(path, reason))?
            }
        };

        for import in &image.imports {
            let resolved = match import {
                Import::Managed(request) => context.resolve(request)?,
                Import::Native { name } => context.resolve_native(name)?,
            };
            context.open_library(&resolved.path)?;
        }

        Ok(image)
    }
}

/// Identity of one load. Two loads of the same file get two ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct HandleId(Uuid);

impl HandleId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A successfully loaded module, together with the context that owns it
#[derive(Debug)]
pub struct LoadedModule {
    id: HandleId,
    bundle: Bundle,
    image: ModuleImage,
    context: LoadContext,
}

impl LoadedModule {
    #[must_use]
    pub fn id(&self) -> HandleId {
        self.id
    }

    #[must_use]
    pub fn bundle(&self) -> &Bundle {
        &self.bundle
    }

    #[must_use]
    pub fn image(&self) -> &ModuleImage {
        &self.image
    }

    #[must_use]
    pub fn context(&self) -> &LoadContext {
        &self.context
    }
}

/// Loaded module, tagged by what it contributes
#[derive(Debug)]
pub enum ModuleHandle {
    Code(LoadedModule),
    Resources(LoadedModule),
}

impl ModuleHandle {
    fn new(kind: ModuleKind, module: LoadedModule) -> Self {
        match kind {
            ModuleKind::Code => Self::Code(module),
            ModuleKind::Resources => Self::Resources(module),
        }
    }

    #[must_use]
    pub fn module(&self) -> &LoadedModule {
        match self {
            Self::Code(m) | Self::Resources(m) => m,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ModuleKind {
        match self {
            Self::Code(_) => ModuleKind::Code,
            Self::Resources(_) => ModuleKind::Resources,
        }
    }

    #[must_use]
    pub fn id(&self) -> HandleId {
        self.module().id
    }

    #[must_use]
    pub fn bundle(&self) -> &Bundle {
        &self.module().bundle
    }

    /// Whether this handle should get a resource provider: always for
    /// resources modules, and for code modules that embed resources.
    #[must_use]
    pub fn has_resources(&self) -> bool {
        match self {
            Self::Resources(_) => true,
            Self::Code(m) => !m.image.resources.is_empty(),
        }
    }
}

/// Drives one [`ModuleLoader`] through a fresh [`LoadContext`] per bundle
pub struct BundleLoader {
    loader: Box<dyn ModuleLoader>,
    ambient: Arc<dyn AmbientResolver>,
}

impl BundleLoader {
    #[must_use]
    pub fn new(loader: Box<dyn ModuleLoader>, ambient: Arc<dyn AmbientResolver>) -> Self {
        Self { loader, ambient }
    }

    /// Load a bundle's entry module.
    ///
    /// Loading the same bundle twice gives two independent handles under two
    /// independent contexts.
    ///
    /// # Errors
    /// Returns a [`LoadError`] that only concerns this bundle.
    pub fn load(&self, bundle: &Bundle) -> Result<ModuleHandle, LoadError> {
        if !bundle.module().is_file() {
            return Err(LoadError::FileNotFound(bundle.module().to_path_buf()));
        }

        let mut context = LoadContext::for_bundle(bundle, Arc::clone(&self.ambient))?;
        let image = self.loader.load(bundle.module(), &mut context)?;

        let module = LoadedModule {
            id: HandleId::new(),
            bundle: bundle.clone(),
            image,
            context,
        };
        debug!(
            "Loaded {} ({}) as {}",
            bundle.name(),
            bundle.kind(),
            module.id
        );

        Ok(ModuleHandle::new(bundle.kind(), module))
    }
}

impl fmt::Debug for BundleLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleLoader")
            .field("ambient", &self.ambient)
            .finish_non_exhaustive()
    }
}
