//! Isolated load contexts.
//!
//! A [`LoadContext`] is created for exactly one bundle. Every dependency
//! request raised while loading that bundle goes through it: the bundle's own
//! manifest is consulted first, then the host's ambient layer. Sibling
//! bundles' manifests are never visible here, which is what keeps two plugins
//! shipping different versions of the same library from seeing each other's
//! copy.

use libloading::Library;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::bundle::Bundle;
use super::error::LoadError;
use super::manifest::{native_stem, DependencyManifestResolver, DependencyRequest};

/// The host's default dependency lookup, shared by every context
pub trait AmbientResolver: fmt::Debug + Send + Sync {
    /// Resolve a managed dependency the host itself provides
    fn resolve(&self, request: &DependencyRequest) -> Option<PathBuf>;

    /// Resolve a native library the host itself provides
    fn resolve_native(&self, library: &str) -> Option<PathBuf>;
}

/// Searches the host's shared directories, and for native libraries can hand
/// a bare platform file name to the operating system's loader search.
#[derive(Debug, Clone)]
pub struct HostAmbientResolver {
    dirs: Vec<PathBuf>,
    extension: String,
    system_search: bool,
}

impl HostAmbientResolver {
    #[must_use]
    pub fn new(dirs: Vec<PathBuf>, extension: impl Into<String>, system_search: bool) -> Self {
        Self {
            dirs,
            extension: extension.into(),
            system_search,
        }
    }

    fn find(&self, name: &str) -> Option<PathBuf> {
        let candidates = [
            format!("{name}.{}", self.extension),
            libloading::library_filename(name)
                .to_string_lossy()
                .into_owned(),
        ];

        self.dirs
            .iter()
            .flat_map(|dir| candidates.iter().map(move |c| dir.join(c)))
            .find(|path| path.is_file())
    }
}

impl AmbientResolver for HostAmbientResolver {
    fn resolve(&self, request: &DependencyRequest) -> Option<PathBuf> {
        // The host ships one version of everything; the hint has nothing to pick between
        self.find(&request.name)
    }

    fn resolve_native(&self, library: &str) -> Option<PathBuf> {
        let stem = native_stem(library);
        self.find(library).or_else(|| self.find(stem)).or_else(|| {
            self.system_search
                .then(|| PathBuf::from(libloading::library_filename(stem)))
        })
    }
}

/// Which tier answered a dependency request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionSource {
    Bundle,
    Ambient,
}

/// A dependency request that was answered, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDependency {
    pub name: String,
    pub path: PathBuf,
    pub source: ResolutionSource,
    pub native: bool,
}

/// Loading boundary for one bundle.
///
/// Owns every library opened on the bundle's behalf. Nothing is ever closed:
/// contexts live for the rest of the process.
pub struct LoadContext {
    bundle: String,
    resolver: DependencyManifestResolver,
    ambient: Arc<dyn AmbientResolver>,
    resolved: Vec<ResolvedDependency>,
    libraries: Vec<Library>,
}

impl LoadContext {
    #[must_use]
    pub fn new(
        bundle: impl Into<String>,
        resolver: DependencyManifestResolver,
        ambient: Arc<dyn AmbientResolver>,
    ) -> Self {
        Self {
            bundle: bundle.into(),
            resolver,
            ambient,
            resolved: Vec::new(),
            libraries: Vec::new(),
        }
    }

    /// Build a fresh context from the bundle's manifest
    ///
    /// # Errors
    /// Fails if the bundle's manifest exists but cannot be parsed.
    pub fn for_bundle(bundle: &Bundle, ambient: Arc<dyn AmbientResolver>) -> Result<Self, LoadError> {
        let resolver = DependencyManifestResolver::from_file(bundle.root(), bundle.manifest())?;
        Ok(Self::new(bundle.name(), resolver, ambient))
    }

    #[must_use]
    pub fn bundle(&self) -> &str {
        &self.bundle
    }

    /// Resolve a managed dependency: bundle manifest first, then ambient
    ///
    /// # Errors
    /// Returns [`LoadError::UnresolvedDependency`] if neither tier has it.
    pub fn resolve(&mut self, request: &DependencyRequest) -> Result<ResolvedDependency, LoadError> {
        let found = match self.resolver.resolve(request) {
            Some(path) => Some((path, ResolutionSource::Bundle)),
            None => self
                .ambient
                .resolve(request)
                .map(|path| (path, ResolutionSource::Ambient)),
        };

        self.record(request.to_string(), found, false)
    }

    /// Resolve a native library: bundle manifest first, then ambient
    ///
    /// # Errors
    /// Returns [`LoadError::UnresolvedDependency`] if neither tier has it.
    pub fn resolve_native(&mut self, library: &str) -> Result<ResolvedDependency, LoadError> {
        let found = match self.resolver.resolve_native(library) {
            Some(path) => Some((path, ResolutionSource::Bundle)),
            None => self
                .ambient
                .resolve_native(library)
                .map(|path| (path, ResolutionSource::Ambient)),
        };

        self.record(library.to_string(), found, true)
    }

    fn record(
        &mut self,
        name: String,
        found: Option<(PathBuf, ResolutionSource)>,
        native: bool,
    ) -> Result<ResolvedDependency, LoadError> {
        let Some((path, source)) = found else {
            return Err(LoadError::UnresolvedDependency(name));
        };

        debug!(
            "[{}] {} -> {} ({:?})",
            self.bundle,
            name,
            path.display(),
            source
        );

        let resolved = ResolvedDependency {
            name,
            path,
            source,
            native,
        };
        self.resolved.push(resolved.clone());
        Ok(resolved)
    }

    /// Open a shared library on behalf of this bundle and keep it alive
    ///
    /// # Errors
    /// Returns [`LoadError::IncompatibleFormat`] if the platform loader rejects
    /// the file.
    pub fn open_library(&mut self, path: &Path) -> Result<&Library, LoadError> {
        // Safety: opening a library runs its initializers. Modules in the
        // plugin directory are trusted as much as the host binary itself.
        let library = unsafe { Library::new(path) }
            .map_err(|e| LoadError::incompatible(path, e.to_string()))?;

        self.libraries.push(library);
        self.libraries
            .last()
            .ok_or_else(|| LoadError::incompatible(path, "library handle was not retained"))
    }

    /// Every dependency answered so far, in request order
    #[must_use]
    pub fn resolved(&self) -> &[ResolvedDependency] {
        &self.resolved
    }

    #[must_use]
    pub fn library_count(&self) -> usize {
        self.libraries.len()
    }
}

impl fmt::Debug for LoadContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadContext")
            .field("bundle", &self.bundle)
            .field("root", &self.resolver.root())
            .field("resolved", &self.resolved.len())
            .field("libraries", &self.libraries.len())
            .finish()
    }
}
