//! Bundle-local dependency manifests.
//!
//! Each bundle's build drops a `<stem>.deps.json` next to the module. The
//! resolver is a plain lookup table over that file: it never searches, never
//! negotiates versions and never looks at another bundle's manifest.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::error::LoadError;

/// A request for a managed dependency: a name and an optional exact version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl DependencyRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

impl fmt::Display for DependencyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}@{}", self.name, v),
            None => f.write_str(&self.name),
        }
    }
}

/// One managed entry in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub path: PathBuf,
}

/// On-disk shape of `<stem>.deps.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyManifest {
    #[serde(default)]
    pub dependencies: BTreeMap<String, ManagedEntry>,
    #[serde(default)]
    pub native: BTreeMap<String, PathBuf>,
}

impl DependencyManifest {
    /// Read a manifest. A missing file is an empty manifest.
    ///
    /// # Errors
    /// Returns [`LoadError::Manifest`] if the file exists but is not valid JSON
    /// of the expected shape, and [`LoadError::IncompatibleFormat`] if it
    /// cannot be read.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(LoadError::incompatible(path, e.to_string())),
        };

        serde_json::from_str(&contents).map_err(|source| LoadError::Manifest {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Resolves dependency names against exactly one bundle's manifest
#[derive(Debug, Clone)]
pub struct DependencyManifestResolver {
    root: PathBuf,
    manifest: DependencyManifest,
}

impl DependencyManifestResolver {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, manifest: DependencyManifest) -> Self {
        Self {
            root: root.into(),
            manifest,
        }
    }

    /// Read `manifest_path` and bind the result to `root`
    ///
    /// # Errors
    /// See [`DependencyManifest::load`].
    pub fn from_file(root: impl Into<PathBuf>, manifest_path: &Path) -> Result<Self, LoadError> {
        Ok(Self::new(root, DependencyManifest::load(manifest_path)?))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a managed dependency, or `None` to defer to ambient resolution.
    ///
    /// A version hint only matches an entry that declares the same version.
    #[must_use]
    pub fn resolve(&self, request: &DependencyRequest) -> Option<PathBuf> {
        let entry = self.manifest.dependencies.get(&request.name)?;

        if let (Some(wanted), Some(declared)) = (&request.version, &entry.version) {
            if wanted != declared {
                return None;
            }
        }

        self.existing(&request.name, &entry.path)
    }

    /// Path of a native library, or `None` to defer to ambient resolution.
    ///
    /// Accepts either the bare name (`sqlite3`) or a platform file name
    /// (`libsqlite3.so`).
    #[must_use]
    pub fn resolve_native(&self, library: &str) -> Option<PathBuf> {
        let relative = self.manifest.native.get(library).or_else(|| {
            let bare = native_stem(library);
            self.manifest.native.get(bare)
        })?;

        self.existing(library, relative)
    }

    fn existing(&self, name: &str, relative: &Path) -> Option<PathBuf> {
        let path = self.root.join(relative);
        if path.is_file() {
            Some(path)
        } else {
            warn!(
                "Manifest entry {} points at missing file {}",
                name,
                path.display()
            );
            None
        }
    }
}

/// Strip a platform library prefix and shared-library extension
pub(crate) fn native_stem(library: &str) -> &str {
    let ext = std::env::consts::DLL_EXTENSION;
    let name = library
        .strip_suffix(ext)
        .and_then(|n| n.strip_suffix('.'))
        .unwrap_or(library);
    name.strip_prefix(std::env::consts::DLL_PREFIX)
        .filter(|n| !n.is_empty())
        .unwrap_or(name)
}
