//! Discovered plugin bundles and their startup lifecycle.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use super::error::RegistrationError;

/// Extension of the dependency manifest that sits next to each module
pub const MANIFEST_EXTENSION: &str = "deps.json";

/// What a module contributes once loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// Routable behavior, registered as an application part
    Code,
    /// Packaged static resources only
    Resources,
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code => f.write_str("code"),
            Self::Resources => f.write_str("resources"),
        }
    }
}

/// One discovered module file plus the manifest that scopes its dependencies.
///
/// Immutable after discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bundle {
    name: String,
    root: PathBuf,
    module: PathBuf,
    manifest: PathBuf,
    kind: ModuleKind,
}

impl Bundle {
    /// Describe the bundle for a module file. `None` if the path has no parent
    /// directory or no UTF-8 file stem.
    #[must_use]
    pub fn from_module(module: PathBuf, kind: ModuleKind) -> Option<Self> {
        let root = module.parent()?.to_path_buf();
        let name = module.file_stem()?.to_str()?.to_string();
        let manifest = root.join(format!("{name}.{MANIFEST_EXTENSION}"));

        Some(Self {
            name,
            root,
            module,
            manifest,
            kind,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory every manifest path is relative to
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The entry module file
    #[must_use]
    pub fn module(&self) -> &Path {
        &self.module
    }

    #[must_use]
    pub fn manifest(&self) -> &Path {
        &self.manifest
    }

    #[must_use]
    pub fn kind(&self) -> ModuleKind {
        self.kind
    }
}

/// Where a bundle is in the startup pipeline.
///
/// `Discovered → Classified → Loading → Loaded → Registered`, or
/// `Loading → Failed`. There are no transitions out of a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleState {
    Discovered,
    Classified,
    Loading,
    Loaded,
    Registered,
    Failed,
}

impl BundleState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Registered | Self::Failed)
    }

    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Discovered, Self::Classified)
                | (Self::Classified, Self::Loading)
                | (Self::Loading, Self::Loaded | Self::Failed)
                | (Self::Loaded, Self::Registered)
        )
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow
    ///
    /// # Errors
    /// Returns [`RegistrationError::InvalidTransition`] for an illegal move.
    pub fn advance(&mut self, bundle: &str, next: Self) -> Result<(), RegistrationError> {
        if !self.can_advance_to(next) {
            return Err(RegistrationError::InvalidTransition {
                bundle: bundle.to_string(),
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_from_module() {
        let bundle =
            Bundle::from_module(PathBuf::from("/opt/app/rcl_a.Views.so"), ModuleKind::Resources)
                .unwrap();
        assert_eq!(bundle.name(), "rcl_a.Views");
        assert_eq!(bundle.root(), Path::new("/opt/app"));
        assert_eq!(bundle.manifest(), Path::new("/opt/app/rcl_a.Views.deps.json"));
        assert_eq!(bundle.kind(), ModuleKind::Resources);
    }

    #[test]
    fn test_lifecycle_happy_path() {
        let mut state = BundleState::Discovered;
        for next in [
            BundleState::Classified,
            BundleState::Loading,
            BundleState::Loaded,
            BundleState::Registered,
        ] {
            state.advance("rcl_a", next).unwrap();
        }
        assert!(state.is_terminal());
    }

    #[test]
    fn test_lifecycle_rejects_leaving_terminal_states() {
        let mut state = BundleState::Failed;
        assert!(state.advance("rcl_a", BundleState::Loading).is_err());
        assert_eq!(state, BundleState::Failed);

        let mut state = BundleState::Loaded;
        assert!(state.advance("rcl_a", BundleState::Failed).is_err());
    }
}
