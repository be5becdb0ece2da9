//! Error taxonomy for the plugin pipeline.
//!
//! Scan failures are fatal to startup, load failures only cost the bundle that
//! produced them, and registration failures mean the registrar was handed
//! something it should never see.

use std::path::PathBuf;
use thiserror::Error;

use super::bundle::BundleState;

/// The plugin directory exists but could not be enumerated.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to scan plugin directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Per-bundle load failure. The host logs it and moves on to the next bundle.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("module file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("{} is not a loadable module: {reason}", path.display())]
    IncompatibleFormat { path: PathBuf, reason: String },

    #[error("unresolved dependency: {0}")]
    UnresolvedDependency(String),

    #[error("malformed dependency manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    pub(crate) fn incompatible(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::IncompatibleFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Invariant violation inside the registrar. Treated as fatal.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("{0} is a resources module and cannot be registered as a part")]
    NotACodeModule(String),

    #[error("{0} does not carry any embedded resources")]
    NoResources(String),

    #[error("bundle {bundle} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        bundle: String,
        from: BundleState,
        to: BundleState,
    },
}
