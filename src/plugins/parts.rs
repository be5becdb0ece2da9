//! Application parts: the sources of routable behavior the request pipeline
//! consults once startup is over.

use serde::Serialize;
use std::path::PathBuf;

use super::api::Route;
use super::loader::{HandleId, ModuleHandle};

/// Where a part came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PartOrigin {
    /// Compiled into the host
    Static,
    /// Loaded from a plugin bundle
    Dynamic { path: PathBuf, handle: HandleId },
}

/// One contribution to the part registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationPart {
    pub name: String,
    pub version: String,
    pub origin: PartOrigin,
    pub routes: Vec<Route>,
}

impl ApplicationPart {
    /// A part the host links in itself
    pub fn host(name: impl Into<String>, version: impl Into<String>, routes: Vec<Route>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            origin: PartOrigin::Static,
            routes,
        }
    }

    pub(crate) fn from_handle(handle: &ModuleHandle) -> Self {
        let module = handle.module();
        let image = module.image();
        let name = if image.name.is_empty() {
            module.bundle().name().to_string()
        } else {
            image.name.clone()
        };

        Self {
            name,
            version: image.version.clone(),
            origin: PartOrigin::Dynamic {
                path: module.bundle().module().to_path_buf(),
                handle: module.id(),
            },
            routes: image.routes.clone(),
        }
    }

    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        matches!(self.origin, PartOrigin::Dynamic { .. })
    }
}

/// Append-only, insertion-ordered part collection
#[derive(Debug, Clone, Default, Serialize)]
pub struct PartRegistry {
    parts: Vec<ApplicationPart>,
}

impl PartRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, part: ApplicationPart) {
        self.parts.push(part);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ApplicationPart> {
        self.parts.iter()
    }

    /// Parts that came from plugin bundles, in registration order
    pub fn dynamic(&self) -> impl Iterator<Item = &ApplicationPart> {
        self.parts.iter().filter(|p| p.is_dynamic())
    }

    /// First registered part serving `path`, with the matching route
    #[must_use]
    pub fn route(&self, path: &str) -> Option<(&ApplicationPart, &Route)> {
        self.parts
            .iter()
            .find_map(|part| part.routes.iter().find(|r| r.path == path).map(|r| (part, r)))
    }
}
