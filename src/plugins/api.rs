//! Plugin binary interface definitions
//!
//! A module is a shared library that exports [`DECLARE_SYMBOL`]. The
//! declaration it returns is plain `#[repr(C)]` data: everything the host needs
//! is copied out into a [`ModuleImage`] right after loading.

use serde::{Deserialize, Serialize};
use std::ffi::CStr;
use std::os::raw::c_char;

use super::manifest::DependencyRequest;

/// Declaration layout version this host understands
pub const ANVIL_ABI_VERSION: u32 = 1;

/// Exported entry symbol of every module
pub const DECLARE_SYMBOL: &[u8] = b"_anvil_module_declare\0";

/// Function signature for the module entry point
pub type ModuleDeclare = unsafe extern "C" fn() -> *const ModuleDeclaration;

/// Static description a module exports about itself
#[repr(C)]
pub struct ModuleDeclaration {
    pub abi_version: u32,
    pub name: *const c_char,
    pub version: *const c_char,
    pub imports: *const ImportDeclaration,
    pub import_count: usize,
    pub routes: *const RouteDeclaration,
    pub route_count: usize,
    pub resources: *const ResourceDeclaration,
    pub resource_count: usize,
}

/// A dependency the module needs before it can run. `version` may be null.
#[repr(C)]
pub struct ImportDeclaration {
    pub name: *const c_char,
    pub version: *const c_char,
    pub native: bool,
}

/// A routable behavior unit: request path and the handler that serves it
#[repr(C)]
pub struct RouteDeclaration {
    pub path: *const c_char,
    pub handler: *const c_char,
}

/// An embedded static resource
#[repr(C)]
pub struct ResourceDeclaration {
    pub path: *const c_char,
    pub data: *const u8,
    pub len: usize,
}

// Safety: declarations are immutable statics inside the module image
unsafe impl Sync for ModuleDeclaration {}
unsafe impl Sync for ImportDeclaration {}
unsafe impl Sync for RouteDeclaration {}
unsafe impl Sync for ResourceDeclaration {}

/// A dependency requested by a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Import {
    Managed(DependencyRequest),
    Native { name: String },
}

/// Owned route definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub path: String,
    pub handler: String,
}

/// Owned embedded resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedResource {
    pub path: String,
    pub bytes: Vec<u8>,
}

/// Everything the host keeps from a loaded module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleImage {
    pub name: String,
    pub version: String,
    pub imports: Vec<Import>,
    pub routes: Vec<Route>,
    pub resources: Vec<EmbeddedResource>,
}

impl ModuleImage {
    /// Copy a declaration out of module memory
    ///
    /// # Safety
    /// `decl` must be null or point at a [`ModuleDeclaration`] whose pointers
    /// are valid for the advertised lengths.
    ///
    /// # Errors
    /// Returns a description of the first malformed field.
    pub unsafe fn from_declaration(decl: *const ModuleDeclaration) -> Result<Self, String> {
        let decl = decl.as_ref().ok_or("module declaration is null")?;

        if decl.abi_version != ANVIL_ABI_VERSION {
            return Err(format!(
                "module ABI version {} (host expects {})",
                decl.abi_version, ANVIL_ABI_VERSION
            ));
        }

        let mut imports = Vec::with_capacity(decl.import_count);
        for import in slice(decl.imports, decl.import_count, "imports")? {
            let name = string(import.name, "import name")?;
            imports.push(if import.native {
                Import::Native { name }
            } else {
                let mut request = DependencyRequest::new(name);
                if !import.version.is_null() {
                    request = request.with_version(string(import.version, "import version")?);
                }
                Import::Managed(request)
            });
        }

        let mut routes = Vec::with_capacity(decl.route_count);
        for route in slice(decl.routes, decl.route_count, "routes")? {
            routes.push(Route {
                path: string(route.path, "route path")?,
                handler: string(route.handler, "route handler")?,
            });
        }

        let mut resources = Vec::with_capacity(decl.resource_count);
        for resource in slice(decl.resources, decl.resource_count, "resources")? {
            resources.push(EmbeddedResource {
                path: string(resource.path, "resource path")?,
                bytes: slice(resource.data, resource.len, "resource data")?.to_vec(),
            });
        }

        Ok(Self {
            name: string(decl.name, "module name")?,
            version: string(decl.version, "module version")?,
            imports,
            routes,
            resources,
        })
    }
}

unsafe fn string(ptr: *const c_char, field: &str) -> Result<String, String> {
    if ptr.is_null() {
        return Err(format!("{field} is null"));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map(str::to_string)
        .map_err(|_| format!("{field} is not valid UTF-8"))
}

unsafe fn slice<'a, T>(ptr: *const T, len: usize, field: &str) -> Result<&'a [T], String> {
    match (ptr.is_null(), len) {
        (_, 0) => Ok(&[]),
        (true, _) => Err(format!("{field} is null but {len} entries were declared")),
        (false, _) => Ok(std::slice::from_raw_parts(ptr, len)),
    }
}
