//! Hello plugin - a minimal anvil module with one route and one stylesheet.
//!
//! Cargo names the artifact `librcl_hello.so`; copy it next to the host as
//! `rcl_hello.so` so the scanner picks it up.

use anvil::plugins::api::{
    ImportDeclaration, ModuleDeclaration, ResourceDeclaration, RouteDeclaration,
};
use anvil::plugins::ANVIL_ABI_VERSION;

const SITE_CSS: &[u8] = b"h1 { color: #e25822; }\n";

static ROUTES: [RouteDeclaration; 1] = [RouteDeclaration {
    path: c"/hello".as_ptr(),
    handler: c"Hello.Index".as_ptr(),
}];

static RESOURCES: [ResourceDeclaration; 1] = [ResourceDeclaration {
    path: c"wwwroot/css/hello.css".as_ptr(),
    data: SITE_CSS.as_ptr(),
    len: SITE_CSS.len(),
}];

static IMPORTS: [ImportDeclaration; 0] = [];

static DECLARATION: ModuleDeclaration = ModuleDeclaration {
    abi_version: ANVIL_ABI_VERSION,
    name: c"rcl_hello".as_ptr(),
    version: c"0.1.0".as_ptr(),
    imports: IMPORTS.as_ptr(),
    import_count: IMPORTS.len(),
    routes: ROUTES.as_ptr(),
    route_count: ROUTES.len(),
    resources: RESOURCES.as_ptr(),
    resource_count: RESOURCES.len(),
};

/// Module entry point
#[no_mangle]
pub extern "C" fn _anvil_module_declare() -> *const ModuleDeclaration {
    &DECLARATION
}
