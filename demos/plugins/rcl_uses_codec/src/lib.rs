//! A module that needs `codec` 1.0.0 at load time.
//!
//! Ship it with an `rcl_uses_codec.deps.json` next to it, for example:
//!
//! ```json
//! { "dependencies": { "codec": { "version": "1.0.0", "path": "rcl_uses_codec.deps/libcodec.so" } } }
//! ```
//!
//! Without one, the host falls back to its own copy of `codec`.

use anvil::plugins::api::{
    ImportDeclaration, ModuleDeclaration, ResourceDeclaration, RouteDeclaration,
};
use anvil::plugins::ANVIL_ABI_VERSION;

static IMPORTS: [ImportDeclaration; 1] = [ImportDeclaration {
    name: c"codec".as_ptr(),
    version: c"1.0.0".as_ptr(),
    native: false,
}];

static ROUTES: [RouteDeclaration; 1] = [RouteDeclaration {
    path: c"/encode".as_ptr(),
    handler: c"Codec.Encode".as_ptr(),
}];

static RESOURCES: [ResourceDeclaration; 0] = [];

static DECLARATION: ModuleDeclaration = ModuleDeclaration {
    abi_version: ANVIL_ABI_VERSION,
    name: c"rcl_uses_codec".as_ptr(),
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
