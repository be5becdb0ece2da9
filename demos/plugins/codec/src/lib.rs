//! Codec - a plain shared library that modules can ship privately.
//!
//! It is a dependency, not a module: it does not export
//! `_anvil_module_declare`, so the host refuses to load it as a plugin.

/// Version of the encoding this library produces
#[no_mangle]
pub extern "C" fn codec_format_version() -> u32 {
    1
}
