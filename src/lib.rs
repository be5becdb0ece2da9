//! Anvil - a host that extends itself with isolated plugin modules
//!
//! At startup the host scans its own directory for plugin modules, loads each
//! one through a load context bound to that module's dependency manifest, and
//! registers what it contributes: routable parts and embedded static resources.
//!
//! # Modules
//!
//! - [`config`]: Configuration management and serialization
//! - [`plugins`]: Scanning, isolated loading and registration of plugin bundles
//! - [`host`]: Startup composition root and the final registries

pub mod config;
pub mod host;
pub mod plugins;
