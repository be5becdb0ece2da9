// Isolated plugin loading:
// - Scanner finds `rcl_*` modules next to the host and classifies them
// - Each bundle loads through its own LoadContext and manifest resolver
// - Registrar appends parts and composes resource providers in scan order
pub mod api;
pub mod bundle;
pub mod context;
pub mod error;
pub mod loader;
pub mod manifest;
pub mod parts;
pub mod registrar;
pub mod resources;
pub mod scanner;

pub use api::{EmbeddedResource, Import, ModuleImage, Route, ANVIL_ABI_VERSION};
pub use bundle::{Bundle, BundleState, ModuleKind};
pub use context::{AmbientResolver, HostAmbientResolver, LoadContext, ResolutionSource, ResolvedDependency};
pub use error::{LoadError, RegistrationError, ScanError};
pub use loader::{BundleLoader, HandleId, LoadedModule, ModuleHandle, ModuleLoader, NativeModuleLoader};
pub use manifest::{DependencyManifest, DependencyManifestResolver, DependencyRequest, ManagedEntry};
pub use parts::{ApplicationPart, PartOrigin, PartRegistry};
pub use registrar::{ExtensibilityRegistrar, Registries};
pub use resources::{
    normalize_path, DirectoryProvider, EmbeddedProvider, ResourceChain, ResourceProvider,
    ShadowPolicy,
};
pub use scanner::PluginScanner;
