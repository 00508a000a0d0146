//! Plugin loading: discovery, isolation, version gating.
//!
//! Plugins are shared libraries exporting a [`PluginDeclaration`] under a
//! well-known symbol. Each library gets its own isolation boundary (a
//! [`PluginLibrary`] handle with locally-resolved symbols), failures are
//! contained per plugin and per provider candidate, and only providers whose
//! declared API version exactly matches the host's enter the registry.

pub mod declaration;
pub mod library;
pub mod loader;

pub use declaration::{
    PluginDeclaration, PluginRegistrar, CORE_VERSION, DECLARATION_SYMBOL, RUSTC_VERSION,
};
pub use library::{LoadError, PluginLibrary};
pub use loader::{load_plugins, LoadedPlugin, PluginDescriptor, ProviderAdmission};
