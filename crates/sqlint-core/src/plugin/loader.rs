//! Plugin discovery and loading.
//!
//! Turns a list of [`PluginDescriptor`]s into [`LoadedPlugin`] records, one
//! per descriptor in input order, without letting one plugin's failure affect
//! another and without running analysis code from a version-incompatible
//! provider.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
#[cfg(feature = "tracing")]
use tracing::{debug, warn};

use super::declaration::{
    PluginDeclaration, PluginRegistrar, CORE_VERSION, DECLARATION_SYMBOL, RUSTC_VERSION,
};
use super::library::{LoadError, PluginLibrary};
use crate::error::panic_message;
use crate::rule::{RuleProvider, PLUGIN_API_VERSION};

/// Input to the loader: one plugin module to load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PluginDescriptor {
    pub path: PathBuf,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl PluginDescriptor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            enabled: true,
        }
    }

    pub fn disabled(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            enabled: false,
        }
    }
}

/// Per-provider admission outcome, so callers can surface exclusions instead
/// of hard-coding silence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ProviderAdmission {
    /// Provider instantiated and version-matched; its rules are available.
    Admitted { name: String },
    /// Provider instantiated but declared a different plugin API version;
    /// absent from the provider list, no error recorded.
    Excluded { name: String, declared_version: u32 },
    /// Candidate construction panicked; the rest of the plugin was still
    /// scanned.
    Failed { reason: String },
}

/// Loader output for one descriptor.
pub struct LoadedPlugin {
    pub path: PathBuf,
    pub enabled: bool,
    /// Per-provider admission outcomes, in registration order.
    pub admissions: Vec<ProviderAdmission>,
    /// Load failure affecting the whole plugin, if any.
    pub error: Option<String>,
    // Field order matters: providers hold code from `library`, so they must
    // drop first.
    providers: Vec<Box<dyn RuleProvider>>,
    library: Option<Arc<PluginLibrary>>,
}

impl LoadedPlugin {
    /// The admitted providers, in registration order.
    pub fn providers(&self) -> &[Box<dyn RuleProvider>] {
        &self.providers
    }

    /// The isolation handle owning this plugin's code, present only after a
    /// successful library load.
    pub fn isolation_handle(&self) -> Option<&Arc<PluginLibrary>> {
        self.library.as_ref()
    }

    fn skipped(path: PathBuf) -> Self {
        Self {
            path,
            enabled: false,
            admissions: Vec::new(),
            error: None,
            providers: Vec::new(),
            library: None,
        }
    }

    fn failed(path: PathBuf, error: String) -> Self {
        Self {
            path,
            enabled: true,
            admissions: Vec::new(),
            error: Some(error),
            providers: Vec::new(),
            library: None,
        }
    }
}

/// Loads every descriptor in order. One record per descriptor, same order;
/// a failing plugin never affects its neighbours.
pub fn load_plugins(descriptors: &[PluginDescriptor]) -> Vec<LoadedPlugin> {
    descriptors.iter().map(load_plugin).collect()
}

fn load_plugin(descriptor: &PluginDescriptor) -> LoadedPlugin {
    if !descriptor.enabled {
        return LoadedPlugin::skipped(descriptor.path.clone());
    }

    let resolved = match resolve_path(&descriptor.path) {
        Ok(resolved) => resolved,
        Err(error) => {
            #[cfg(feature = "tracing")]
            warn!(path = %descriptor.path.display(), %error, "plugin path did not resolve");
            return LoadedPlugin::failed(descriptor.path.clone(), error);
        }
    };

    match discover_providers(&resolved) {
        Ok((library, admissions, providers)) => {
            #[cfg(feature = "tracing")]
            debug!(
                path = %descriptor.path.display(),
                admitted = providers.len(),
                "plugin loaded"
            );
            LoadedPlugin {
                path: descriptor.path.clone(),
                enabled: true,
                admissions,
                error: None,
                providers,
                library: Some(library),
            }
        }
        Err(error) => {
            #[cfg(feature = "tracing")]
            warn!(path = %descriptor.path.display(), %error, "plugin failed to load");
            LoadedPlugin::failed(descriptor.path.clone(), error.to_string())
        }
    }
}

fn resolve_path(path: &Path) -> Result<PathBuf, String> {
    if !path.exists() {
        return Err(format!("file not found: {}", path.display()));
    }
    path.canonicalize()
        .map_err(|error| format!("file not found: {}: {error}", path.display()))
}

type DiscoveredProviders = (
    Arc<PluginLibrary>,
    Vec<ProviderAdmission>,
    Vec<Box<dyn RuleProvider>>,
);

fn discover_providers(path: &Path) -> Result<DiscoveredProviders, LoadError> {
    // Fresh isolation boundary per plugin: RTLD_LOCAL keeps its symbols (and
    // its dependencies' symbols) private to this handle.
    let library = Arc::new(PluginLibrary::open(path)?);

    let declaration = unsafe { library.get::<*const PluginDeclaration>(DECLARATION_SYMBOL)? };
    let declaration = unsafe { &*declaration };

    // An exact toolchain and core fingerprint match is required before any
    // plugin function runs; Rust has no stable ABI across either.
    if declaration.rustc_version != RUSTC_VERSION || declaration.core_version != CORE_VERSION {
        return Err(LoadError::IncompatibleInterface(format!(
            "plugin built with {} / core {}, host has {} / core {}",
            declaration.rustc_version, declaration.core_version, RUSTC_VERSION, CORE_VERSION,
        )));
    }

    let mut registrar = HostRegistrar::default();
    let register = declaration.register;
    catch_unwind(AssertUnwindSafe(|| unsafe {
        register(&mut registrar);
    }))
    .map_err(|payload| LoadError::RegistrationFailed(panic_message(payload)))?;

    Ok((library, registrar.admissions, registrar.providers))
}

/// Host-side registrar: instantiates each candidate in isolation and applies
/// the version gate.
#[derive(Default)]
struct HostRegistrar {
    admissions: Vec<ProviderAdmission>,
    providers: Vec<Box<dyn RuleProvider>>,
}

impl PluginRegistrar for HostRegistrar {
    fn register_provider(&mut self, constructor: &dyn Fn() -> Box<dyn RuleProvider>) {
        match catch_unwind(AssertUnwindSafe(constructor)) {
            Ok(provider) => {
                let (admission, admitted) = admit(provider);
                self.admissions.push(admission);
                if let Some(provider) = admitted {
                    self.providers.push(provider);
                }
            }
            Err(payload) => {
                self.admissions.push(ProviderAdmission::Failed {
                    reason: panic_message(payload),
                });
            }
        }
    }
}

/// The version gate: admits a provider only when its declared plugin API
/// version exactly equals the host's.
fn admit(provider: Box<dyn RuleProvider>) -> (ProviderAdmission, Option<Box<dyn RuleProvider>>) {
    let name = provider.name().to_string();
    let declared_version = provider.plugin_api_version();
    if declared_version == PLUGIN_API_VERSION {
        (ProviderAdmission::Admitted { name }, Some(provider))
    } else {
        (
            ProviderAdmission::Excluded {
                name,
                declared_version,
            },
            None,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Rule;

    struct FakeProvider {
        name: &'static str,
        version: u32,
    }

    impl RuleProvider for FakeProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn plugin_api_version(&self) -> u32 {
            self.version
        }

        fn rules(&self) -> Vec<Box<dyn Rule>> {
            Vec::new()
        }
    }

    #[test]
    fn matching_version_is_admitted() {
        let (admission, provider) = admit(Box::new(FakeProvider {
            name: "matching",
            version: PLUGIN_API_VERSION,
        }));
        assert_eq!(
            admission,
            ProviderAdmission::Admitted {
                name: "matching".to_string()
            }
        );
        assert!(provider.is_some());
    }

    #[test]
    fn mismatched_version_is_excluded_not_failed() {
        let (admission, provider) = admit(Box::new(FakeProvider {
            name: "stale",
            version: PLUGIN_API_VERSION + 1,
        }));
        assert_eq!(
            admission,
            ProviderAdmission::Excluded {
                name: "stale".to_string(),
                declared_version: PLUGIN_API_VERSION + 1,
            }
        );
        assert!(provider.is_none());
    }

    #[test]
    fn panicking_constructor_skips_only_that_candidate() {
        let mut registrar = HostRegistrar::default();
        registrar.register_provider(&|| panic!("constructor exploded"));
        registrar.register_provider(&|| {
            Box::new(FakeProvider {
                name: "healthy",
                version: PLUGIN_API_VERSION,
            }) as Box<dyn RuleProvider>
        });

        assert_eq!(registrar.providers.len(), 1);
        assert_eq!(registrar.admissions.len(), 2);
        assert!(matches!(
            registrar.admissions[0],
            ProviderAdmission::Failed { .. }
        ));
        assert!(matches!(
            registrar.admissions[1],
            ProviderAdmission::Admitted { .. }
        ));
    }

    #[test]
    fn disabled_descriptor_never_touches_the_file() {
        let loaded = load_plugin(&PluginDescriptor::disabled("/definitely/not/here.so"));
        assert!(!loaded.enabled);
        assert!(loaded.error.is_none());
        assert!(loaded.providers().is_empty());
        assert!(loaded.isolation_handle().is_none());
    }

    #[test]
    fn missing_file_is_recorded_not_fatal() {
        let loaded = load_plugin(&PluginDescriptor::new("/definitely/not/here.so"));
        assert!(loaded.enabled);
        assert!(loaded.error.as_deref().unwrap().contains("file not found"));
        assert!(loaded.providers().is_empty());
    }
}
