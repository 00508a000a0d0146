//! Plugin declaration: the stable entry point a plugin library exports.
//!
//! A plugin `cdylib` exposes one well-known static, stamped via
//! [`export_plugin!`], carrying the toolchain and core versions it was built
//! with plus a registration function. The loader compares the version
//! fingerprints before calling `register`, so no plugin code beyond the
//! static itself runs for an incompatible build.

use crate::rule::RuleProvider;

/// The exact `rustc --version` the core (and therefore any compatible
/// plugin) was compiled with.
pub const RUSTC_VERSION: &str = env!("SQLINT_RUSTC_VERSION");

/// The core crate version compiled into host and plugin.
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exported symbol name looked up in every plugin library.
pub const DECLARATION_SYMBOL: &str = "sqlint_plugin_declaration";

/// Collector handed to a plugin's `register` function.
///
/// Each provider is handed over as a constructor so the host can contain a
/// panicking instantiation to that single candidate instead of losing the
/// whole plugin.
pub trait PluginRegistrar {
    fn register_provider(&mut self, constructor: &dyn Fn() -> Box<dyn RuleProvider>);
}

/// The static a plugin exports under [`DECLARATION_SYMBOL`].
pub struct PluginDeclaration {
    pub rustc_version: &'static str,
    pub core_version: &'static str,
    pub register: unsafe fn(&mut dyn PluginRegistrar),
}

/// Exports a plugin declaration from a plugin crate.
///
/// ```ignore
/// fn register(registrar: &mut dyn PluginRegistrar) {
///     registrar.register_provider(&|| Box::new(MyProvider) as Box<dyn RuleProvider>);
/// }
///
/// sqlint_core::export_plugin!(register);
/// ```
#[macro_export]
macro_rules! export_plugin {
    ($register:expr) => {
        #[doc(hidden)]
        #[no_mangle]
        #[allow(non_upper_case_globals)]
        pub static sqlint_plugin_declaration: $crate::plugin::PluginDeclaration =
            $crate::plugin::PluginDeclaration {
                rustc_version: $crate::plugin::RUSTC_VERSION,
                core_version: $crate::plugin::CORE_VERSION,
                register: $register,
            };
    };
}
