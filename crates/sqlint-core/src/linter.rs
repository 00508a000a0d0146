//! Rule execution orchestration.
//!
//! A [`Linter`] owns the aggregated rule registry (built-ins plus loaded
//! plugins) and drives every applicable rule over one immutable
//! [`AnalysisContext`], collecting diagnostics in registry order with
//! per-rule fault isolation. Fixes are never computed during analysis; they
//! are a separate on-demand lookup keyed by a diagnostic's code.

use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::prelude::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
#[cfg(feature = "tracing")]
use tracing::{debug, warn};

use crate::context::AnalysisContext;
use crate::error::panic_message;
use crate::plugin::LoadedPlugin;
use crate::registry::{RegistryConflict, RuleRegistry};
use crate::rule::{RuleMetadata, RuleProvider};
use crate::rules::builtin_providers;
use crate::types::{Diagnostic, Fix};

/// A rule whose `analyze` failed; scoped to the rule, surfaced separately
/// from diagnostics so partial failure degrades output instead of blanking
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleFailure {
    pub rule_id: String,
    pub message: String,
}

/// The outcome of one orchestration run over one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Diagnostics in registry order, then emission order within a rule.
    pub diagnostics: Vec<Diagnostic>,
    /// Rules that failed during this run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<RuleFailure>,
}

/// The lint engine: an aggregated rule registry plus the plugin handles that
/// keep plugin code loaded.
pub struct Linter {
    // Declared before `plugins`: registry entries hold code from the plugin
    // libraries and must drop first.
    registry: RuleRegistry,
    plugins: Vec<LoadedPlugin>,
}

impl Linter {
    /// A linter with only the built-in rules.
    pub fn new() -> Self {
        Self::with_plugins(Vec::new())
    }

    /// A linter aggregating built-ins first, then the admitted providers of
    /// `plugins` in descriptor order. Takes ownership of the plugin records
    /// so their isolation handles outlive every registered rule.
    pub fn with_plugins(plugins: Vec<LoadedPlugin>) -> Self {
        let builtins = builtin_providers();
        let registry = RuleRegistry::assemble(
            builtins
                .iter()
                .map(|provider| provider.as_ref())
                .chain(
                    plugins
                        .iter()
                        .flat_map(|plugin| plugin.providers())
                        .map(|provider| provider.as_ref()),
                ),
        );
        #[cfg(feature = "tracing")]
        debug!(rules = registry.len(), "rule registry assembled");
        Self { registry, plugins }
    }

    /// A linter over exactly `providers`, bypassing the built-ins. Used by
    /// hosts that fully control the rule set, and by tests.
    pub fn from_providers(providers: &[Box<dyn RuleProvider>]) -> Self {
        let registry =
            RuleRegistry::assemble(providers.iter().map(|provider| provider.as_ref()));
        Self {
            registry,
            plugins: Vec::new(),
        }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// The plugin records this linter keeps alive, for surfacing load errors
    /// and admission outcomes to the operator.
    pub fn plugins(&self) -> &[LoadedPlugin] {
        &self.plugins
    }

    /// Duplicate-rule-id registrations rejected at aggregation time.
    pub fn conflicts(&self) -> &[RegistryConflict] {
        self.registry.conflicts()
    }

    /// Runs every applicable rule over `ctx`.
    ///
    /// Deterministic: two runs over an identical registry and context produce
    /// identical reports. A rule that panics contributes a [`RuleFailure`]
    /// and nothing else; the remaining rules still run.
    pub fn analyze(&self, ctx: &AnalysisContext) -> AnalysisReport {
        let mut report = AnalysisReport::default();
        if !ctx.settings.enabled {
            return report;
        }

        for entry in self.registry.rules() {
            let metadata = entry.rule.metadata();
            if !ctx.settings.is_rule_enabled(&metadata.rule_id) {
                continue;
            }
            // Out-of-bounds rules are skipped entirely, never invoked.
            if !metadata.applies_to(ctx.compat_level) {
                continue;
            }

            match catch_unwind(AssertUnwindSafe(|| entry.rule.analyze(ctx))) {
                Ok(diagnostics) => {
                    report.diagnostics.extend(
                        diagnostics
                            .into_iter()
                            .map(|diagnostic| normalize(diagnostic, metadata)),
                    );
                }
                Err(payload) => {
                    let failure = RuleFailure {
                        rule_id: metadata.rule_id.clone(),
                        message: panic_message(payload),
                    };
                    #[cfg(feature = "tracing")]
                    warn!(rule_id = %failure.rule_id, message = %failure.message, "rule failed");
                    report.failures.push(failure);
                }
            }
        }

        report
    }

    /// Analyzes many documents on a worker pool bounded to `max_threads`.
    /// Reports come back in input order; no cross-document execution ordering
    /// is guaranteed, but each report preserves registry order internally.
    pub fn analyze_batch(
        &self,
        contexts: &[AnalysisContext],
        max_threads: usize,
    ) -> Vec<AnalysisReport> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_threads.max(1))
            .build();
        match pool {
            Ok(pool) => pool.install(|| contexts.par_iter().map(|ctx| self.analyze(ctx)).collect()),
            // A pool that cannot be built degrades to sequential analysis.
            Err(_) => contexts.iter().map(|ctx| self.analyze(ctx)).collect(),
        }
    }

    /// Fixes for a previously-returned diagnostic, routed to the rule whose
    /// id matches the diagnostic's code. Unknown or absent codes, and rules
    /// that declare themselves unfixable, yield nothing.
    pub fn fixes_for(&self, ctx: &AnalysisContext, diagnostic: &Diagnostic) -> Vec<Fix> {
        let Some(code) = diagnostic.code.as_deref() else {
            return Vec::new();
        };
        let Some(entry) = self.registry.find(code) else {
            return Vec::new();
        };
        if !entry.rule.metadata().fixable {
            return Vec::new();
        }
        catch_unwind(AssertUnwindSafe(|| entry.rule.fixes(ctx, diagnostic))).unwrap_or_default()
    }
}

impl Default for Linter {
    fn default() -> Self {
        Self::new()
    }
}

/// Fills in what a rule left implicit: severity falls back to the rule's
/// default, and code/data are stamped from metadata so every diagnostic is
/// attributable.
fn normalize(mut diagnostic: Diagnostic, metadata: &RuleMetadata) -> Diagnostic {
    if diagnostic.severity.is_none() {
        diagnostic.severity = Some(metadata.default_severity);
    }
    if diagnostic.code.is_none() {
        diagnostic.code = Some(metadata.rule_id.clone());
    }
    if diagnostic.data.is_none() {
        diagnostic = diagnostic.with_data(
            metadata.rule_id.clone(),
            metadata.category.clone(),
            metadata.fixable,
        );
    }
    diagnostic
}
