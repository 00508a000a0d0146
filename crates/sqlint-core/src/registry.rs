//! Rule registry aggregation.
//!
//! Built-in providers come first in their declaration order, then plugin
//! providers in descriptor order, each provider's rules in its own declared
//! order. Registry order is the outer ordering of every analysis run, which
//! keeps output reproducible for golden-file comparison.

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
#[cfg(feature = "tracing")]
use tracing::warn;

use crate::rule::{Rule, RuleProvider};

/// One registered rule and the provider it came from.
pub struct RegisteredRule {
    pub provider: String,
    pub rule: Box<dyn Rule>,
}

/// A later provider tried to register an already-taken rule id. The first
/// registration wins; the loser is recorded here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConflict {
    pub rule_id: String,
    /// Provider whose registration was rejected.
    pub provider: String,
    /// Provider that holds the id.
    pub kept_provider: String,
}

/// Ordered rule registry with unique rule ids.
#[derive(Default)]
pub struct RuleRegistry {
    entries: Vec<RegisteredRule>,
    by_id: HashMap<String, usize>,
    conflicts: Vec<RegistryConflict>,
}

impl RuleRegistry {
    /// Aggregates rules from `providers`, preserving provider order and each
    /// provider's own rule order. Duplicate rule ids: first registered wins.
    pub fn assemble<'a>(providers: impl IntoIterator<Item = &'a dyn RuleProvider>) -> Self {
        let mut registry = RuleRegistry::default();
        for provider in providers {
            for rule in provider.rules() {
                registry.insert(provider.name(), rule);
            }
        }
        registry
    }

    fn insert(&mut self, provider: &str, rule: Box<dyn Rule>) {
        let rule_id = rule.metadata().rule_id.clone();
        if let Some(&existing) = self.by_id.get(&rule_id) {
            let conflict = RegistryConflict {
                rule_id,
                provider: provider.to_string(),
                kept_provider: self.entries[existing].provider.clone(),
            };
            #[cfg(feature = "tracing")]
            warn!(
                rule_id = %conflict.rule_id,
                provider = %conflict.provider,
                kept = %conflict.kept_provider,
                "duplicate rule id; first registration wins"
            );
            self.conflicts.push(conflict);
            return;
        }

        self.by_id.insert(rule_id, self.entries.len());
        self.entries.push(RegisteredRule {
            provider: provider.to_string(),
            rule,
        });
    }

    /// Rules in registry order.
    pub fn rules(&self) -> impl Iterator<Item = &RegisteredRule> {
        self.entries.iter()
    }

    pub fn find(&self, rule_id: &str) -> Option<&RegisteredRule> {
        self.by_id.get(rule_id).map(|&index| &self.entries[index])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rejected duplicate registrations, in encounter order.
    pub fn conflicts(&self) -> &[RegistryConflict] {
        &self.conflicts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AnalysisContext;
    use crate::rule::RuleMetadata;
    use crate::types::Diagnostic;

    struct StaticRule {
        metadata: RuleMetadata,
    }

    impl Rule for StaticRule {
        fn metadata(&self) -> &RuleMetadata {
            &self.metadata
        }

        fn analyze(&self, _ctx: &AnalysisContext) -> Vec<Diagnostic> {
            Vec::new()
        }
    }

    struct StaticProvider {
        name: &'static str,
        rule_ids: Vec<&'static str>,
    }

    impl RuleProvider for StaticProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn plugin_api_version(&self) -> u32 {
            crate::rule::PLUGIN_API_VERSION
        }

        fn rules(&self) -> Vec<Box<dyn Rule>> {
            self.rule_ids
                .iter()
                .map(|id| {
                    Box::new(StaticRule {
                        metadata: RuleMetadata::new(*id, "test rule", "test"),
                    }) as Box<dyn Rule>
                })
                .collect()
        }
    }

    #[test]
    fn preserves_provider_and_rule_order() {
        let first = StaticProvider {
            name: "first",
            rule_ids: vec!["a", "b"],
        };
        let second = StaticProvider {
            name: "second",
            rule_ids: vec!["c"],
        };
        let registry = RuleRegistry::assemble(
            [&first as &dyn RuleProvider, &second as &dyn RuleProvider],
        );

        let ids: Vec<_> = registry
            .rules()
            .map(|entry| entry.rule.metadata().rule_id.clone())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn duplicate_rule_id_first_registration_wins() {
        let first = StaticProvider {
            name: "first",
            rule_ids: vec!["shared"],
        };
        let second = StaticProvider {
            name: "second",
            rule_ids: vec!["shared", "unique"],
        };
        let registry = RuleRegistry::assemble(
            [&first as &dyn RuleProvider, &second as &dyn RuleProvider],
        );

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.find("shared").unwrap().provider, "first");
        assert_eq!(
            registry.conflicts(),
            &[RegistryConflict {
                rule_id: "shared".to_string(),
                provider: "second".to_string(),
                kept_provider: "first".to_string(),
            }]
        );
    }
}
