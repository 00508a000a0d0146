//! Rule and rule-provider contracts.
//!
//! A [`Rule`] is one self-contained check; a [`RuleProvider`] is a named
//! bundle of rules and the unit of plugin packaging. Providers built against
//! a different [`PLUGIN_API_VERSION`] are excluded from the registry before
//! any of their analysis code runs.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::context::AnalysisContext;
use crate::types::{CompatLevel, Diagnostic, Fix, Severity};

/// The host's current plugin API version. Providers are admitted only on an
/// exact match; no forward or partial compatibility is attempted.
pub const PLUGIN_API_VERSION: u32 = 3;

/// Static description of one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleMetadata {
    /// Globally unique rule id; also used as the diagnostic `code`.
    pub rule_id: String,
    pub description: String,
    pub category: String,
    /// Severity applied to diagnostics that do not set one explicitly.
    pub default_severity: Severity,
    /// True when the rule's fix operation can produce edits.
    pub fixable: bool,
    /// Lowest compat level (inclusive) this rule applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_compat_level: Option<CompatLevel>,
    /// Highest compat level (inclusive) this rule applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_compat_level: Option<CompatLevel>,
}

impl RuleMetadata {
    pub fn new(
        rule_id: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            description: description.into(),
            category: category.into(),
            default_severity: Severity::Warning,
            fixable: false,
            min_compat_level: None,
            max_compat_level: None,
        }
    }

    pub fn with_default_severity(mut self, severity: Severity) -> Self {
        self.default_severity = severity;
        self
    }

    pub fn fixable(mut self) -> Self {
        self.fixable = true;
        self
    }

    pub fn with_min_compat_level(mut self, level: CompatLevel) -> Self {
        self.min_compat_level = Some(level);
        self
    }

    pub fn with_max_compat_level(mut self, level: CompatLevel) -> Self {
        self.max_compat_level = Some(level);
        self
    }

    /// True when `level` falls inside this rule's compat bounds.
    pub fn applies_to(&self, level: CompatLevel) -> bool {
        self.min_compat_level.is_none_or(|min| level >= min)
            && self.max_compat_level.is_none_or(|max| level <= max)
    }
}

/// One lint check. Implementations are stateless between invocations: any
/// working structure (such as an alias scope stack) is allocated fresh inside
/// `analyze` and never escapes it, so rules are safe to run concurrently.
pub trait Rule: Send + Sync {
    fn metadata(&self) -> &RuleMetadata;

    /// Checks one document and returns all findings, in emission order.
    /// Pure and CPU-bound; no side effects beyond the returned diagnostics.
    fn analyze(&self, ctx: &AnalysisContext) -> Vec<Diagnostic>;

    /// Produces fixes for a diagnostic previously returned by this rule's
    /// `analyze` on an equivalent context. For any other diagnostic the
    /// result is empty.
    fn fixes(&self, ctx: &AnalysisContext, diagnostic: &Diagnostic) -> Vec<Fix> {
        let _ = (ctx, diagnostic);
        Vec::new()
    }
}

/// A named bundle of rules; the unit of plugin packaging.
pub trait RuleProvider: Send + Sync {
    fn name(&self) -> &str;

    /// The plugin API version this provider was built against. Only an exact
    /// match with [`PLUGIN_API_VERSION`] admits the provider's rules.
    fn plugin_api_version(&self) -> u32;

    /// The provider's rules, in its own declared order.
    fn rules(&self) -> Vec<Box<dyn Rule>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compat_bounds_are_inclusive() {
        let metadata = RuleMetadata::new("r", "d", "c")
            .with_min_compat_level(CompatLevel::new(130))
            .with_max_compat_level(CompatLevel::new(150));

        assert!(!metadata.applies_to(CompatLevel::new(100)));
        assert!(metadata.applies_to(CompatLevel::new(130)));
        assert!(metadata.applies_to(CompatLevel::new(150)));
        assert!(!metadata.applies_to(CompatLevel::new(160)));
    }

    #[test]
    fn unbounded_metadata_applies_everywhere() {
        let metadata = RuleMetadata::new("r", "d", "c");
        assert!(metadata.applies_to(CompatLevel::new(80)));
        assert!(metadata.applies_to(CompatLevel::new(160)));
    }

    #[test]
    fn metadata_serializes_camel_case() {
        let metadata = RuleMetadata::new("select-star", "Avoid SELECT *", "style")
            .with_min_compat_level(CompatLevel::new(130));
        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["ruleId"], "select-star");
        assert_eq!(value["defaultSeverity"], 2);
        assert_eq!(value["minCompatLevel"], 130);
        assert!(value.get("maxCompatLevel").is_none());
    }
}
