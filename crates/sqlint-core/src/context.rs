//! Per-document analysis context.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlparser::ast::Statement;

use crate::parser::{parse_document, ParseIssue};
use crate::types::{CompatLevel, Token};

/// Analysis configuration: master toggle, per-rule disables, and per-rule
/// option objects keyed by rule id.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSettings {
    /// Master toggle for analysis (default: true).
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Rule ids to skip entirely.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_rules: Vec<String>,

    /// Per-rule options, keyed by rule id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rule_configs: BTreeMap<String, serde_json::Value>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            disabled_rules: Vec::new(),
            rule_configs: BTreeMap::new(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

impl AnalysisSettings {
    pub fn is_rule_enabled(&self, rule_id: &str) -> bool {
        self.enabled && !self.disabled_rules.iter().any(|id| id == rule_id)
    }

    pub fn rule_option_bool(&self, rule_id: &str, key: &str) -> Option<bool> {
        self.rule_option(rule_id, key)?.as_bool()
    }

    pub fn rule_option_str(&self, rule_id: &str, key: &str) -> Option<&str> {
        self.rule_option(rule_id, key)?.as_str()
    }

    fn rule_option(&self, rule_id: &str, key: &str) -> Option<&serde_json::Value> {
        self.rule_configs.get(rule_id)?.get(key)
    }
}

/// Immutable input to one orchestration run: one document's text, parse
/// products, declared compat level, and settings. Built once, consumed
/// read-only by every rule, then discarded.
#[derive(Debug)]
pub struct AnalysisContext {
    pub file_path: String,
    pub compat_level: CompatLevel,
    pub text: String,
    /// Statement tree; `None` when structural parsing failed.
    pub statements: Option<Vec<Statement>>,
    pub parse_errors: Vec<ParseIssue>,
    pub tokenize_errors: Vec<ParseIssue>,
    /// Unexpected parser failure, surfaced separately from structural errors.
    pub parser_failure: Option<String>,
    /// Normalized zero-based token stream.
    pub tokens: Vec<Token>,
    pub settings: AnalysisSettings,
}

impl AnalysisContext {
    /// Runs the parser collaborator over `text` and assembles the context.
    pub fn build(
        file_path: impl Into<String>,
        text: impl Into<String>,
        compat_level: CompatLevel,
        settings: AnalysisSettings,
    ) -> Self {
        let text = text.into();
        let outcome = parse_document(&text);
        Self {
            file_path: file_path.into(),
            compat_level,
            text,
            statements: outcome.statements,
            parse_errors: outcome.parse_errors,
            tokenize_errors: outcome.tokenize_errors,
            parser_failure: outcome.failure,
            tokens: outcome.tokens,
            settings,
        }
    }

    /// The parsed statements, empty when the tree root is absent.
    pub fn parsed_statements(&self) -> &[Statement] {
        self.statements.as_deref().unwrap_or_default()
    }
}
