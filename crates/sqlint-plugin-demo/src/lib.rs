//! Demonstration plugin: one provider with one rule.
//!
//! Build as a `cdylib` and hand its path to the host's plugin loader. The
//! [`sqlint_core::export_plugin!`] invocation at the bottom stamps the
//! declaration the loader resolves; everything else is an ordinary rule
//! implementation against the core contracts.

use sqlint_core::{
    AnalysisContext, Diagnostic, PluginRegistrar, Position, Range, Rule, RuleMetadata,
    RuleProvider, PLUGIN_API_VERSION,
};

/// Flags explicit `CROSS JOIN`s, which are usually accidental row explosions.
pub struct AvoidCrossJoin {
    metadata: RuleMetadata,
}

impl Default for AvoidCrossJoin {
    fn default() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "avoid-cross-join",
                "CROSS JOIN multiplies row counts; make the join condition explicit.",
                "joins",
            ),
        }
    }
}

impl Rule for AvoidCrossJoin {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn analyze(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let significant: Vec<_> = ctx.tokens.iter().filter(|t| !t.is_trivia()).collect();
        significant
            .windows(2)
            .filter(|pair| pair[0].is_keyword("CROSS") && pair[1].is_keyword("JOIN"))
            .map(|pair| {
                let end = Position::new(
                    pair[1].start.line,
                    pair[1].start.character + pair[1].length,
                );
                Diagnostic::new(
                    Range::new(pair[0].start, end),
                    "CROSS JOIN produces a cartesian product; join on a condition instead.",
                )
            })
            .collect()
    }
}

/// The provider bundle this plugin contributes.
pub struct DemoRuleProvider;

impl RuleProvider for DemoRuleProvider {
    fn name(&self) -> &str {
        "sqlint.demo"
    }

    fn plugin_api_version(&self) -> u32 {
        PLUGIN_API_VERSION
    }

    fn rules(&self) -> Vec<Box<dyn Rule>> {
        vec![Box::new(AvoidCrossJoin::default())]
    }
}

fn register(registrar: &mut dyn PluginRegistrar) {
    registrar.register_provider(&|| Box::new(DemoRuleProvider) as Box<dyn RuleProvider>);
}

sqlint_core::export_plugin!(register);

#[cfg(test)]
mod tests {
    use super::*;
    use sqlint_core::{AnalysisSettings, CompatLevel};

    fn check(sql: &str) -> Vec<Diagnostic> {
        let ctx = AnalysisContext::build(
            "demo.sql",
            sql,
            CompatLevel::new(150),
            AnalysisSettings::default(),
        );
        AvoidCrossJoin::default().analyze(&ctx)
    }

    #[test]
    fn cross_join_is_flagged() {
        let diagnostics = check("SELECT 1 FROM a CROSS JOIN b");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].range.start, Position::new(0, 16));
    }

    #[test]
    fn conditional_join_is_clean() {
        assert!(check("SELECT 1 FROM a JOIN b ON a.id = b.id").is_empty());
    }

    #[test]
    fn provider_declares_current_api_version() {
        assert_eq!(DemoRuleProvider.plugin_api_version(), PLUGIN_API_VERSION);
    }
}
