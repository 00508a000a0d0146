//! `drop-table-if-exists`: a `DROP TABLE` without `IF EXISTS`.
//!
//! `DROP TABLE IF EXISTS` is only available from compat level 130 on, so the
//! rule carries a minimum bound and is skipped entirely for older documents.
//! Token-driven, so it also works on scripts whose statement tree failed to
//! parse.

use crate::context::AnalysisContext;
use crate::rule::{Rule, RuleMetadata};
use crate::rules::{rule_ids, significant_tokens, token_range};
use crate::types::{CompatLevel, Diagnostic, Fix, Position, Range, TextEdit, Token};

pub struct DropTableIfExists {
    metadata: RuleMetadata,
}

impl Default for DropTableIfExists {
    fn default() -> Self {
        Self {
            metadata: RuleMetadata::new(
                rule_ids::DROP_TABLE_IF_EXISTS,
                "DROP TABLE without IF EXISTS fails when the table is absent.",
                "safety",
            )
            .with_min_compat_level(CompatLevel::new(130))
            .fixable(),
        }
    }
}

impl Rule for DropTableIfExists {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn analyze(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        bare_drop_tables(&ctx.tokens)
            .map(|(drop, table)| {
                Diagnostic::new(
                    Range::new(drop.start, token_range(table).end),
                    "DROP TABLE without IF EXISTS raises an error when the table does not exist.",
                )
                .with_code(rule_ids::DROP_TABLE_IF_EXISTS)
            })
            .collect()
    }

    fn fixes(&self, ctx: &AnalysisContext, diagnostic: &Diagnostic) -> Vec<Fix> {
        if diagnostic.code.as_deref() != Some(rule_ids::DROP_TABLE_IF_EXISTS) {
            return Vec::new();
        }

        bare_drop_tables(&ctx.tokens)
            .find(|(drop, table)| {
                Range::new(drop.start, token_range(table).end) == diagnostic.range
            })
            .map(|(_, table)| {
                let insert_at = Position::new(
                    table.start.line,
                    table.start.character + table.length,
                );
                let edit = TextEdit::new(Range::at(insert_at), " IF EXISTS");
                vec![Fix::new("Add IF EXISTS", vec![edit])]
            })
            .unwrap_or_default()
    }
}

/// `(DROP, TABLE)` keyword pairs not followed by `IF`, in stream order.
fn bare_drop_tables(tokens: &[Token]) -> impl Iterator<Item = (&Token, &Token)> {
    let significant: Vec<&Token> = significant_tokens(tokens).collect();
    let mut pairs = Vec::new();
    for window_start in 0..significant.len() {
        let drop = significant[window_start];
        if !drop.is_keyword("DROP") {
            continue;
        }
        let Some(table) = significant.get(window_start + 1) else {
            continue;
        };
        if !table.is_keyword("TABLE") {
            continue;
        }
        let guarded = significant
            .get(window_start + 2)
            .is_some_and(|next| next.is_keyword("IF"));
        if !guarded {
            pairs.push((drop, *table));
        }
    }
    pairs.into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AnalysisContext, AnalysisSettings};
    use crate::rules::test_support::{check_sql, context_for};

    fn check(sql: &str) -> Vec<Diagnostic> {
        check_sql(&DropTableIfExists::default(), sql)
    }

    #[test]
    fn bare_drop_table_is_flagged() {
        let diagnostics = check("DROP TABLE archive");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].range.start, Position::new(0, 0));
        assert_eq!(diagnostics[0].range.end, Position::new(0, 10));
    }

    #[test]
    fn guarded_drop_table_is_clean() {
        assert!(check("DROP TABLE IF EXISTS archive").is_empty());
    }

    #[test]
    fn drop_view_is_out_of_scope() {
        assert!(check("DROP VIEW recent_orders").is_empty());
    }

    #[test]
    fn each_bare_drop_is_reported() {
        let diagnostics = check("DROP TABLE a;\nDROP TABLE IF EXISTS b;\nDROP TABLE c;");
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[1].range.start.line, 2);
    }

    #[test]
    fn rule_declares_minimum_compat_level() {
        let rule = DropTableIfExists::default();
        assert_eq!(
            rule.metadata().min_compat_level,
            Some(CompatLevel::new(130))
        );
    }

    #[test]
    fn fix_inserts_if_exists_after_table_keyword() {
        let ctx = context_for("DROP TABLE archive");
        let rule = DropTableIfExists::default();
        let diagnostics = rule.analyze(&ctx);
        let fixes = rule.fixes(&ctx, &diagnostics[0]);

        assert_eq!(fixes.len(), 1);
        let edit = &fixes[0].edits[0];
        assert_eq!(edit.range, Range::at(Position::new(0, 10)));
        assert_eq!(edit.new_text, " IF EXISTS");
    }

    #[test]
    fn works_without_a_statement_tree() {
        // Broken tail keeps the parser from producing a tree; tokens remain.
        let ctx = AnalysisContext::build(
            "broken.sql",
            "DROP TABLE archive; SELECT FROM",
            CompatLevel::new(150),
            AnalysisSettings::default(),
        );
        assert!(ctx.statements.is_none());
        let diagnostics = DropTableIfExists::default().analyze(&ctx);
        assert_eq!(diagnostics.len(), 1);
    }
}
