//! `select-star`: a bare `SELECT *` projection.
//!
//! Token-driven: a `*` is flagged when the preceding significant token is the
//! `SELECT` or `DISTINCT` keyword, which leaves `COUNT(*)` and qualified
//! `t.*` spellings alone. Works even when the statement tree is absent.

use crate::context::AnalysisContext;
use crate::rule::{Rule, RuleMetadata};
use crate::rules::{rule_ids, significant_tokens, token_range};
use crate::types::{Diagnostic, TokenKind};

pub struct SelectStar {
    metadata: RuleMetadata,
}

impl Default for SelectStar {
    fn default() -> Self {
        Self {
            metadata: RuleMetadata::new(
                rule_ids::SELECT_STAR,
                "Bare SELECT * projection; enumerate the columns instead.",
                "style",
            ),
        }
    }
}

impl Rule for SelectStar {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn analyze(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let mut previous: Option<&crate::types::Token> = None;

        for token in significant_tokens(&ctx.tokens) {
            if token.kind == TokenKind::Operator
                && token.text == "*"
                && previous.is_some_and(|prev| {
                    prev.is_keyword("SELECT") || prev.is_keyword("DISTINCT")
                })
            {
                diagnostics.push(Diagnostic::new(
                    token_range(token),
                    "Avoid SELECT *; enumerate the projected columns.",
                ));
            }
            previous = Some(token);
        }

        diagnostics
    }
}
