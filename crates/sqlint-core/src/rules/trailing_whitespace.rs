//! `trailing-whitespace`: a line ends in spaces or tabs.
//!
//! Pure text rule built on the line-oriented diagnostic helper; fixable by
//! deleting the trailing run.

use crate::context::AnalysisContext;
use crate::rule::{Rule, RuleMetadata};
use crate::rules::rule_ids;
use crate::text::line_range_diagnostic;
use crate::types::{Diagnostic, DiagnosticTag, Fix, Position, Range, Severity, TextEdit};

pub struct TrailingWhitespace {
    metadata: RuleMetadata,
}

impl Default for TrailingWhitespace {
    fn default() -> Self {
        Self {
            metadata: RuleMetadata::new(
                rule_ids::TRAILING_WHITESPACE,
                "Line ends with whitespace characters.",
                "whitespace",
            )
            .with_default_severity(Severity::Hint)
            .fixable(),
        }
    }
}

impl Rule for TrailingWhitespace {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn analyze(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for (index, line) in ctx.text.split('\n').enumerate() {
            let content = line.strip_suffix('\r').unwrap_or(line);
            if trailing_span(content).is_none() {
                continue;
            }
            let Ok(diagnostic) = line_range_diagnostic(
                index as i64,
                content.chars().count() as i64,
                "Line has trailing whitespace.",
                rule_ids::TRAILING_WHITESPACE,
                "whitespace",
                true,
            ) else {
                continue;
            };
            diagnostics.push(diagnostic.with_tag(DiagnosticTag::Unnecessary));
        }
        diagnostics
    }

    fn fixes(&self, ctx: &AnalysisContext, diagnostic: &Diagnostic) -> Vec<Fix> {
        if diagnostic.code.as_deref() != Some(rule_ids::TRAILING_WHITESPACE) {
            return Vec::new();
        }

        let line_index = diagnostic.range.start.line;
        let Some(line) = ctx.text.split('\n').nth(line_index as usize) else {
            return Vec::new();
        };
        let content = line.strip_suffix('\r').unwrap_or(line);
        let Some((start_char, end_char)) = trailing_span(content) else {
            return Vec::new();
        };

        let edit = TextEdit::new(
            Range::new(
                Position::new(line_index, start_char),
                Position::new(line_index, end_char),
            ),
            "",
        );
        vec![Fix::new("Remove trailing whitespace", vec![edit])]
    }
}

/// The (start, end) character span of the trailing whitespace run, when any.
fn trailing_span(content: &str) -> Option<(u32, u32)> {
    let trimmed = content.trim_end_matches([' ', '\t']);
    if trimmed.len() == content.len() {
        return None;
    }
    Some((
        trimmed.chars().count() as u32,
        content.chars().count() as u32,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::{check_sql, context_for};

    fn check(sql: &str) -> Vec<Diagnostic> {
        check_sql(&TrailingWhitespace::default(), sql)
    }

    #[test]
    fn clean_lines_produce_nothing() {
        assert!(check("SELECT 1\nFROM t").is_empty());
    }

    #[test]
    fn trailing_spaces_are_flagged_with_full_line_range() {
        let diagnostics = check("SELECT 1   \nFROM t");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].range.start, Position::new(0, 0));
        assert_eq!(diagnostics[0].range.end, Position::new(0, 11));
        assert_eq!(diagnostics[0].tags, vec![DiagnosticTag::Unnecessary]);
    }

    #[test]
    fn trailing_tab_before_crlf_is_flagged() {
        let diagnostics = check("SELECT 1\t\r\nFROM t");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].range.end, Position::new(0, 9));
    }

    #[test]
    fn every_offending_line_is_reported() {
        let diagnostics = check("SELECT 1 \nFROM t\t\nWHERE x = 1");
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[1].range.start.line, 1);
    }

    #[test]
    fn fix_removes_exactly_the_trailing_run() {
        let ctx = context_for("SELECT 1  \nFROM t");
        let rule = TrailingWhitespace::default();
        let diagnostics = rule.analyze(&ctx);
        let fixes = rule.fixes(&ctx, &diagnostics[0]);

        assert_eq!(fixes.len(), 1);
        assert_eq!(fixes[0].edits.len(), 1);
        let edit = &fixes[0].edits[0];
        assert_eq!(edit.range.start, Position::new(0, 8));
        assert_eq!(edit.range.end, Position::new(0, 10));
        assert_eq!(edit.new_text, "");
    }

    #[test]
    fn foreign_diagnostic_yields_no_fix() {
        let ctx = context_for("SELECT 1  \nFROM t");
        let rule = TrailingWhitespace::default();
        let foreign = Diagnostic::new(
            Range::new(Position::new(0, 0), Position::new(0, 1)),
            "something else",
        )
        .with_code("select-star");
        assert!(rule.fixes(&ctx, &foreign).is_empty());
    }
}
