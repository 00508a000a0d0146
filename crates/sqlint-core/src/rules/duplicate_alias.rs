//! `duplicate-alias`: the same alias name is introduced twice at one query
//! nesting level.
//!
//! Only same-level collisions are flagged; an inner alias reusing an outer
//! name is shadowing, which is legal and deliberately not this rule's
//! concern.

use sqlparser::ast::*;

use crate::context::AnalysisContext;
use crate::rule::{Rule, RuleMetadata};
use crate::rules::rule_ids;
use crate::scope::{AliasScopes, Scope};
use crate::text::{byte_offset_to_position, find_identifier};
use crate::types::{Diagnostic, Position, Range, Severity};

pub struct DuplicateAlias {
    metadata: RuleMetadata,
}

impl Default for DuplicateAlias {
    fn default() -> Self {
        Self {
            metadata: RuleMetadata::new(
                rule_ids::DUPLICATE_ALIAS,
                "The same alias is declared more than once at one query level.",
                "aliasing",
            )
            .with_default_severity(Severity::Error),
        }
    }
}

impl Rule for DuplicateAlias {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn analyze(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for statement in ctx.parsed_statements() {
            let mut scopes = AliasScopes::new();
            check_statement(statement, &mut scopes, ctx, &mut diagnostics);
            debug_assert!(scopes.is_empty());
        }
        diagnostics
    }
}

fn check_statement(
    statement: &Statement,
    scopes: &mut AliasScopes,
    ctx: &AnalysisContext,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match statement {
        Statement::Query(query) => check_query(query, scopes, ctx, diagnostics),
        Statement::Insert(insert) => {
            if let Some(ref source) = insert.source {
                check_query(source, scopes, ctx, diagnostics);
            }
        }
        Statement::CreateView { query, .. } => check_query(query, scopes, ctx, diagnostics),
        Statement::CreateTable(create) => {
            if let Some(ref query) = create.query {
                check_query(query, scopes, ctx, diagnostics);
            }
        }
        _ => {}
    }
}

fn check_query(
    query: &Query,
    scopes: &mut AliasScopes,
    ctx: &AnalysisContext,
    diagnostics: &mut Vec<Diagnostic>,
) {
    scopes.scoped(Scope::new(), |scopes| {
        if let Some(ref with) = query.with {
            for cte in &with.cte_tables {
                if !scopes.define(&cte.alias.name.value) {
                    diagnostics.push(duplicate_diagnostic(&cte.alias.name.value, ctx));
                }
                check_query(&cte.query, scopes, ctx, diagnostics);
            }
        }
        check_set_expr(&query.body, scopes, ctx, diagnostics);
    });
}

fn check_set_expr(
    body: &SetExpr,
    scopes: &mut AliasScopes,
    ctx: &AnalysisContext,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match body {
        SetExpr::Select(select) => {
            for table_with_joins in &select.from {
                check_relation(&table_with_joins.relation, scopes, ctx, diagnostics);
                for join in &table_with_joins.joins {
                    check_relation(&join.relation, scopes, ctx, diagnostics);
                }
            }
        }
        SetExpr::Query(query) => check_query(query, scopes, ctx, diagnostics),
        SetExpr::SetOperation { left, right, .. } => {
            check_set_expr(left, scopes, ctx, diagnostics);
            check_set_expr(right, scopes, ctx, diagnostics);
        }
        _ => {}
    }
}

fn check_relation(
    relation: &TableFactor,
    scopes: &mut AliasScopes,
    ctx: &AnalysisContext,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match relation {
        TableFactor::Table {
            alias: Some(alias), ..
        } => {
            if !scopes.define(&alias.name.value) {
                diagnostics.push(duplicate_diagnostic(&alias.name.value, ctx));
            }
        }
        TableFactor::Derived {
            alias, subquery, ..
        } => {
            if let Some(alias) = alias {
                if !scopes.define(&alias.name.value) {
                    diagnostics.push(duplicate_diagnostic(&alias.name.value, ctx));
                }
            }
            // The derived body is its own nesting level.
            check_query(subquery, scopes, ctx, diagnostics);
        }
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => {
            check_relation(&table_with_joins.relation, scopes, ctx, diagnostics);
            for join in &table_with_joins.joins {
                check_relation(&join.relation, scopes, ctx, diagnostics);
            }
        }
        TableFactor::Pivot { table, .. }
        | TableFactor::Unpivot { table, .. }
        | TableFactor::MatchRecognize { table, .. } => {
            check_relation(table, scopes, ctx, diagnostics);
        }
        _ => {}
    }
}

fn duplicate_diagnostic(name: &str, ctx: &AnalysisContext) -> Diagnostic {
    let range = find_identifier(&ctx.text, name, 0)
        .and_then(|(_, first_end)| find_identifier(&ctx.text, name, first_end))
        .or_else(|| find_identifier(&ctx.text, name, 0))
        .map(|(start, end)| {
            Range::new(
                byte_offset_to_position(&ctx.text, start),
                byte_offset_to_position(&ctx.text, end),
            )
        })
        .unwrap_or_else(|| Range::at(Position::new(0, 0)));
    Diagnostic::new(
        range,
        format!("Alias '{name}' is declared more than once in the same scope."),
    )
}
