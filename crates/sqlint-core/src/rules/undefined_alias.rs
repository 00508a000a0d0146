//! `undefined-alias`: a qualified column reference uses an alias that is not
//! visible at that point of the query.
//!
//! Visibility is lexical: an alias introduced at any enclosing query level is
//! in scope, which is what makes correlated subqueries legal. Only two-part
//! references (`alias.column`) are checked; longer chains are
//! schema-qualified names, not alias references.

use sqlparser::ast::*;

use crate::context::AnalysisContext;
use crate::rule::{Rule, RuleMetadata};
use crate::rules::rule_ids;
use crate::scope::{AliasScopes, Scope};
use crate::text::{byte_offset_to_position, find_identifier};
use crate::types::{Diagnostic, Position, Range, Severity};

pub struct UndefinedAlias {
    metadata: RuleMetadata,
}

impl Default for UndefinedAlias {
    fn default() -> Self {
        Self {
            metadata: RuleMetadata::new(
                rule_ids::UNDEFINED_ALIAS,
                "Qualified reference to a table alias that is not in scope.",
                "aliasing",
            )
            .with_default_severity(Severity::Error),
        }
    }
}

impl Rule for UndefinedAlias {
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
    // Names introduced at this nesting level: CTE names plus everything the
    // FROM clauses bring into scope.
    let mut scope = Scope::new();
    if let Some(ref with) = query.with {
        for cte in &with.cte_tables {
            scope.insert(&cte.alias.name.value);
        }
    }
    collect_set_expr_names(&query.body, &mut scope);

    scopes.scoped(scope, |scopes| {
        if let Some(ref with) = query.with {
            for cte in &with.cte_tables {
                check_query(&cte.query, scopes, ctx, diagnostics);
            }
        }
        check_set_expr(&query.body, scopes, ctx, diagnostics);
        if let Some(ref order_by) = query.order_by {
            if let OrderByKind::Expressions(exprs) = &order_by.kind {
                for order_expr in exprs {
                    check_expr(&order_expr.expr, scopes, ctx, diagnostics);
                }
            }
        }
    });
}

fn collect_set_expr_names(body: &SetExpr, scope: &mut Scope) {
    match body {
        SetExpr::Select(select) => {
            for table_with_joins in &select.from {
                collect_relation_names(&table_with_joins.relation, scope);
                for join in &table_with_joins.joins {
                    collect_relation_names(&join.relation, scope);
                }
            }
        }
        SetExpr::SetOperation { left, right, .. } => {
            collect_set_expr_names(left, scope);
            collect_set_expr_names(right, scope);
        }
        _ => {}
    }
}

fn collect_relation_names(relation: &TableFactor, scope: &mut Scope) {
    match relation {
        TableFactor::Table { name, alias, .. } => {
            if let Some(alias) = alias {
                scope.insert(&alias.name.value);
            } else {
                // An unaliased table is referencable by its bare name and by
                // its qualified spelling.
                if let Some(last) = name.0.last().and_then(ObjectNamePart::as_ident) {
                    scope.insert(&last.value);
                }
                scope.insert(&name.to_string());
            }
        }
        TableFactor::Derived {
            alias: Some(alias), ..
        } => {
            scope.insert(&alias.name.value);
        }
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => {
            collect_relation_names(&table_with_joins.relation, scope);
            for join in &table_with_joins.joins {
                collect_relation_names(&join.relation, scope);
            }
        }
        TableFactor::Function {
            alias: Some(alias), ..
        }
        | TableFactor::UNNEST {
            alias: Some(alias), ..
        } => {
            scope.insert(&alias.name.value);
        }
        TableFactor::Pivot { table, .. }
        | TableFactor::Unpivot { table, .. }
        | TableFactor::MatchRecognize { table, .. } => collect_relation_names(table, scope),
        _ => {}
    }
}

fn check_set_expr(
    body: &SetExpr,
    scopes: &mut AliasScopes,
    ctx: &AnalysisContext,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match body {
        SetExpr::Select(select) => check_select(select, scopes, ctx, diagnostics),
        SetExpr::Query(query) => check_query(query, scopes, ctx, diagnostics),
        SetExpr::SetOperation { left, right, .. } => {
            check_set_expr(left, scopes, ctx, diagnostics);
            check_set_expr(right, scopes, ctx, diagnostics);
        }
        SetExpr::Values(values) => {
            for row in &values.rows {
                for expr in row {
                    check_expr(expr, scopes, ctx, diagnostics);
                }
            }
        }
        _ => {}
    }
}

fn check_select(
    select: &Select,
    scopes: &mut AliasScopes,
    ctx: &AnalysisContext,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for table_with_joins in &select.from {
        check_relation(&table_with_joins.relation, scopes, ctx, diagnostics);
        for join in &table_with_joins.joins {
            check_relation(&join.relation, scopes, ctx, diagnostics);
            if let Some(constraint) = join_constraint(&join.join_operator) {
                check_expr(constraint, scopes, ctx, diagnostics);
            }
        }
    }

    for item in &select.projection {
        match item {
            SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => {
                check_expr(expr, scopes, ctx, diagnostics);
            }
            SelectItem::QualifiedWildcard(name, _) => {
                // `alias.*` carries a single-part qualifier; anything longer
                // is schema-qualified and not an alias reference.
                let spelled = name.to_string();
                let parts: Vec<&str> = spelled.split('.').collect();
                if parts.len() == 1 {
                    let qualifier = parts[0].trim_matches(|ch| matches!(ch, '"' | '`' | '[' | ']'));
                    if !scopes.is_defined(qualifier) {
                        diagnostics.push(alias_diagnostic(qualifier, ctx));
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(ref selection) = select.selection {
        check_expr(selection, scopes, ctx, diagnostics);
    }
    if let GroupByExpr::Expressions(exprs, _) = &select.group_by {
        for expr in exprs {
            check_expr(expr, scopes, ctx, diagnostics);
        }
    }
    if let Some(ref having) = select.having {
        check_expr(having, scopes, ctx, diagnostics);
    }
    if let Some(ref qualify) = select.qualify {
        check_expr(qualify, scopes, ctx, diagnostics);
    }
}

fn check_relation(
    relation: &TableFactor,
    scopes: &mut AliasScopes,
    ctx: &AnalysisContext,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match relation {
        TableFactor::Derived { subquery, .. } => check_query(subquery, scopes, ctx, diagnostics),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => {
            check_relation(&table_with_joins.relation, scopes, ctx, diagnostics);
            for join in &table_with_joins.joins {
                check_relation(&join.relation, scopes, ctx, diagnostics);
                if let Some(constraint) = join_constraint(&join.join_operator) {
                    check_expr(constraint, scopes, ctx, diagnostics);
                }
            }
        }
        TableFactor::UNNEST { array_exprs, .. } => {
            for expr in array_exprs {
                check_expr(expr, scopes, ctx, diagnostics);
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

fn check_expr(
    expr: &Expr,
    scopes: &mut AliasScopes,
    ctx: &AnalysisContext,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match expr {
        Expr::CompoundIdentifier(parts) => {
            if parts.len() == 2 && !scopes.is_defined(&parts[0].value) {
                diagnostics.push(alias_diagnostic(&parts[0].value, ctx));
            }
        }
        Expr::BinaryOp { left, right, .. } => {
            check_expr(left, scopes, ctx, diagnostics);
            check_expr(right, scopes, ctx, diagnostics);
        }
        Expr::UnaryOp { expr: inner, .. } | Expr::Nested(inner) => {
            check_expr(inner, scopes, ctx, diagnostics);
        }
        Expr::Case {
            operand,
            conditions,
            else_result,
            ..
        } => {
            if let Some(operand) = operand {
                check_expr(operand, scopes, ctx, diagnostics);
            }
            for case_when in conditions {
                check_expr(&case_when.condition, scopes, ctx, diagnostics);
                check_expr(&case_when.result, scopes, ctx, diagnostics);
            }
            if let Some(else_result) = else_result {
                check_expr(else_result, scopes, ctx, diagnostics);
            }
        }
        Expr::Function(func) => check_function(func, scopes, ctx, diagnostics),
        Expr::Cast { expr: inner, .. }
        | Expr::IsNull(inner)
        | Expr::IsNotNull(inner) => check_expr(inner, scopes, ctx, diagnostics),
        Expr::InSubquery {
            expr: inner,
            subquery,
            ..
        } => {
            check_expr(inner, scopes, ctx, diagnostics);
            check_query(subquery, scopes, ctx, diagnostics);
        }
        Expr::Subquery(subquery) | Expr::Exists { subquery, .. } => {
            check_query(subquery, scopes, ctx, diagnostics);
        }
        Expr::Between {
            expr: inner,
            low,
            high,
            ..
        } => {
            check_expr(inner, scopes, ctx, diagnostics);
            check_expr(low, scopes, ctx, diagnostics);
            check_expr(high, scopes, ctx, diagnostics);
        }
        Expr::InList { expr: inner, list, .. } => {
            check_expr(inner, scopes, ctx, diagnostics);
            for item in list {
                check_expr(item, scopes, ctx, diagnostics);
            }
        }
        Expr::AnyOp { left, right, .. } | Expr::AllOp { left, right, .. } => {
            check_expr(left, scopes, ctx, diagnostics);
            check_expr(right, scopes, ctx, diagnostics);
        }
        _ => {}
    }
}

fn check_function(
    func: &Function,
    scopes: &mut AliasScopes,
    ctx: &AnalysisContext,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match &func.args {
        FunctionArguments::Subquery(query) => check_query(query, scopes, ctx, diagnostics),
        FunctionArguments::List(arg_list) => {
            for arg in &arg_list.args {
                match arg {
                    FunctionArg::Unnamed(FunctionArgExpr::Expr(expr))
                    | FunctionArg::Named {
                        arg: FunctionArgExpr::Expr(expr),
                        ..
                    } => check_expr(expr, scopes, ctx, diagnostics),
                    _ => {}
                }
            }
        }
        FunctionArguments::None => {}
    }
    if let Some(ref filter) = func.filter {
        check_expr(filter, scopes, ctx, diagnostics);
    }
    for order_expr in &func.within_group {
        check_expr(&order_expr.expr, scopes, ctx, diagnostics);
    }
    if let Some(WindowType::WindowSpec(spec)) = &func.over {
        for expr in &spec.partition_by {
            check_expr(expr, scopes, ctx, diagnostics);
        }
        for order_expr in &spec.order_by {
            check_expr(&order_expr.expr, scopes, ctx, diagnostics);
        }
    }
}

fn join_constraint(op: &JoinOperator) -> Option<&Expr> {
    let constraint = match op {
        JoinOperator::Join(c)
        | JoinOperator::Inner(c)
        | JoinOperator::Left(c)
        | JoinOperator::LeftOuter(c)
        | JoinOperator::Right(c)
        | JoinOperator::RightOuter(c)
        | JoinOperator::FullOuter(c)
        | JoinOperator::CrossJoin(c)
        | JoinOperator::Semi(c)
        | JoinOperator::LeftSemi(c)
        | JoinOperator::RightSemi(c)
        | JoinOperator::Anti(c)
        | JoinOperator::LeftAnti(c)
        | JoinOperator::RightAnti(c)
        | JoinOperator::StraightJoin(c) => c,
        JoinOperator::AsOf { constraint, .. } => constraint,
        JoinOperator::CrossApply | JoinOperator::OuterApply => return None,
    };
    match constraint {
        JoinConstraint::On(expr) => Some(expr),
        _ => None,
    }
}

fn alias_diagnostic(name: &str, ctx: &AnalysisContext) -> Diagnostic {
    let range = find_identifier(&ctx.text, name, 0)
        .map(|(start, end)| {
            Range::new(
                byte_offset_to_position(&ctx.text, start),
                byte_offset_to_position(&ctx.text, end),
            )
        })
        .unwrap_or_else(|| Range::at(Position::new(0, 0)));
    Diagnostic::new(
        range,
        format!("Alias '{name}' is not defined in this scope or any enclosing scope."),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::check_sql;

    fn check(sql: &str) -> Vec<Diagnostic> {
        check_sql(&UndefinedAlias::default(), sql)
    }

    #[test]
    fn defined_alias_is_clean() {
        let diagnostics = check("SELECT u.name FROM users u");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn unknown_alias_is_flagged() {
        let diagnostics = check("SELECT x.name FROM users u");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("'x'"));
    }

    #[test]
    fn unaliased_table_name_is_a_valid_qualifier() {
        let diagnostics = check("SELECT users.name FROM users");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn alias_lookup_is_case_insensitive() {
        let diagnostics = check("SELECT U.name FROM users u");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn correlated_subquery_sees_outer_alias() {
        let diagnostics = check(
            "SELECT u.name FROM users u \
             WHERE EXISTS (SELECT 1 FROM orders o WHERE o.user_id = u.id)",
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn deeply_nested_correlation_sees_every_ancestor() {
        let diagnostics = check(
            "SELECT u.name FROM users u \
             WHERE EXISTS (SELECT 1 FROM orders o \
                           WHERE EXISTS (SELECT 1 FROM items i \
                                         WHERE i.order_id = o.id AND i.owner = u.id))",
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn inner_alias_is_not_visible_outside_its_subquery() {
        let diagnostics = check(
            "SELECT o.id FROM users u \
             WHERE EXISTS (SELECT 1 FROM orders o WHERE o.user_id = u.id)",
        );
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("'o'"));
    }

    #[test]
    fn cte_name_is_in_scope_for_the_outer_query() {
        let diagnostics = check(
            "WITH recent AS (SELECT id FROM orders) SELECT recent.id FROM recent",
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn derived_table_alias_is_in_scope() {
        let diagnostics =
            check("SELECT d.id FROM (SELECT id FROM orders) d WHERE d.id > 0");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn join_aliases_are_in_scope_in_on_clauses() {
        let diagnostics =
            check("SELECT u.id FROM users u JOIN orders o ON o.user_id = u.id");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn three_part_names_are_not_alias_references() {
        let diagnostics = check("SELECT warehouse.users.name FROM users");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn qualified_wildcard_qualifier_is_checked() {
        let diagnostics = check("SELECT z.* FROM users u");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("'z'"));
    }

    #[test]
    fn flagged_reference_carries_a_source_range() {
        let sql = "SELECT x.name FROM users u";
        let diagnostics = check(sql);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].range.start.line, 0);
        assert_eq!(diagnostics[0].range.start.character, 7);
        assert_eq!(diagnostics[0].range.end.character, 8);
    }

    #[test]
    fn unparsable_document_yields_nothing() {
        let diagnostics = check("SELECT FROM WHERE");
        assert!(diagnostics.is_empty());
    }
}
