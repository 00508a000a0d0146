//! Built-in rule bundle.
//!
//! A small set of rules shipped with the engine itself, registered ahead of
//! any plugin-provided rules. Each rule owns its traversal; shared bits live
//! here.

mod drop_table_if_exists;
mod duplicate_alias;
mod select_star;
mod trailing_whitespace;
mod undefined_alias;

pub use drop_table_if_exists::DropTableIfExists;
pub use duplicate_alias::DuplicateAlias;
pub use select_star::SelectStar;
pub use trailing_whitespace::TrailingWhitespace;
pub use undefined_alias::UndefinedAlias;

use crate::rule::{Rule, RuleProvider, PLUGIN_API_VERSION};
use crate::types::{Position, Range, Token};

/// Rule ids of the built-in bundle.
pub mod rule_ids {
    pub const UNDEFINED_ALIAS: &str = "undefined-alias";
    pub const DUPLICATE_ALIAS: &str = "duplicate-alias";
    pub const SELECT_STAR: &str = "select-star";
    pub const TRAILING_WHITESPACE: &str = "trailing-whitespace";
    pub const DROP_TABLE_IF_EXISTS: &str = "drop-table-if-exists";
}

/// The provider bundling the built-in rules.
pub struct BuiltinRuleProvider;

impl RuleProvider for BuiltinRuleProvider {
    fn name(&self) -> &str {
        "sqlint.builtin"
    }

    fn plugin_api_version(&self) -> u32 {
        PLUGIN_API_VERSION
    }

    fn rules(&self) -> Vec<Box<dyn Rule>> {
        vec![
            Box::new(UndefinedAlias::default()),
            Box::new(DuplicateAlias::default()),
            Box::new(SelectStar::default()),
            Box::new(TrailingWhitespace::default()),
            Box::new(DropTableIfExists::default()),
        ]
    }
}

/// Built-in providers in their fixed declaration order.
pub fn builtin_providers() -> Vec<Box<dyn RuleProvider>> {
    vec![Box::new(BuiltinRuleProvider)]
}

/// The range covered by one token.
pub(crate) fn token_range(token: &Token) -> Range {
    Range::new(
        token.start,
        Position::new(token.start.line, token.start.character + token.length),
    )
}

/// Tokens that carry lexical weight, in stream order.
pub(crate) fn significant_tokens(tokens: &[Token]) -> impl Iterator<Item = &Token> {
    tokens.iter().filter(|token| !token.is_trivia())
}
