//! Boundary to the external SQL parser and tokenizer.
//!
//! `sqlparser` turns document text into a statement tree and a located token
//! stream; this module normalizes both into the engine's shapes: zero-based
//! positions, classified tokens, and a nullable tree root with separate
//! structural, tokenization, and unexpected-failure channels.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::OnceLock;

use regex::Regex;
use sqlparser::ast::Statement;
use sqlparser::dialect::GenericDialect;
use sqlparser::keywords::Keyword;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token as RawToken, TokenWithSpan, Tokenizer, Whitespace};

use crate::error::panic_message;
use crate::types::{Position, Token, TokenKind};

/// One parse or tokenization problem, position recovered when available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIssue {
    pub message: String,
    pub position: Option<Position>,
}

/// Everything the parser collaborator produced for one document.
#[derive(Debug)]
pub struct ParseOutcome {
    /// Statement tree, absent when structural parsing failed outright.
    pub statements: Option<Vec<Statement>>,
    pub parse_errors: Vec<ParseIssue>,
    pub tokenize_errors: Vec<ParseIssue>,
    /// Set when the parser failed in an unexpected way (a caught panic)
    /// rather than returning a structured error.
    pub failure: Option<String>,
    /// Token stream with normalized zero-based positions.
    pub tokens: Vec<Token>,
}

/// Parses and tokenizes one document.
pub fn parse_document(text: &str) -> ParseOutcome {
    let dialect = GenericDialect {};
    let parsed = catch_unwind(AssertUnwindSafe(|| Parser::parse_sql(&dialect, text)));

    let (statements, parse_errors, failure) = match parsed {
        Ok(Ok(statements)) => (Some(statements), Vec::new(), None),
        Ok(Err(error)) => (None, vec![issue_from_message(&error.to_string())], None),
        Err(payload) => (None, Vec::new(), Some(panic_message(payload))),
    };

    let (tokens, tokenize_errors) = tokenize_document(text);

    ParseOutcome {
        statements,
        parse_errors,
        tokenize_errors,
        failure,
        tokens,
    }
}

/// Tokenizes one document into the normalized token stream.
pub fn tokenize_document(text: &str) -> (Vec<Token>, Vec<ParseIssue>) {
    let dialect = GenericDialect {};
    let mut tokenizer = Tokenizer::new(&dialect, text);
    match tokenizer.tokenize_with_location() {
        Ok(raw) => (raw.iter().map(normalize_token).collect(), Vec::new()),
        Err(error) => (Vec::new(), vec![issue_from_message(&error.to_string())]),
    }
}

fn normalize_token(raw: &TokenWithSpan) -> Token {
    let text = raw.token.to_string();
    // sqlparser locations are 1-based; the engine's positions are 0-based.
    let start = Position::new(
        raw.span.start.line.saturating_sub(1) as u32,
        raw.span.start.column.saturating_sub(1) as u32,
    );
    Token {
        start,
        length: text.chars().count() as u32,
        kind: classify_token(&raw.token),
        text,
    }
}

fn classify_token(token: &RawToken) -> TokenKind {
    match token {
        RawToken::Word(word) if word.keyword != Keyword::NoKeyword => TokenKind::Keyword,
        RawToken::Word(_) => TokenKind::Identifier,
        RawToken::Number(_, _)
        | RawToken::SingleQuotedString(_)
        | RawToken::DoubleQuotedString(_)
        | RawToken::NationalStringLiteral(_)
        | RawToken::EscapedStringLiteral(_)
        | RawToken::HexStringLiteral(_) => TokenKind::Literal,
        RawToken::Eq
        | RawToken::Neq
        | RawToken::Lt
        | RawToken::Gt
        | RawToken::LtEq
        | RawToken::GtEq
        | RawToken::Plus
        | RawToken::Minus
        | RawToken::Mul
        | RawToken::Div
        | RawToken::Mod
        | RawToken::StringConcat => TokenKind::Operator,
        RawToken::Comma
        | RawToken::Period
        | RawToken::LParen
        | RawToken::RParen
        | RawToken::SemiColon
        | RawToken::LBracket
        | RawToken::RBracket
        | RawToken::LBrace
        | RawToken::RBrace
        | RawToken::Colon
        | RawToken::DoubleColon
        | RawToken::Assignment => TokenKind::Symbol,
        RawToken::Whitespace(Whitespace::SingleLineComment { .. })
        | RawToken::Whitespace(Whitespace::MultiLineComment(_)) => TokenKind::Comment,
        RawToken::Whitespace(_) => TokenKind::Whitespace,
        _ => TokenKind::Other,
    }
}

/// Recovers "Line: X, Column: Y" position information from a `sqlparser`
/// error message and normalizes it to zero-based.
fn issue_from_message(message: &str) -> ParseIssue {
    static POSITION_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = POSITION_REGEX.get_or_init(|| {
        Regex::new(r"Line:\s*(\d+)\s*,\s*Column:\s*(\d+)").expect("Invalid regex pattern")
    });

    let position = re.captures(message).and_then(|caps| {
        let line: u32 = caps.get(1)?.as_str().parse().ok()?;
        let column: u32 = caps.get(2)?.as_str().parse().ok()?;
        Some(Position::new(line.saturating_sub(1), column.saturating_sub(1)))
    });

    ParseIssue {
        message: message.to_string(),
        position,
    }
}
