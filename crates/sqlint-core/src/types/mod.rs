//! Value types shared across the lint engine.

pub mod common;
pub mod token;

pub use common::{
    CompatLevel, Diagnostic, DiagnosticData, DiagnosticTag, Fix, Position, Range, Severity,
    TextEdit, DIAGNOSTIC_SOURCE,
};
pub use token::{Token, TokenKind};
