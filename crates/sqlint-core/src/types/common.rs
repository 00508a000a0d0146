//! Diagnostic and fix model.
//!
//! These are pure value types with builder-style construction and no behavior
//! beyond equality. The JSON shape follows editor tooling conventions:
//! zero-based positions, numeric severity levels 1-4 plus 0 for none.

use std::borrow::Cow;
use std::fmt;

use schemars::{json_schema, JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Constant tool identifier attached to every diagnostic.
pub const DIAGNOSTIC_SOURCE: &str = "sqlint";

/// A zero-based (line, character) pair in a document.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Zero-based line index.
    pub line: u32,
    /// Zero-based character offset within the line.
    pub character: u32,
}

impl Position {
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// A half-open span between two positions; `start` never exceeds `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        debug_assert!(start <= end, "range start must not be after its end");
        Self { start, end }
    }

    /// A zero-width range, used for pure insertion edits.
    pub const fn at(position: Position) -> Self {
        Self {
            start: position,
            end: position,
        }
    }
}

/// Diagnostic severity, numeric on the wire (0 = none, 1 = error, ... 4 = hint).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    None,
    Error,
    Warning,
    Information,
    Hint,
}

impl Severity {
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Error => 1,
            Self::Warning => 2,
            Self::Information => 3,
            Self::Hint => 4,
        }
    }

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Error),
            2 => Some(Self::Warning),
            3 => Some(Self::Information),
            4 => Some(Self::Hint),
            _ => None,
        }
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        Self::from_u8(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid severity level {value}")))
    }
}

impl JsonSchema for Severity {
    fn schema_name() -> Cow<'static, str> {
        "Severity".into()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "type": "integer",
            "enum": [0, 1, 2, 3, 4]
        })
    }
}

/// Extra semantic hints on a diagnostic, numeric on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticTag {
    Unnecessary,
    Deprecated,
}

impl DiagnosticTag {
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Unnecessary => 1,
            Self::Deprecated => 2,
        }
    }
}

impl Serialize for DiagnosticTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for DiagnosticTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            1 => Ok(Self::Unnecessary),
            2 => Ok(Self::Deprecated),
            other => Err(serde::de::Error::custom(format!(
                "invalid diagnostic tag {other}"
            ))),
        }
    }
}

impl JsonSchema for DiagnosticTag {
    fn schema_name() -> Cow<'static, str> {
        "DiagnosticTag".into()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "type": "integer",
            "enum": [1, 2]
        })
    }
}

/// Rule attribution carried on a diagnostic for fix-capable consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticData {
    pub rule_id: String,
    pub category: String,
    /// True when the owning rule can produce at least one fix for this code.
    pub fixable: bool,
}

/// One reported finding: location, message, and rule metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub range: Range,
    pub message: String,

    /// Explicit severity; `None` falls back to the rule's default during
    /// orchestration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,

    /// Machine-readable rule id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    pub source: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<DiagnosticTag>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DiagnosticData>,
}

impl Diagnostic {
    pub fn new(range: Range, message: impl Into<String>) -> Self {
        Self {
            range,
            message: message.into(),
            severity: None,
            code: None,
            source: DIAGNOSTIC_SOURCE.to_string(),
            tags: Vec::new(),
            data: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_tag(mut self, tag: DiagnosticTag) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn with_data(
        mut self,
        rule_id: impl Into<String>,
        category: impl Into<String>,
        fixable: bool,
    ) -> Self {
        self.data = Some(DiagnosticData {
            rule_id: rule_id.into(),
            category: category.into(),
            fixable,
        });
        self
    }
}

/// A single replacement in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TextEdit {
    pub range: Range,
    pub new_text: String,
}

impl TextEdit {
    pub fn new(range: Range, new_text: impl Into<String>) -> Self {
        Self {
            range,
            new_text: new_text.into(),
        }
    }
}

/// An atomic set of edits resolving one diagnostic. Applying a subset of the
/// edits is undefined behavior and must not be done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Fix {
    pub title: String,
    pub edits: Vec<TextEdit>,
}

impl Fix {
    pub fn new(title: impl Into<String>, edits: Vec<TextEdit>) -> Self {
        Self {
            title: title.into(),
            edits,
        }
    }
}

/// A document's declared SQL dialect version (e.g. 100, 130, 150), gating
/// rule applicability.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct CompatLevel(pub u16);

impl CompatLevel {
    pub const fn new(level: u16) -> Self {
        Self(level)
    }
}

impl fmt::Display for CompatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_round_trips_as_integer() {
        let json = serde_json::to_string(&Severity::Warning).unwrap();
        assert_eq!(json, "2");
        let back: Severity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Severity::Warning);
    }

    #[test]
    fn severity_rejects_out_of_range() {
        let result: Result<Severity, _> = serde_json::from_str("9");
        assert!(result.is_err());
    }

    #[test]
    fn diagnostic_serializes_camel_case_with_numeric_tags() {
        let diagnostic = Diagnostic::new(
            Range::new(Position::new(0, 0), Position::new(0, 5)),
            "trailing whitespace",
        )
        .with_severity(Severity::Hint)
        .with_code("trailing-whitespace")
        .with_tag(DiagnosticTag::Unnecessary)
        .with_data("trailing-whitespace", "whitespace", true);

        let value = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(value["severity"], 4);
        assert_eq!(value["tags"][0], 1);
        assert_eq!(value["source"], "sqlint");
        assert_eq!(value["data"]["fixable"], true);
        assert_eq!(value["range"]["start"]["line"], 0);
    }

    #[test]
    fn optional_fields_are_omitted_when_empty() {
        let diagnostic = Diagnostic::new(Range::at(Position::new(1, 2)), "message");
        let value = serde_json::to_value(&diagnostic).unwrap();
        assert!(value.get("severity").is_none());
        assert!(value.get("code").is_none());
        assert!(value.get("tags").is_none());
        assert!(value.get("data").is_none());
    }

    #[test]
    fn compat_level_orders_numerically() {
        assert!(CompatLevel::new(100) < CompatLevel::new(130));
    }
}
