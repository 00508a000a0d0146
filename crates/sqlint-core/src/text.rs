//! Position and line-oriented text utilities.
//!
//! Used by rules that work on raw text rather than tree nodes. Line counting
//! matches the external tokenizer: `"\r\n"` is one terminator, as is a lone
//! `"\r"` or `"\n"`, so diagnostic ranges stay aligned with source.

use crate::error::InvalidArgument;
use crate::types::{Diagnostic, Position, Range};

/// Dominant line-ending style of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    Crlf,
}

impl LineEnding {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Crlf => "\r\n",
        }
    }
}

/// Converts a zero-based character offset into a zero-based (line, character)
/// pair. Offsets past the end of `text` resolve to the final position.
pub fn offset_to_position(text: &str, offset: usize) -> Position {
    position_where(text, |_, char_index| char_index >= offset)
}

/// Like [`offset_to_position`] but for byte offsets, used when the offset
/// came from byte-oriented search rather than character counting.
pub fn byte_offset_to_position(text: &str, byte_offset: usize) -> Position {
    position_where(text, |byte_index, _| byte_index >= byte_offset)
}

fn position_where(text: &str, stop: impl Fn(usize, usize) -> bool) -> Position {
    let mut line = 0u32;
    let mut character = 0u32;
    let mut previous = '\0';

    for (char_index, (byte_index, ch)) in text.char_indices().enumerate() {
        if stop(byte_index, char_index) {
            break;
        }
        match ch {
            // The '\r' already advanced the line; its '\n' is zero-width.
            '\n' if previous == '\r' => {}
            '\n' | '\r' => {
                line += 1;
                character = 0;
            }
            _ => character += 1,
        }
        previous = ch;
    }

    Position::new(line, character)
}

/// Builds a diagnostic spanning column 0 to `line_length` on a single line.
///
/// Rejects negative `line` or `line_length`: those are caller bugs, reported
/// through [`InvalidArgument`] rather than silently clamped.
pub fn line_range_diagnostic(
    line: i64,
    line_length: i64,
    message: impl Into<String>,
    code: impl Into<String>,
    category: impl Into<String>,
    fixable: bool,
) -> Result<Diagnostic, InvalidArgument> {
    if line < 0 {
        return Err(InvalidArgument::NegativeLineNumber(line));
    }
    if line_length < 0 {
        return Err(InvalidArgument::NegativeLineLength(line_length));
    }

    let range = Range::new(
        Position::new(line as u32, 0),
        Position::new(line as u32, line_length as u32),
    );
    let code = code.into();
    Ok(Diagnostic::new(range, message)
        .with_code(code.clone())
        .with_data(code, category, fixable))
}

/// Returns the leading whitespace of the line containing `byte_offset`.
pub fn leading_indentation(text: &str, byte_offset: usize) -> &str {
    let clamped = byte_offset.min(text.len());
    let line_start = text[..clamped].rfind('\n').map_or(0, |index| index + 1);
    let line = &text[line_start..];
    let indent_len = line
        .char_indices()
        .find(|(_, ch)| !matches!(ch, ' ' | '\t'))
        .map_or_else(
            || line.find(['\r', '\n']).unwrap_or(line.len()),
            |(index, _)| index,
        );
    &line[..indent_len]
}

/// Detects the document's dominant line-ending style. CRLF wins when both
/// styles appear and the first CRLF occurs no later than the first lone LF.
pub fn detect_line_ending(text: &str) -> LineEnding {
    let first_crlf = text.find("\r\n");
    let first_lone_lf = text
        .char_indices()
        .find(|(index, ch)| *ch == '\n' && (*index == 0 || text.as_bytes()[index - 1] != b'\r'))
        .map(|(index, _)| index);

    match (first_crlf, first_lone_lf) {
        (Some(crlf), Some(lf)) if crlf <= lf => LineEnding::Crlf,
        (Some(_), Some(_)) => LineEnding::Lf,
        (Some(_), None) => LineEnding::Crlf,
        _ => LineEnding::Lf,
    }
}

/// Finds `ident` in `text` starting at byte offset `from`, matching whole
/// identifiers only, case-insensitively. Returns the byte span of the first
/// match. Positions derived from the result go through
/// [`byte_offset_to_position`].
pub fn find_identifier(text: &str, ident: &str, from: usize) -> Option<(usize, usize)> {
    if ident.is_empty() || from > text.len() || !text.is_char_boundary(from) {
        return None;
    }

    let mut search = from;
    while search + ident.len() <= text.len() {
        let Some(relative) = find_ascii_case_insensitive(&text[search..], ident) else {
            return None;
        };
        let start = search + relative;
        let end = start + ident.len();

        let boundary_before = start == 0
            || text[..start]
                .chars()
                .next_back()
                .is_none_or(|ch| !is_identifier_char(ch));
        let boundary_after = end >= text.len()
            || text[end..].chars().next().is_none_or(|ch| !is_identifier_char(ch));

        if boundary_before && boundary_after {
            return Some((start, end));
        }
        search = start + 1;
        while search < text.len() && !text.is_char_boundary(search) {
            search += 1;
        }
    }
    None
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    let haystack_bytes = haystack.as_bytes();
    let needle_bytes = needle.as_bytes();
    (0..=haystack_bytes.len() - needle_bytes.len()).find(|&offset| {
        haystack.is_char_boundary(offset)
            && haystack_bytes[offset..offset + needle_bytes.len()]
                .eq_ignore_ascii_case(needle_bytes)
    })
}

fn is_identifier_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$' || ch == '#'
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("line1\nline2", 6, 1, 0)]
    #[case("a\r\nb", 3, 1, 0)]
    #[case("a\rb", 2, 1, 0)]
    #[case("abc", 2, 0, 2)]
    #[case("", 0, 0, 0)]
    #[case("abc", 99, 0, 3)]
    #[case("a\nb\nc", 4, 2, 0)]
    fn offset_to_position_cases(
        #[case] text: &str,
        #[case] offset: usize,
        #[case] line: u32,
        #[case] character: u32,
    ) {
        assert_eq!(
            offset_to_position(text, offset),
            Position::new(line, character)
        );
    }

    #[test]
    fn crlf_advances_one_position_not_two() {
        // Offset 2 sits between '\r' and '\n'; the line already advanced.
        assert_eq!(offset_to_position("a\r\nb", 2), Position::new(1, 0));
    }

    #[test]
    fn line_range_diagnostic_spans_full_line() {
        let diagnostic =
            line_range_diagnostic(3, 17, "message", "some-rule", "style", false).unwrap();
        assert_eq!(diagnostic.range.start, Position::new(3, 0));
        assert_eq!(diagnostic.range.end, Position::new(3, 17));
        assert_eq!(diagnostic.code.as_deref(), Some("some-rule"));
        let data = diagnostic.data.unwrap();
        assert_eq!(data.category, "style");
        assert!(!data.fixable);
    }

    #[test]
    fn line_range_diagnostic_rejects_negative_line() {
        let error = line_range_diagnostic(-1, 5, "m", "c", "cat", false).unwrap_err();
        assert_eq!(error, InvalidArgument::NegativeLineNumber(-1));
    }

    #[test]
    fn line_range_diagnostic_rejects_negative_length() {
        let error = line_range_diagnostic(0, -5, "m", "c", "cat", false).unwrap_err();
        assert_eq!(error, InvalidArgument::NegativeLineLength(-5));
    }

    #[test]
    fn leading_indentation_of_indented_line() {
        let text = "SELECT 1\n    FROM t\n\tWHERE x";
        assert_eq!(leading_indentation(text, text.find("FROM").unwrap()), "    ");
        assert_eq!(leading_indentation(text, text.find("WHERE").unwrap()), "\t");
        assert_eq!(leading_indentation(text, 0), "");
    }

    #[rstest]
    #[case("a\nb", LineEnding::Lf)]
    #[case("a\r\nb", LineEnding::Crlf)]
    #[case("no terminator", LineEnding::Lf)]
    #[case("a\r\nb\nc", LineEnding::Crlf)]
    #[case("a\nb\r\nc", LineEnding::Lf)]
    fn detects_dominant_line_ending(#[case] text: &str, #[case] expected: LineEnding) {
        assert_eq!(detect_line_ending(text), expected);
    }

    #[test]
    fn find_identifier_matches_whole_words_only() {
        let sql = "SELECT users.id FROM users";
        assert_eq!(find_identifier(sql, "users", 0), Some((7, 12)));
        assert_eq!(find_identifier(sql, "user", 0), None);
        assert_eq!(find_identifier(sql, "USERS", 13), Some((21, 26)));
    }

    #[test]
    fn find_identifier_is_case_insensitive() {
        assert_eq!(find_identifier("from Orders o", "orders", 0), Some((5, 11)));
    }
}
