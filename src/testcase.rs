//! Test cases live in the program source itself, as a JSON array on the first non-empty line
//! behind a fixed marker:
//!
//! ```text
//! %% cTMIDE-TestCases: [{"input":"ab","expectedOutput":"ba","type":"exact"}]
//! ```
//!
//! Because the marker line starts with `%%` the transition parser treats it as a comment.
//! This module reads and rewrites that line without touching the rest of the source.

use crate::types::{CtmError, Symbol, BLANK_SYMBOL, INPUT_BLANK_SYMBOL};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Prefix of the test-case line.
pub const TEST_CASES_MARKER: &str = "%% cTMIDE-TestCases:";

/// An `(input, expected output)` pair evaluated by the test harness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
    #[serde(rename = "type", default)]
    pub kind: MatchKind,
}

/// How the halted tape is compared. Only exact matching exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// The tape from the head to its end must equal the expected output.
    #[default]
    Exact,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
            kind: MatchKind::Exact,
        }
    }

    /// One symbol per input character; spaces stand for blank cells.
    pub fn input_symbols(&self) -> Vec<Symbol> {
        input_symbols(&self.input)
    }
}

/// Splits `input` into tape symbols, substituting blank for every space.
pub fn input_symbols(input: &str) -> Vec<Symbol> {
    input
        .chars()
        .map(|c| if c == INPUT_BLANK_SYMBOL { BLANK_SYMBOL } else { c })
        .collect()
}

/// Location of the marker line within a source.
struct MarkerLine<'a> {
    /// Byte range of the whole line, including its line ending.
    range: Range<usize>,
    /// The line ending that terminated the line, if any.
    ending: &'a str,
    json: &'a str,
}

/// Finds the marker line, which only counts when it is the first non-empty line.
fn find_marker_line(source: &str) -> Option<MarkerLine<'_>> {
    let mut offset = 0;

    for chunk in source.split_inclusive('\n') {
        let start = offset;
        offset += chunk.len();

        let trimmed = chunk.trim();
        if trimmed.is_empty() {
            continue;
        }

        let json = trimmed.strip_prefix(TEST_CASES_MARKER)?;
        let ending = if chunk.ends_with("\r\n") {
            "\r\n"
        } else if chunk.ends_with('\n') {
            "\n"
        } else {
            ""
        };

        return Some(MarkerLine {
            range: start..offset,
            ending,
            json: json.trim(),
        });
    }

    None
}

/// Reads the embedded test cases. A source without the marker line has none.
///
/// # Returns
///
/// * `Err(CtmError::TestCases)` if the marker line holds malformed JSON.
pub fn read_cases(source: &str) -> Result<Vec<TestCase>, CtmError> {
    match find_marker_line(source) {
        Some(marker) => {
            serde_json::from_str(marker.json).map_err(|e| CtmError::TestCases(e.to_string()))
        }
        None => Ok(Vec::new()),
    }
}

/// Returns `source` with its test-case line replaced by `cases`.
///
/// An empty list removes the line. When the source has no marker line one is inserted at
/// the top. Every other line is left untouched.
pub fn write_cases(source: &str, cases: &[TestCase]) -> Result<String, CtmError> {
    let marker = find_marker_line(source);

    if cases.is_empty() {
        return Ok(match marker {
            Some(marker) => {
                let mut rewritten = source.to_string();
                rewritten.replace_range(marker.range, "");
                rewritten
            }
            None => source.to_string(),
        });
    }

    let json = serde_json::to_string(cases).map_err(|e| CtmError::TestCases(e.to_string()))?;

    Ok(match marker {
        Some(marker) => {
            let line = format!("{TEST_CASES_MARKER} {json}{}", marker.ending);
            let mut rewritten = source.to_string();
            rewritten.replace_range(marker.range, &line);
            rewritten
        }
        None => format!("{TEST_CASES_MARKER} {json}\n{source}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = concat!(
        r#"%% cTMIDE-TestCases: [{"input":"aaaaaaaaaaa","#,
        r#""expectedOutput":"bbbbbbbbbbb","type":"exact"}]"#,
        "\n\n%% complement\nq0 a/b,R q0\n"
    );

    #[test]
    fn test_read_cases() {
        let cases = read_cases(SOURCE).unwrap();
        assert_eq!(cases, vec![TestCase::new("aaaaaaaaaaa", "bbbbbbbbbbb")]);
    }

    #[test]
    fn test_no_marker_means_no_cases() {
        assert!(read_cases("q0 a/b,R q1").unwrap().is_empty());
        assert!(read_cases("").unwrap().is_empty());
    }

    #[test]
    fn test_marker_must_be_first_non_empty_line() {
        let source = concat!(
            "\n  \n",
            r#"%% cTMIDE-TestCases: [{"input":"a","expectedOutput":"b"}]"#,
            "\nq0 a/b,R q1"
        );
        assert_eq!(read_cases(source).unwrap().len(), 1);

        let source = r#"%% a comment
%% cTMIDE-TestCases: [{"input":"a","expectedOutput":"b"}]"#;
        assert!(read_cases(source).unwrap().is_empty());
    }

    #[test]
    fn test_type_defaults_to_exact() {
        let cases =
            read_cases(r#"%% cTMIDE-TestCases: [{"input":"a b","expectedOutput":"b"}]"#).unwrap();
        assert_eq!(cases[0].kind, MatchKind::Exact);
        assert_eq!(cases[0].input_symbols(), vec!['a', '#', 'b']);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let result = read_cases("%% cTMIDE-TestCases: [{\"input\":");
        assert!(matches!(result, Err(CtmError::TestCases(_))));
    }

    #[test]
    fn test_write_replaces_marker_line_only() {
        let cases = vec![
            TestCase::new("aaaaaaaaaaa", "bbbbbbbbbbb"),
            TestCase::new("ab", "ba"),
        ];
        let rewritten = write_cases(SOURCE, &cases).unwrap();

        assert!(rewritten.ends_with("\n\n%% complement\nq0 a/b,R q0\n"));
        assert_eq!(
            rewritten.lines().next().unwrap(),
            concat!(
                r#"%% cTMIDE-TestCases: [{"input":"aaaaaaaaaaa","expectedOutput":"bbbbbbbbbbb","#,
                r#""type":"exact"},{"input":"ab","expectedOutput":"ba","type":"exact"}]"#
            )
        );
        assert_eq!(read_cases(&rewritten).unwrap(), cases);
    }

    #[test]
    fn test_write_inserts_marker_line() {
        let rewritten = write_cases("q0 a/b,R q1\n", &[TestCase::new("a", "b")]).unwrap();
        assert_eq!(
            rewritten,
            concat!(
                r#"%% cTMIDE-TestCases: [{"input":"a","expectedOutput":"b","type":"exact"}]"#,
                "\nq0 a/b,R q1\n"
            )
        );
    }

    #[test]
    fn test_write_empty_list_removes_line() {
        let rewritten = write_cases(SOURCE, &[]).unwrap();
        assert_eq!(rewritten, "\n%% complement\nq0 a/b,R q0\n");

        assert_eq!(write_cases("q0 a/b,R q1", &[]).unwrap(), "q0 a/b,R q1");
    }

    #[test]
    fn test_write_keeps_crlf_line_ending() {
        let source = "%% cTMIDE-TestCases: []\r\nq0 a/b,R q1\r\n";
        let rewritten = write_cases(source, &[TestCase::new("a", "b")]).unwrap();
        assert!(rewritten.ends_with("]\r\nq0 a/b,R q1\r\n"));
    }
}
