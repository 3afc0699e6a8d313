//! This module provides the parser for cTM programs, utilizing the `pest` crate.
//! The grammar in `grammar.pest` classifies source lines; action tokens are then decoded by
//! fixed character offset, and the resulting table is handed to the analyzer.

use crate::{
    analyzer::analyze,
    types::{Diagnostic, Direction, Program, Symbol, Transition, BLANK_SYMBOL},
};
use pest::{
    error::LineColLocation,
    iterators::{Pair, Pairs},
    Parser as PestParser,
};
use pest_derive::Parser as PestParser;

/// Derives a `PestParser` for the cTM line grammar defined in `grammar.pest`.
#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct CtmParser;

/// The best-effort result of parsing: a program that is always built, plus every diagnostic.
///
/// Execution only ever uses a program whose report has no diagnostics; read-only consumers
/// may keep the partial program for inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseReport {
    pub program: Program,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseReport {
    pub fn is_valid(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Returns the program when no diagnostic was produced, and the diagnostics otherwise.
    pub fn into_result(self) -> Result<Program, Vec<Diagnostic>> {
        if self.diagnostics.is_empty() {
            Ok(self.program)
        } else {
            Err(self.diagnostics)
        }
    }
}

/// Parses program source into a validated `Program`.
///
/// This is the main entry point for parsing cTM programs. Comment lines (`%%`) and empty
/// lines are ignored, including the embedded test-case line.
///
/// # Returns
///
/// * `Ok(Program)` if the source produced no diagnostics.
/// * `Err(Vec<Diagnostic>)` with every diagnostic otherwise.
pub fn parse(input: &str) -> Result<Program, Vec<Diagnostic>> {
    inspect(input).into_result()
}

/// Parses program source, keeping the partially built program alongside its diagnostics.
pub fn inspect(input: &str) -> ParseReport {
    let mut diagnostics = Vec::new();

    let transitions = match CtmParser::parse(Rule::source, input) {
        Ok(mut pairs) => pairs
            .next()
            .map(|root| parse_lines(root.into_inner(), &mut diagnostics))
            .unwrap_or_default(),
        Err(e) => {
            let (LineColLocation::Pos((line, _)) | LineColLocation::Span((line, _), _)) =
                e.line_col;
            diagnostics.push(Diagnostic::MalformedLine {
                line,
                text: e.line().trim().to_string(),
            });
            Vec::new()
        }
    };

    let program = analyze(transitions, &mut diagnostics);

    ParseReport {
        program,
        diagnostics,
    }
}

/// Walks the classified lines, building one transition per transition line.
fn parse_lines(pairs: Pairs<Rule>, diagnostics: &mut Vec<Diagnostic>) -> Vec<Transition> {
    let mut transitions = Vec::new();

    for pair in pairs {
        let line = pair.line_col().0;

        match pair.as_rule() {
            Rule::transition => transitions.push(parse_transition(pair, line, diagnostics)),
            Rule::malformed => diagnostics.push(Diagnostic::MalformedLine {
                line,
                text: pair.as_str().trim().to_string(),
            }),
            _ => {} // Comments and EOI
        }
    }

    transitions
}

/// Parses a `<from> <R/W,D> <to>` line into a `Transition`.
fn parse_transition(
    pair: Pair<Rule>,
    line: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> Transition {
    let mut tokens = pair.into_inner();
    let from_state = parse_string(&mut tokens);
    let action = parse_string(&mut tokens);
    let to_state = parse_string(&mut tokens);

    let (input, output, direction) = parse_action(&action, line, diagnostics);

    Transition {
        from_state,
        input,
        output,
        direction,
        to_state,
    }
}

/// Decodes an action token by fixed character offset: read at 0, write at 2, direction at 4.
///
/// Anything other than exactly `R/W,D` is reported as malformed, which is how symbols longer
/// than one character are rejected. Offsets past the end of the token read as blank, and a
/// missing or unknown direction is reported as well.
fn parse_action(
    action: &str,
    line: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> (Symbol, Symbol, Direction) {
    let chars: Vec<char> = action.chars().collect();

    let well_formed = chars.len() == 5 && chars[1] == '/' && chars[3] == ',';
    if !well_formed {
        diagnostics.push(Diagnostic::MalformedAction {
            line,
            action: action.to_string(),
        });
    }

    let symbol_at = |i: usize| chars.get(i).copied().unwrap_or(BLANK_SYMBOL);
    let direction = Direction::from_char(chars.get(4).copied());

    if let Direction::Unrecognised(direction) = direction {
        diagnostics.push(Diagnostic::InvalidDirection { line, direction });
    }

    (symbol_at(0), symbol_at(2), direction)
}

/// Extracts the string content from the current `Pair` in a `Pairs` iterator.
fn parse_string(pairs: &mut Pairs<Rule>) -> String {
    pairs
        .next()
        .map(|p| p.as_str().to_string())
        .unwrap_or_default()
}
