//! This module defines the core data structures and types used throughout the cTM interpreter,
//! including the transition table, execution outcomes, parse diagnostics and error types.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single tape cell. Multi-character symbols are not representable.
pub type Symbol = char;

/// The blank symbol. Cells outside the materialized tape read as blank.
pub const BLANK_SYMBOL: Symbol = '#';
/// Test-case inputs may use a space to author an explicit blank cell.
pub const INPUT_BLANK_SYMBOL: char = ' ';
/// The default cap for run-to-completion.
pub const MAX_EXECUTION_STEPS: usize = 100_000;

/// A parsed cTM program: the ordered transition table plus metadata derived from it.
///
/// All derived sets keep first-appearance order so that inspection output is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Transitions in declaration order. The first match wins.
    pub transitions: Vec<Transition>,
    /// Every state mentioned by a transition, in first-appearance order.
    pub states: Vec<String>,
    /// The entry point. `None` only when the program has no states at all.
    pub initial_state: Option<String>,
    /// States without an outgoing state-changing transition. Informational only.
    pub final_states: Vec<String>,
    /// Distinct non-blank symbols read or written by any transition.
    pub alphabet: Vec<Symbol>,
}

impl Program {
    /// Returns the first transition that applies to `state` reading `symbol`.
    pub fn transition(&self, state: &str, symbol: Symbol) -> Option<&Transition> {
        self.transitions
            .iter()
            .find(|t| t.from_state == state && t.input == symbol)
    }

    /// Returns all transitions leaving `state`, in declaration order.
    pub fn transitions_from<'a>(&'a self, state: &'a str) -> impl Iterator<Item = &'a Transition> {
        self.transitions.iter().filter(move |t| t.from_state == state)
    }

    /// Whether `state` is in the heuristic final-state set.
    pub fn is_final(&self, state: &str) -> bool {
        self.final_states.iter().any(|s| s == state)
    }
}

/// A single transition rule: `(from_state, input) -> (output, direction, to_state)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from_state: String,
    pub input: Symbol,
    pub output: Symbol,
    pub direction: Direction,
    pub to_state: String,
}

impl fmt::Display for Transition {
    /// Renders the transition in source form, e.g. `q0 a/b,R q1`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{},{} {}",
            self.from_state, self.input, self.output, self.direction, self.to_state
        )
    }
}

/// Represents the possible directions a head can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one position to the left.
    Left,
    /// Move the head one position to the right.
    Right,
    /// The direction token was neither `L` nor `R` (or missing). The head does not move.
    /// A table containing one always carries a diagnostic and is never executed.
    Unrecognised(Option<char>),
}

impl Direction {
    /// Maps a direction character to a `Direction`.
    pub fn from_char(c: Option<char>) -> Self {
        match c {
            Some('L') => Direction::Left,
            Some('R') => Direction::Right,
            other => Direction::Unrecognised(other),
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Direction::Unrecognised(_))
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Left => write!(f, "L"),
            Direction::Right => write!(f, "R"),
            Direction::Unrecognised(Some(c)) => write!(f, "{c}"),
            Direction::Unrecognised(None) => Ok(()),
        }
    }
}

/// Represents the outcome of a single execution step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A transition was applied.
    Continue,
    /// Nothing was applied; the machine has halted.
    Halt(Halt),
}

/// Why a machine stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// No transition matches the current state and symbol.
    Finished,
    /// Run-to-completion gave up after this many steps.
    StepLimitExceeded(usize),
}

/// A recoverable problem found while parsing program source.
///
/// Diagnostics never abort a parse; they are accumulated and returned instead of a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    /// The direction character of an action token is not `L` or `R`, or is missing.
    #[error("Direction {} was given, L or R expected.", direction_name(.direction))]
    InvalidDirection {
        line: usize,
        direction: Option<char>,
    },
    /// The program declares no states.
    #[error("No initial state could be determined.")]
    NoInitialState,
    /// A non-comment line is not three single-space separated tokens.
    #[error("Line {line}: expected '<from> <R/W,D> <to>', found '{text}'.")]
    MalformedLine { line: usize, text: String },
    /// An action token does not have the `R/W,D` shape.
    #[error("Line {line}: action '{action}' is malformed, R/W,D expected.")]
    MalformedAction { line: usize, action: String },
}

fn direction_name(direction: &Option<char>) -> String {
    direction.map_or_else(|| "undefined".to_string(), String::from)
}

impl Diagnostic {
    /// The 1-based source line the diagnostic refers to, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            Diagnostic::InvalidDirection { line, .. }
            | Diagnostic::MalformedLine { line, .. }
            | Diagnostic::MalformedAction { line, .. } => Some(*line),
            Diagnostic::NoInitialState => None,
        }
    }
}

/// Represents errors raised outside of parsing: program storage and test-case editing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CtmError {
    /// The program name contains characters the store does not accept.
    #[error("Invalid program name: '{0}'")]
    InvalidName(String),
    /// No program is stored under the given name.
    #[error("Program not found: '{0}'")]
    NotFound(String),
    /// The embedded test-case line is not a valid JSON test-case list.
    #[error("Invalid test case list: {0}")]
    TestCases(String),
    /// A test case index does not exist.
    #[error("Test case index {index} is out of range ({len} cases)")]
    CaseIndex { index: usize, len: usize },
    /// An error related to file system operations.
    #[error("File error: {0}")]
    FileError(String),
}
