//! This crate provides the core of the cTM interpreter: a parser for the cTM language,
//! an unbounded tape, a deterministic single-tape execution engine, and a harness that
//! evaluates test cases embedded in program source.

pub mod analyzer;
pub mod harness;
pub mod machine;
pub mod parser;
pub mod programs;
pub mod store;
pub mod tape;
pub mod testcase;
pub mod types;

/// Re-exports the `Rule` enum from the parser module, used by the `pest` grammar.
pub use crate::parser::Rule;
/// Re-exports the analysis entry points.
pub use analyzer::{notes, AnalysisNote};
/// Re-exports the test harness and its result types.
pub use harness::{Failure, TestHarness, TestReport, TestResult};
/// Re-exports the execution engine.
pub use machine::{Configuration, Engine};
/// Re-exports the parsing entry points.
pub use parser::{inspect, parse, ParseReport};
/// Re-exports the built-in example programs.
pub use programs::ProgramManager;
/// Re-exports program storage.
pub use store::{DirectoryStore, MemoryStore, ProgramStore};
/// Re-exports the tape.
pub use tape::Tape;
/// Re-exports test-case front matter handling.
pub use testcase::{
    input_symbols, read_cases, write_cases, MatchKind, TestCase, TEST_CASES_MARKER,
};
/// Re-exports the core types.
pub use types::{
    CtmError, Diagnostic, Direction, Halt, Program, Step, Symbol, Transition, BLANK_SYMBOL,
    MAX_EXECUTION_STEPS,
};
