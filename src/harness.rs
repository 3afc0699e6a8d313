//! The test harness runs embedded test cases against a program. Every case gets its own
//! `Engine`; only the parsed program is shared between cases, read-only.
//!
//! A case passes when the machine halts and the tape, read from the head to the end of the
//! materialized window, equals the expected output exactly.

use crate::machine::Engine;
use crate::parser::parse;
use crate::store::ProgramStore;
use crate::tape::Tape;
use crate::testcase::{read_cases, write_cases, MatchKind, TestCase};
use crate::types::{CtmError, Diagnostic, Halt, Program, MAX_EXECUTION_STEPS};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Result of running a single test case
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestResult {
    /// The machine halted with the expected output under its head.
    Success { steps: usize },
    /// The case could not run or produced the wrong output.
    Failure(Failure),
}

impl TestResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TestResult::Success { .. })
    }

    /// Steps taken, for cases that ran to a halt.
    pub fn steps(&self) -> Option<usize> {
        match self {
            TestResult::Success { steps }
            | TestResult::Failure(Failure::Mismatch { steps, .. }) => Some(*steps),
            TestResult::Failure(_) => None,
        }
    }
}

/// Why a test case failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    /// The program has diagnostics and never ran.
    #[error("could not run: {}", format_diagnostics(.0))]
    Diagnostics(Vec<Diagnostic>),
    /// The machine did not halt within the step limit.
    #[error("could not run: step limit of {0} steps exceeded")]
    StepLimitExceeded(usize),
    /// The machine halted, but the tape from the head onward differs from the expectation.
    #[error("mismatch: expected '{expected}', found '{actual}' after {steps} steps")]
    Mismatch {
        expected: String,
        actual: String,
        steps: usize,
    },
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Outcome of running a list of test cases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestReport {
    /// Every case with its result, in run order
    pub results: Vec<(TestCase, TestResult)>,
    /// Number of cases that passed
    pub passed: usize,
    /// Number of cases that failed
    pub failed: usize,
}

impl TestReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a test result to the report
    pub fn add_result(&mut self, case: TestCase, result: TestResult) {
        if result.is_success() {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.results.push((case, result));
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Check if all cases passed
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Generate a one-line summary
    pub fn summary(&self) -> String {
        format!(
            "{} test cases: {} passed, {} failed",
            self.total(),
            self.passed,
            self.failed
        )
    }

    /// Generate a report listing every case
    pub fn detailed_summary(&self) -> String {
        let mut output = String::new();

        for (i, (case, result)) in self.results.iter().enumerate() {
            let line = match result {
                TestResult::Success { steps } => {
                    format!("#{} '{}': ok ({} steps)\n", i + 1, case.input, steps)
                }
                TestResult::Failure(failure) => {
                    format!("#{} '{}': FAILED, {}\n", i + 1, case.input, failure)
                }
            };
            output.push_str(&line);
        }

        output.push_str(&self.summary());
        output
    }
}

/// Runs and edits embedded test cases.
#[derive(Debug, Clone)]
pub struct TestHarness {
    step_limit: usize,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            step_limit: MAX_EXECUTION_STEPS,
        }
    }

    /// Sets the step limit applied to every case.
    pub fn with_step_limit(mut self, step_limit: usize) -> Self {
        self.step_limit = step_limit;
        self
    }

    fn engine(&self) -> Engine {
        Engine::new().with_step_limit(self.step_limit)
    }

    /// Runs one case on a fresh engine initialized from `source`.
    pub fn run_case(&self, source: &str, case: &TestCase) -> TestResult {
        let mut engine = self.engine();

        match engine.initialize(source, &case.input_symbols()) {
            Ok(()) => evaluate(&mut engine, case),
            Err(diagnostics) => TestResult::Failure(Failure::Diagnostics(diagnostics)),
        }
    }

    /// Runs one case on a fresh engine against an already parsed program.
    pub fn run_program_case(&self, program: &Arc<Program>, case: &TestCase) -> TestResult {
        let mut engine = self.engine();

        match engine.load(Arc::clone(program), &case.input_symbols()) {
            Ok(()) => evaluate(&mut engine, case),
            Err(diagnostics) => TestResult::Failure(Failure::Diagnostics(diagnostics)),
        }
    }

    /// Runs every case independently. The source is parsed once.
    pub fn run_all(&self, source: &str, cases: &[TestCase]) -> TestReport {
        let mut report = TestReport::new();

        match parse(source) {
            Ok(program) => {
                let program = Arc::new(program);
                for case in cases {
                    let result = self.run_program_case(&program, case);
                    debug!(input = %case.input, success = result.is_success(), "ran test case");
                    report.add_result(case.clone(), result);
                }
            }
            Err(diagnostics) => {
                for case in cases {
                    let failure = Failure::Diagnostics(diagnostics.clone());
                    report.add_result(case.clone(), TestResult::Failure(failure));
                }
            }
        }

        info!(
            passed = report.passed,
            failed = report.failed,
            "test run finished"
        );
        report
    }

    /// Runs the test cases embedded in `source`.
    pub fn run_source(&self, source: &str) -> Result<TestReport, CtmError> {
        let cases = read_cases(source)?;
        Ok(self.run_all(source, &cases))
    }

    /// Appends `case` to the program stored as `name` and saves it.
    ///
    /// # Returns
    ///
    /// * `Ok(cases)` with the updated list.
    pub fn add_case(
        &self,
        store: &mut impl ProgramStore,
        name: &str,
        case: TestCase,
    ) -> Result<Vec<TestCase>, CtmError> {
        let source = store.read(name)?;
        let mut cases = read_cases(&source)?;
        cases.push(case);

        store.write(name, &write_cases(&source, &cases)?)?;
        debug!(name, count = cases.len(), "added test case");
        Ok(cases)
    }

    /// Removes the case at `index` (0-based) from the program stored as `name` and saves it.
    ///
    /// # Returns
    ///
    /// * `Err(CtmError::CaseIndex)` if there is no case at `index`.
    pub fn delete_case(
        &self,
        store: &mut impl ProgramStore,
        name: &str,
        index: usize,
    ) -> Result<Vec<TestCase>, CtmError> {
        let source = store.read(name)?;
        let mut cases = read_cases(&source)?;

        if index >= cases.len() {
            return Err(CtmError::CaseIndex {
                index,
                len: cases.len(),
            });
        }
        cases.remove(index);

        store.write(name, &write_cases(&source, &cases)?)?;
        debug!(name, count = cases.len(), "deleted test case");
        Ok(cases)
    }
}

/// Runs an initialized engine to completion and compares its tape with the expectation.
fn evaluate(engine: &mut Engine, case: &TestCase) -> TestResult {
    match engine.run() {
        Halt::StepLimitExceeded(limit) => TestResult::Failure(Failure::StepLimitExceeded(limit)),
        Halt::Finished => {
            let steps = engine.step_count();
            let actual = engine
                .tape()
                .map(Tape::content_from_head)
                .unwrap_or_default();

            let matched = match case.kind {
                MatchKind::Exact => actual == case.expected_output,
            };

            if matched {
                TestResult::Success { steps }
            } else {
                TestResult::Failure(Failure::Mismatch {
                    expected: case.expected_output.clone(),
                    actual,
                    steps,
                })
            }
        }
    }
}
