//! This module defines the execution engine. An `Engine` owns at most one running
//! configuration (program, current state, tape, step count) and advances it one transition
//! at a time. Engines share nothing; the parsed program is held behind an `Arc` so several
//! engines can execute the same table.

use crate::parser::parse;
use crate::tape::Tape;
use crate::types::{
    Diagnostic, Direction, Halt, Program, Step, Symbol, Transition, MAX_EXECUTION_STEPS,
};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// The mutable state of one running machine.
#[derive(Debug, Clone)]
pub struct Configuration {
    program: Arc<Program>,
    state: String,
    tape: Tape,
    step_count: usize,
}

impl Configuration {
    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// The transition that applies next, if any.
    pub fn transition(&self) -> Option<&Transition> {
        self.program.transition(&self.state, self.tape.read())
    }
}

/// Runs cTM programs. Starts uninitialized; see [`Engine::initialize`].
#[derive(Debug, Clone)]
pub struct Engine {
    config: Option<Configuration>,
    step_limit: usize,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Creates an uninitialized engine with the default step limit.
    pub fn new() -> Self {
        Self {
            config: None,
            step_limit: MAX_EXECUTION_STEPS,
        }
    }

    /// Sets the number of steps [`Engine::run`] may take before giving up.
    pub fn with_step_limit(mut self, step_limit: usize) -> Self {
        self.step_limit = step_limit;
        self
    }

    pub fn step_limit(&self) -> usize {
        self.step_limit
    }

    /// Parses `source` and prepares a fresh configuration for `input`.
    ///
    /// Any previous configuration is discarded first. When the source produces diagnostics
    /// they are returned and the engine stays uninitialized.
    pub fn initialize(&mut self, source: &str, input: &[Symbol]) -> Result<(), Vec<Diagnostic>> {
        self.reset();
        let program = parse(source)?;
        self.load(Arc::new(program), input)
    }

    /// Prepares a fresh configuration from an already parsed program.
    ///
    /// # Returns
    ///
    /// * `Err(vec![Diagnostic::NoInitialState])` if the program has no initial state.
    pub fn load(&mut self, program: Arc<Program>, input: &[Symbol]) -> Result<(), Vec<Diagnostic>> {
        self.reset();

        let state = program
            .initial_state
            .clone()
            .ok_or_else(|| vec![Diagnostic::NoInitialState])?;

        debug!(
            initial_state = %state,
            transitions = program.transitions.len(),
            input_len = input.len(),
            "initialized machine"
        );

        self.config = Some(Configuration {
            program,
            state,
            tape: Tape::new(input.to_vec()),
            step_count: 0,
        });

        Ok(())
    }

    /// Discards the configuration, returning the engine to its uninitialized state.
    pub fn reset(&mut self) {
        self.config = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    /// Whether no transition applies to the current state and symbol.
    ///
    /// This is the only halting condition; the heuristic final states are never consulted.
    /// An uninitialized engine is always finished.
    pub fn is_finished(&self) -> bool {
        self.transition().is_none()
    }

    /// Applies the first transition matching the current state and symbol.
    ///
    /// Writes, moves the head, enters the next state, trims the tape and counts the step.
    /// On a finished machine nothing happens and `Step::Halt(Halt::Finished)` is returned.
    pub fn step(&mut self) -> Step {
        let Some(config) = self.config.as_mut() else {
            return Step::Halt(Halt::Finished);
        };

        let Some(transition) = config.transition().cloned() else {
            return Step::Halt(Halt::Finished);
        };

        config.tape.write(transition.output);

        match transition.direction {
            Direction::Left => config.tape.move_left(),
            Direction::Right => config.tape.move_right(),
            Direction::Unrecognised(_) => {}
        }

        config.state = transition.to_state;
        config.tape.trim();
        config.step_count += 1;

        trace!(
            step = config.step_count,
            state = %config.state,
            position = config.tape.position(),
            "applied transition"
        );

        Step::Continue
    }

    /// Steps until the machine halts or the step limit is reached.
    ///
    /// The configuration stays valid either way, so a run that hit the limit can be resumed.
    pub fn run(&mut self) -> Halt {
        for _ in 0..self.step_limit {
            if let Step::Halt(halt) = self.step() {
                debug!(steps = self.step_count(), "machine halted");
                return halt;
            }
        }

        if self.is_finished() {
            debug!(steps = self.step_count(), "machine halted");
            return Halt::Finished;
        }

        warn!(limit = self.step_limit, "step limit exceeded");
        Halt::StepLimitExceeded(self.step_limit)
    }

    pub fn config(&self) -> Option<&Configuration> {
        self.config.as_ref()
    }

    /// Returns the current state, if initialized.
    pub fn state(&self) -> Option<&str> {
        self.config.as_ref().map(Configuration::state)
    }

    pub fn tape(&self) -> Option<&Tape> {
        self.config.as_ref().map(Configuration::tape)
    }

    /// Returns the number of transitions applied since initialization.
    pub fn step_count(&self) -> usize {
        self.config.as_ref().map_or(0, Configuration::step_count)
    }

    pub fn program(&self) -> Option<&Program> {
        self.config.as_ref().map(Configuration::program)
    }

    /// The transition that the next `step` will apply.
    pub fn transition(&self) -> Option<&Transition> {
        self.config.as_ref().and_then(Configuration::transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BLANK_SYMBOL;

    const COMPLEMENT: &str = "q0 a/b,R q0
q0 b/a,R q0
q0 #/#,L q1
q1 a/a,L q1
q1 b/b,L q1
q1 #/#,R q2";

    fn symbols(input: &str) -> Vec<char> {
        input.chars().collect()
    }

    fn engine(source: &str, input: &str) -> Engine {
        let mut engine = Engine::new();
        engine.initialize(source, &symbols(input)).unwrap();
        engine
    }

    #[test]
    fn test_initialize() {
        let engine = engine(COMPLEMENT, "ab");

        assert!(engine.is_initialized());
        assert_eq!(engine.state(), Some("q0"));
        assert_eq!(engine.step_count(), 0);
        assert_eq!(engine.tape().unwrap().data(), &['a', 'b']);
        assert_eq!(engine.tape().unwrap().position(), 0);
    }

    #[test]
    fn test_initialize_with_diagnostics_leaves_engine_unset() {
        let mut engine = engine(COMPLEMENT, "ab");

        let result = engine.initialize("q0 a/b,X q1", &symbols("a"));
        assert_eq!(
            result,
            Err(vec![Diagnostic::InvalidDirection {
                line: 1,
                direction: Some('X')
            }])
        );
        assert!(!engine.is_initialized());
        assert!(engine.is_finished());
        assert_eq!(engine.step(), Step::Halt(Halt::Finished));
    }

    #[test]
    fn test_single_step() {
        let mut engine = engine(COMPLEMENT, "ab");

        assert_eq!(engine.step(), Step::Continue);
        assert_eq!(engine.state(), Some("q0"));
        assert_eq!(engine.tape().unwrap().data(), &['b', 'b']);
        assert_eq!(engine.tape().unwrap().position(), 1);
        assert_eq!(engine.step_count(), 1);
    }

    #[test]
    fn test_complement_end_to_end() {
        let mut engine = engine(COMPLEMENT, "aaaaaaaaaaa");

        assert_eq!(engine.run(), Halt::Finished);
        assert_eq!(engine.state(), Some("q2"));

        let tape = engine.tape().unwrap();
        assert_eq!(tape.data().iter().collect::<String>(), "bbbbbbbbbbb");
        assert_eq!(tape.position(), 0);
        // 11 rewrites, 1 turn, 11 moves back, 1 final move
        assert_eq!(engine.step_count(), 24);
    }

    #[test]
    fn test_step_on_finished_machine_is_a_noop() {
        let mut engine = engine("q0 a/b,R q1", "a");

        assert_eq!(engine.step(), Step::Continue);
        assert!(engine.is_finished());

        let before = engine.tape().unwrap().clone();
        assert_eq!(engine.step(), Step::Halt(Halt::Finished));
        assert_eq!(engine.tape().unwrap(), &before);
        assert_eq!(engine.step_count(), 1);
    }

    #[test]
    fn test_halting_ignores_final_states() {
        // q1 is the only heuristic final state but still has a self-loop on 'a'
        let source = "q0 a/a,R q1\nq1 a/x,R q1";
        let mut engine = engine(source, "aaa");
        assert!(engine.program().unwrap().is_final("q1"));

        assert_eq!(engine.step(), Step::Continue);
        assert_eq!(engine.state(), Some("q1"));
        assert!(!engine.is_finished());

        assert_eq!(engine.run(), Halt::Finished);
        assert_eq!(engine.tape().unwrap().data(), &['a', 'x', 'x']);
        assert_eq!(engine.step_count(), 3);
    }

    #[test]
    fn test_halts_in_non_final_state() {
        // q0 is not final, but nothing matches 'b'
        let mut engine = engine("q0 a/a,R q1", "b");
        assert!(engine.is_finished());
        assert_eq!(engine.run(), Halt::Finished);
        assert_eq!(engine.state(), Some("q0"));
        assert_eq!(engine.step_count(), 0);
    }

    #[test]
    fn test_step_limit_on_infinite_loop() {
        let mut engine = engine("q0 #/#,R q0", "");

        assert_eq!(engine.run(), Halt::StepLimitExceeded(MAX_EXECUTION_STEPS));
        assert_eq!(engine.step_count(), MAX_EXECUTION_STEPS);
        assert!(engine.tape().unwrap().data().is_empty());
    }

    #[test]
    fn test_custom_step_limit_and_resume() {
        let mut engine = Engine::new().with_step_limit(3);
        engine.initialize(COMPLEMENT, &symbols("aaaaaaaaaaa")).unwrap();

        assert_eq!(engine.run(), Halt::StepLimitExceeded(3));
        assert_eq!(engine.step_count(), 3);

        let mut engine = engine.with_step_limit(100);
        assert_eq!(engine.run(), Halt::Finished);
        assert_eq!(engine.step_count(), 24);
    }

    #[test]
    fn test_run_halting_exactly_at_limit() {
        let mut engine = Engine::new().with_step_limit(2);
        engine.initialize("q0 a/b,R q0", &symbols("aa")).unwrap();
        assert_eq!(engine.run(), Halt::Finished);
        assert_eq!(engine.step_count(), 2);
    }

    #[test]
    fn test_trim_after_every_step() {
        let source = "q0 a/#,R q0\nq0 b/b,L q1";
        let mut engine = engine(source, "aab");

        while engine.step() == Step::Continue {
            let tape = engine.tape().unwrap();
            assert_ne!(tape.data().first(), Some(&BLANK_SYMBOL));
            assert_ne!(tape.data().last(), Some(&BLANK_SYMBOL));
        }

        let tape = engine.tape().unwrap();
        assert_eq!(tape.data(), &['b']);
        assert_eq!(tape.position(), -1);
        assert_eq!(engine.state(), Some("q1"));
    }

    #[test]
    fn test_write_left_of_tape() {
        let source = "q0 a/a,L q0\nq0 #/x,R q1";
        let mut engine = engine(source, "a");

        assert_eq!(engine.run(), Halt::Finished);
        let tape = engine.tape().unwrap();
        assert_eq!(tape.data(), &['x', 'a']);
        assert_eq!(tape.position(), 1);
    }

    #[test]
    fn test_reset() {
        let mut engine = engine(COMPLEMENT, "ab");
        engine.step();
        engine.reset();

        assert!(!engine.is_initialized());
        assert_eq!(engine.state(), None);
        assert_eq!(engine.step_count(), 0);
        assert!(engine.tape().is_none());
    }

    #[test]
    fn test_load_shared_program() {
        let program = Arc::new(parse(COMPLEMENT).unwrap());

        let mut first = Engine::new();
        let mut second = Engine::new();
        first.load(Arc::clone(&program), &symbols("ab")).unwrap();
        second.load(Arc::clone(&program), &symbols("ba")).unwrap();

        first.run();
        second.run();
        assert_eq!(first.tape().unwrap().data(), &['b', 'a']);
        assert_eq!(second.tape().unwrap().data(), &['a', 'b']);
    }

    #[test]
    fn test_load_program_without_initial_state() {
        let mut engine = Engine::new();
        let result = engine.load(Arc::new(Program::default()), &[]);
        assert_eq!(result, Err(vec![Diagnostic::NoInitialState]));
    }
}
