//! This module derives program metadata from a parsed transition table: state discovery,
//! initial/final state classification and the alphabet. It also produces informational
//! analysis notes (shadowed transitions, unreachable states) that never block execution.

use crate::types::{Diagnostic, Program, Symbol, Transition, BLANK_SYMBOL};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Per-state classification flags. Every state starts out eligible for both roles.
#[derive(Debug, Clone, Copy)]
struct StateFlags {
    initial: bool,
    final_state: bool,
}

impl Default for StateFlags {
    fn default() -> Self {
        Self {
            initial: true,
            final_state: true,
        }
    }
}

/// Builds a `Program` from a transition table in declaration order.
///
/// A state loses its `initial` flag when some other state transitions into it, and its
/// `final` flag when it transitions into some other state. Self-loops affect neither.
///
/// The initial state is the first state still flagged `initial`. When no state qualifies
/// the lexicographically smallest state is used instead. A table without any state pushes
/// [`Diagnostic::NoInitialState`].
pub fn analyze(transitions: Vec<Transition>, diagnostics: &mut Vec<Diagnostic>) -> Program {
    let mut states: Vec<String> = Vec::new();
    let mut flags: HashMap<String, StateFlags> = HashMap::new();

    for transition in &transitions {
        for state in [&transition.from_state, &transition.to_state] {
            flags.entry(state.clone()).or_insert_with(|| {
                states.push(state.clone());
                StateFlags::default()
            });
        }

        if transition.from_state != transition.to_state {
            if let Some(from) = flags.get_mut(&transition.from_state) {
                from.final_state = false;
            }
            if let Some(to) = flags.get_mut(&transition.to_state) {
                to.initial = false;
            }
        }
    }

    let initial_state = states
        .iter()
        .find(|s| flags.get(*s).is_some_and(|f| f.initial))
        .or_else(|| states.iter().min())
        .cloned();

    if initial_state.is_none() {
        diagnostics.push(Diagnostic::NoInitialState);
    }

    let final_states = states
        .iter()
        .filter(|s| flags.get(*s).is_some_and(|f| f.final_state))
        .cloned()
        .collect();

    let alphabet = collect_alphabet(&transitions);

    Program {
        transitions,
        states,
        initial_state,
        final_states,
        alphabet,
    }
}

/// Collects distinct non-blank symbols read or written, in first-appearance order.
fn collect_alphabet(transitions: &[Transition]) -> Vec<Symbol> {
    let mut alphabet = Vec::new();
    for symbol in transitions.iter().flat_map(|t| [t.input, t.output]) {
        if symbol != BLANK_SYMBOL && !alphabet.contains(&symbol) {
            alphabet.push(symbol);
        }
    }
    alphabet
}

/// Observations about a program worth reporting, none of which affect execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisNote {
    /// A transition can never apply because an earlier one matches the same state and symbol.
    ShadowedTransition {
        transition: String,
        shadowed_by: String,
    },
    /// A state that no sequence of transitions from the initial state reaches.
    UnreachableStates(Vec<String>),
}

impl fmt::Display for AnalysisNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisNote::ShadowedTransition {
                transition,
                shadowed_by,
            } => write!(
                f,
                "Transition '{transition}' is never applied, '{shadowed_by}' matches first"
            ),
            AnalysisNote::UnreachableStates(states) => {
                write!(f, "Unreachable states detected: {}", states.join(", "))
            }
        }
    }
}

/// Runs every informational check against `program`.
pub fn notes(program: &Program) -> Vec<AnalysisNote> {
    [check_shadowed_transitions, check_unreachable_states]
        .iter()
        .flat_map(|check| check(program))
        .collect()
}

/// Finds transitions preceded by another transition on the same `(from_state, input)`.
fn check_shadowed_transitions(program: &Program) -> Vec<AnalysisNote> {
    let mut first_seen: HashMap<(&str, Symbol), &Transition> = HashMap::new();
    let mut found = Vec::new();

    for transition in &program.transitions {
        let key = (transition.from_state.as_str(), transition.input);
        match first_seen.get(&key) {
            Some(earlier) => found.push(AnalysisNote::ShadowedTransition {
                transition: transition.to_string(),
                shadowed_by: earlier.to_string(),
            }),
            None => {
                first_seen.insert(key, transition);
            }
        }
    }

    found
}

/// Depth-first walk from the initial state; every state not visited is unreachable.
fn check_unreachable_states(program: &Program) -> Vec<AnalysisNote> {
    let Some(initial_state) = program.initial_state.as_deref() else {
        return Vec::new();
    };

    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue = vec![initial_state];

    while let Some(state) = queue.pop() {
        if !visited.insert(state) {
            continue;
        }

        for transition in program.transitions_from(state) {
            if !visited.contains(transition.to_state.as_str()) {
                queue.push(&transition.to_state);
            }
        }
    }

    let unreachable: Vec<String> = program
        .states
        .iter()
        .filter(|s| !visited.contains(s.as_str()))
        .cloned()
        .collect();

    if unreachable.is_empty() {
        Vec::new()
    } else {
        vec![AnalysisNote::UnreachableStates(unreachable)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;

    fn transition(from: &str, input: char, output: char, to: &str) -> Transition {
        Transition {
            from_state: from.to_string(),
            input,
            output,
            direction: Direction::Right,
            to_state: to.to_string(),
        }
    }

    fn analyze_ok(transitions: Vec<Transition>) -> Program {
        let mut diagnostics = Vec::new();
        let program = analyze(transitions, &mut diagnostics);
        assert!(diagnostics.is_empty(), "unexpected {diagnostics:?}");
        program
    }

    #[test]
    fn test_states_in_first_appearance_order() {
        let program = analyze_ok(vec![
            transition("q0", 'a', 'b', "q1"),
            transition("q1", 'a', 'b', "q2"),
            transition("q0", 'b', 'a', "q0"),
        ]);

        assert_eq!(program.states, vec!["q0", "q1", "q2"]);
        assert_eq!(program.initial_state.as_deref(), Some("q0"));
        assert_eq!(program.final_states, vec!["q2"]);
    }

    #[test]
    fn test_self_loops_leave_state_initial_and_final() {
        let program = analyze_ok(vec![transition("loop", 'a', 'a', "loop")]);

        assert_eq!(program.initial_state.as_deref(), Some("loop"));
        assert_eq!(program.final_states, vec!["loop"]);
    }

    #[test]
    fn test_cyclic_program_falls_back_to_smallest_state() {
        let program = analyze_ok(vec![
            transition("b", 'x', 'x', "c"),
            transition("c", 'x', 'x', "a"),
            transition("a", 'x', 'x', "b"),
        ]);

        assert_eq!(program.states, vec!["b", "c", "a"]);
        assert_eq!(program.initial_state.as_deref(), Some("a"));
        assert!(program.final_states.is_empty());
    }

    #[test]
    fn test_multiple_final_states_are_tolerated() {
        let program = analyze_ok(vec![
            transition("q0", 'a', 'a', "yes"),
            transition("q0", 'b', 'b', "no"),
        ]);

        assert_eq!(program.final_states, vec!["yes", "no"]);
        assert!(program.is_final("no"));
        assert!(!program.is_final("q0"));
    }

    #[test]
    fn test_empty_table_has_no_initial_state() {
        let mut diagnostics = Vec::new();
        let program = analyze(Vec::new(), &mut diagnostics);

        assert_eq!(diagnostics, vec![Diagnostic::NoInitialState]);
        assert!(program.initial_state.is_none());
        assert!(program.states.is_empty());
    }

    #[test]
    fn test_alphabet_excludes_blank() {
        let program = analyze_ok(vec![
            transition("q0", 'b', 'a', "q0"),
            transition("q0", '#', '#', "q1"),
            transition("q1", 'a', 'c', "q1"),
        ]);

        assert_eq!(program.alphabet, vec!['b', 'a', 'c']);
    }

    #[test]
    fn test_shadowed_transition_note() {
        let program = analyze_ok(vec![
            transition("q0", 'a', 'b', "q1"),
            transition("q0", 'a', 'c', "q1"),
        ]);

        let notes = notes(&program);
        assert_eq!(
            notes,
            vec![AnalysisNote::ShadowedTransition {
                transition: "q0 a/c,R q1".into(),
                shadowed_by: "q0 a/b,R q1".into(),
            }]
        );
    }

    #[test]
    fn test_unreachable_states_note() {
        let program = analyze_ok(vec![
            transition("q0", 'a', 'b', "q1"),
            transition("x", 'a', 'b', "y"),
        ]);

        // both q0 and x qualify as initial; q0 comes first
        assert_eq!(program.initial_state.as_deref(), Some("q0"));
        let notes = notes(&program);
        assert_eq!(
            notes,
            vec![AnalysisNote::UnreachableStates(vec!["x".into(), "y".into()])]
        );
        assert_eq!(notes[0].to_string(), "Unreachable states detected: x, y");
    }
}
