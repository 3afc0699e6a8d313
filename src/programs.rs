//! Built-in example programs, embedded at compile time. Each one carries its own test cases.

use crate::store::ProgramStore;
use crate::types::CtmError;
use tracing::info;

// Default embedded programs, as (name, source)
const PROGRAM_TEXTS: [(&str, &str); 2] = [
    ("complement", include_str!("../programs/complement.ctm")),
    ("alternate-ab", include_str!("../programs/alternate-ab.ctm")),
];

pub struct ProgramManager;

impl ProgramManager {
    /// Get the number of available programs
    pub fn get_program_count() -> usize {
        PROGRAM_TEXTS.len()
    }

    /// List all program names
    pub fn list_program_names() -> Vec<&'static str> {
        PROGRAM_TEXTS.iter().map(|(name, _)| *name).collect()
    }

    /// Get the source of a program by its name
    pub fn get_program_text(name: &str) -> Option<&'static str> {
        PROGRAM_TEXTS
            .iter()
            .find(|(program, _)| *program == name)
            .map(|(_, text)| *text)
    }

    /// Copies every example missing from `store` into it, returning the names written.
    pub fn seed(store: &mut impl ProgramStore) -> Result<Vec<&'static str>, CtmError> {
        let mut written = Vec::new();

        for (name, text) in PROGRAM_TEXTS {
            if store.exists(name) {
                continue;
            }
            store.write(name, text)?;
            written.push(name);
        }

        info!(count = written.len(), "seeded example programs");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::TestHarness;
    use crate::parser::parse;
    use crate::store::MemoryStore;
    use crate::testcase::read_cases;

    #[test]
    fn test_all_programs_are_valid() {
        for name in ProgramManager::list_program_names() {
            let text = ProgramManager::get_program_text(name).unwrap();
            assert!(parse(text).is_ok(), "Program '{}' is invalid", name);
        }
    }

    #[test]
    fn test_programs_pass_their_own_test_cases() {
        let harness = TestHarness::new();

        for name in ProgramManager::list_program_names() {
            let text = ProgramManager::get_program_text(name).unwrap();
            let cases = read_cases(text).unwrap();
            assert!(!cases.is_empty());

            let report = harness.run_all(text, &cases);
            assert!(report.is_success(), "{}:\n{}", name, report.detailed_summary());
        }
    }

    #[test]
    fn test_cyclic_example_uses_fallback_initial_state() {
        let program = parse(ProgramManager::get_program_text("alternate-ab").unwrap()).unwrap();
        assert_eq!(program.initial_state.as_deref(), Some("q0"));
        assert_eq!(program.final_states, vec!["q3"]);
    }

    #[test]
    fn test_program_lookup() {
        assert_eq!(ProgramManager::get_program_count(), 2);
        assert!(ProgramManager::get_program_text("complement").is_some());
        assert!(ProgramManager::get_program_text("nonexistent").is_none());
    }

    #[test]
    fn test_seed_skips_existing_programs() {
        let mut store = MemoryStore::new();
        store.write("complement", "q0 a/a,R q1").unwrap();

        let written = ProgramManager::seed(&mut store).unwrap();
        assert_eq!(written, vec!["alternate-ab"]);
        assert_eq!(store.read("complement").unwrap(), "q0 a/a,R q1");
        assert_eq!(store.list().unwrap(), vec!["alternate-ab", "complement"]);
    }
}
