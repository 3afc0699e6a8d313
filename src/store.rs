//! This module provides program storage: a small key-value interface mapping program names
//! to source text, with an in-memory implementation and one backed by a directory of
//! `.ctm` files. Stores know nothing about the source format.

use crate::types::CtmError;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extension used by [`DirectoryStore`].
pub const PROGRAM_EXTENSION: &str = "ctm";

lazy_static! {
    static ref PROGRAM_NAME: Regex = Regex::new(r"^[A-Za-z0-9\-_ .,]+$").unwrap();
}

/// Checks that `name` only uses letters, digits, spaces and `-_.,`.
pub fn validate_name(name: &str) -> Result<(), CtmError> {
    if PROGRAM_NAME.is_match(name) {
        Ok(())
    } else {
        Err(CtmError::InvalidName(name.to_string()))
    }
}

/// A key-value store of program sources keyed by program name.
pub trait ProgramStore {
    /// Stores `text` under `name`, replacing any previous text.
    fn write(&mut self, name: &str, text: &str) -> Result<(), CtmError>;

    /// Returns the text stored under `name`.
    fn read(&self, name: &str) -> Result<String, CtmError>;

    /// Removes `name`. Removing a missing program is an error.
    fn delete(&mut self, name: &str) -> Result<(), CtmError>;

    fn exists(&self, name: &str) -> bool;

    /// Returns all stored names in ascending order.
    fn list(&self) -> Result<Vec<String>, CtmError>;
}

/// A store that lives only as long as the value.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    programs: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgramStore for MemoryStore {
    fn write(&mut self, name: &str, text: &str) -> Result<(), CtmError> {
        validate_name(name)?;
        self.programs.insert(name.to_string(), text.to_string());
        Ok(())
    }

    fn read(&self, name: &str) -> Result<String, CtmError> {
        self.programs
            .get(name)
            .cloned()
            .ok_or_else(|| CtmError::NotFound(name.to_string()))
    }

    fn delete(&mut self, name: &str) -> Result<(), CtmError> {
        self.programs
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| CtmError::NotFound(name.to_string()))
    }

    fn exists(&self, name: &str) -> bool {
        self.programs.contains_key(name)
    }

    fn list(&self) -> Result<Vec<String>, CtmError> {
        Ok(self.programs.keys().cloned().collect())
    }
}

/// Stores each program as `<name>.ctm` inside a directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Opens the store at `root`, creating the directory if needed.
    ///
    /// # Returns
    ///
    /// * `Err(CtmError::FileError)` if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CtmError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            CtmError::FileError(format!(
                "Failed to create directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> Result<PathBuf, CtmError> {
        validate_name(name)?;
        Ok(self.root.join(format!("{name}.{PROGRAM_EXTENSION}")))
    }
}

impl ProgramStore for DirectoryStore {
    fn write(&mut self, name: &str, text: &str) -> Result<(), CtmError> {
        let path = self.path(name)?;
        fs::write(&path, text).map_err(|e| {
            CtmError::FileError(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        debug!(name, path = %path.display(), "saved program");
        Ok(())
    }

    fn read(&self, name: &str) -> Result<String, CtmError> {
        let path = self.path(name)?;
        if !path.is_file() {
            return Err(CtmError::NotFound(name.to_string()));
        }

        fs::read_to_string(&path).map_err(|e| {
            CtmError::FileError(format!("Failed to read file {}: {}", path.display(), e))
        })
    }

    fn delete(&mut self, name: &str) -> Result<(), CtmError> {
        let path = self.path(name)?;
        if !path.is_file() {
            return Err(CtmError::NotFound(name.to_string()));
        }

        fs::remove_file(&path).map_err(|e| {
            CtmError::FileError(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        debug!(name, "deleted program");
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.path(name).is_ok_and(|path| path.is_file())
    }

    /// Lists every `.ctm` file in the directory. Directories and other files are skipped.
    fn list(&self) -> Result<Vec<String>, CtmError> {
        let entries = fs::read_dir(&self.root).map_err(|e| {
            CtmError::FileError(format!(
                "Failed to read directory {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| {
                    CtmError::FileError(format!("Failed to read directory entry: {}", e))
                })?
                .path();

            if path.is_dir() || path.extension().is_none_or(|ext| ext != PROGRAM_EXTENSION) {
                continue;
            }

            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }

        names.sort();
        Ok(names)
    }
}
