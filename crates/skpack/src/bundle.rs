//! In-memory bundle of compiled modules

use std::path::{Path, PathBuf};

use crate::{adapter::CompiledEntry, types::FxIndexMap};

/// Two source files resolved to the same module key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub module_path: String,
    /// Source whose entry was discarded
    pub replaced: PathBuf,
    /// Source whose entry is kept
    pub kept: PathBuf,
}

/// Mapping from module key to wrapped code.
///
/// Keys are unique. Inserting an existing key replaces its code (last write
/// wins) while keeping the key's original position, so emission order is the
/// order in which keys were first seen.
#[derive(Debug, Default, Clone)]
pub struct Bundle {
    entries: FxIndexMap<String, String>,
    origins: FxIndexMap<String, PathBuf>,
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `entry`, compiled from `origin`. Reports the collision when the key
    /// was already present for a different source file.
    pub fn insert(&mut self, origin: &Path, entry: CompiledEntry) -> Option<Collision> {
        let CompiledEntry {
            module_path,
            wrapped_code,
        } = entry;

        let previous = self
            .origins
            .insert(module_path.clone(), origin.to_path_buf());
        self.entries.insert(module_path.clone(), wrapped_code);

        previous
            .filter(|replaced| replaced != origin)
            .map(|replaced| Collision {
                module_path,
                replaced,
                kept: origin.to_path_buf(),
            })
    }

    pub fn get(&self, module_path: &str) -> Option<&str> {
        self.entries.get(module_path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Module keys in emission order
    pub fn module_paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// `(module key, wrapped code)` pairs in emission order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, code)| (key.as_str(), code.as_str()))
    }
}
