//! Run-scoped table of global declarations
//!
//! Handlers contribute scaffolding (includes, globals, setup calls) under a
//! key naming the declaration's identity. Writing the same key twice keeps a
//! single entry, so any number of blocks can request the same declaration.

use std::collections::HashMap;

/// Where a definition lands in the assembled program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// `#include` lines at the top of the file
    Include,
    /// Global variables and helper functions before `setup()`
    Global,
    /// Statements at the start of `setup()`, before the user's chain
    Setup,
}

#[derive(Debug, Clone)]
struct Entry {
    section: Section,
    text: String,
}

/// Deduplicated declarations keyed by identity
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl Definitions {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `text` under `key`. A repeated key overwrites the text but
    /// keeps its first position. Returns `true` if the key was new.
    pub fn define(&mut self, section: Section, key: impl Into<String>, text: impl Into<String>) -> bool {
        let key = key.into();
        let text = text.into();
        match self.index.get(&key) {
            Some(&position) => {
                let entry = &mut self.entries[position];
                entry.section = section;
                entry.text = text;
                false
            }
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(Entry { section, text });
                true
            }
        }
    }

    /// Texts of one section in insertion order
    pub fn section(&self, section: Section) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(move |entry| entry.section == section)
            .map(|entry| entry.text.as_str())
    }

    /// Remove every definition
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is defined
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
