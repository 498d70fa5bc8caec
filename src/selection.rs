use crate::error::{Error, Result};
use crate::scanner::{Entry, Scan};
use crate::size::total_size;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Which entries of the current scan are marked for deletion.
///
/// The store owns its snapshot of the collection. Marks are looked up by
/// name and are dropped whenever a new scan is installed.
#[derive(Debug, Clone)]
pub struct SelectionStore {
    root: PathBuf,
    entries: Vec<Entry>,
    marked: HashSet<String>,
}

impl SelectionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: Vec::new(),
            marked: HashSet::new(),
        }
    }

    pub fn from_scan(scan: Scan) -> Self {
        let mut store = Self::new(scan.root.clone());
        store.replace(scan);
        store
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn replace(&mut self, scan: Scan) {
        self.root = scan.root;
        self.entries = scan.entries;
        self.marked.clear();
    }

    fn ensure_known(&self, name: &str) -> Result<()> {
        if self.entries.iter().any(|e| e.name == name) {
            Ok(())
        } else {
            Err(Error::ToggleUnknownName(name.to_string()))
        }
    }

    /// Flips the mark on `name` and returns the new state.
    pub fn toggle(&mut self, name: &str) -> Result<bool> {
        self.ensure_known(name)?;
        if self.marked.remove(name) {
            Ok(false)
        } else {
            self.marked.insert(name.to_string());
            Ok(true)
        }
    }

    pub fn mark(&mut self, name: &str) -> Result<()> {
        self.ensure_known(name)?;
        self.marked.insert(name.to_string());
        Ok(())
    }

    pub fn is_marked(&self, name: &str) -> bool {
        self.marked.contains(name)
    }

    pub fn clear_all(&mut self) {
        self.marked.clear();
    }

    pub fn marked_count(&self) -> usize {
        self.marked.len()
    }

    /// Marked names in collection order.
    pub fn selected_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| self.marked.contains(&e.name))
            .map(|e| e.name.clone())
            .collect()
    }

    /// Size of the marked entries as they are on disk right now.
    pub fn aggregate_size(&self) -> u64 {
        total_size(&self.root, self.selected_names())
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.entries
            .iter()
            .map(|e| Entry {
                marked_for_deletion: self.marked.contains(&e.name),
                ..e.clone()
            })
            .collect()
    }
}
