use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::size::{format_size, measure};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Root-level names starting with this prefix belong to the OS and are never
/// offered for cleanup.
pub const RESERVED_PREFIX: &str = "Android";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub is_directory: bool,
    pub is_hidden: bool,
    pub size_bytes: u64,
    pub marked_for_deletion: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Empty,
    Hidden,
    Folder,
    File,
}

impl EntryKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::Empty => "Empty",
            EntryKind::Hidden => "Hidden",
            EntryKind::Folder => "Folder",
            EntryKind::File => "File",
        }
    }
}

impl Entry {
    pub fn new(name: impl Into<String>, is_directory: bool, size_bytes: u64) -> Self {
        let name = name.into();
        let is_hidden = name.starts_with('.');
        Self {
            name,
            is_directory,
            is_hidden,
            size_bytes,
            marked_for_deletion: false,
        }
    }

    pub fn kind(&self) -> EntryKind {
        if self.size_bytes == 0 {
            EntryKind::Empty
        } else if self.is_hidden {
            EntryKind::Hidden
        } else if self.is_directory {
            EntryKind::Folder
        } else {
            EntryKind::File
        }
    }

    pub fn size_human(&self) -> String {
        format_size(self.size_bytes)
    }
}

/// Decides which root-level names are visible to a scan.
#[derive(Debug, Clone)]
pub struct ExclusionPolicy {
    prefixes: Vec<String>,
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self {
            prefixes: vec![RESERVED_PREFIX.to_string()],
        }
    }
}

impl ExclusionPolicy {
    /// The reserved prefix always stays in the list.
    pub fn with_prefixes<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut policy = Self::default();
        for prefix in extra {
            let prefix = prefix.into();
            if !prefix.is_empty() && !policy.prefixes.contains(&prefix) {
                policy.prefixes.push(prefix);
            }
        }
        policy
    }

    pub fn allows(&self, name: &str) -> bool {
        !self.prefixes.iter().any(|prefix| name.starts_with(prefix.as_str()))
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

/// Owned result of one scan. Entries are in directory-listing order.
#[derive(Debug, Clone, Default)]
pub struct Scan {
    pub root: PathBuf,
    pub entries: Vec<Entry>,
    pub root_found: bool,
    /// Children that could not be fully read. Their size counts only what was
    /// readable, 0 when the child itself could not be stat'ed.
    pub unreadable: Vec<String>,
}

impl Scan {
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size_bytes).sum()
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

pub fn scan(root: &Path, policy: &ExclusionPolicy) -> Result<Scan> {
    scan_with_cancel(root, policy, &CancelToken::new())
}

pub fn scan_with_cancel(root: &Path, policy: &ExclusionPolicy, cancel: &CancelToken) -> Result<Scan> {
    let listing = match fs::read_dir(root) {
        Ok(listing) => listing,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(root = %root.display(), "scan root does not exist");
            return Ok(Scan {
                root: root.to_path_buf(),
                ..Scan::default()
            });
        }
        Err(source) => {
            return Err(Error::ListingFailed {
                root: root.to_path_buf(),
                source,
            });
        }
    };

    let mut entries = Vec::new();
    let mut unreadable = Vec::new();

    for child in listing {
        if cancel.is_cancelled() {
            tracing::debug!(root = %root.display(), "scan cancelled");
            return Err(Error::Cancelled);
        }

        let child = match child {
            Ok(child) => child,
            Err(err) => {
                tracing::warn!(root = %root.display(), error = %err, "skipping unreadable directory entry");
                continue;
            }
        };

        let name = child.file_name().to_string_lossy().into_owned();
        if !policy.allows(&name) {
            tracing::debug!(%name, "excluded");
            continue;
        }

        let entry = match child.file_type() {
            Ok(file_type) => {
                let measured = measure(&child.path());
                if measured.errors > 0 {
                    tracing::warn!(%name, errors = measured.errors, "entry partly unreadable, size is a lower bound");
                    unreadable.push(name.clone());
                }
                Entry::new(name, file_type.is_dir(), measured.bytes)
            }
            Err(err) => {
                tracing::warn!(%name, error = %err, "cannot stat entry, counting it as empty");
                unreadable.push(name.clone());
                Entry::new(name, false, 0)
            }
        };
        entries.push(entry);
    }

    let scan = Scan {
        root: root.to_path_buf(),
        entries,
        root_found: true,
        unreadable,
    };
    tracing::info!(
        root = %root.display(),
        entries = scan.entries.len(),
        bytes = scan.total_size(),
        "scan finished"
    );
    Ok(scan)
}
