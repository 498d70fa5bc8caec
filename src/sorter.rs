use crate::error::{Error, Result};
use crate::scanner::Entry;
use icu_collator::{Collator, CollatorOptions, Strength};
use icu_locid::locale;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortingPolicy {
    #[default]
    #[serde(rename = "name")]
    ByName,
    #[serde(rename = "size")]
    BySize,
}

impl SortingPolicy {
    pub fn next(self) -> Self {
        match self {
            SortingPolicy::ByName => SortingPolicy::BySize,
            SortingPolicy::BySize => SortingPolicy::ByName,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SortingPolicy::ByName => "name",
            SortingPolicy::BySize => "size",
        }
    }
}

impl fmt::Display for SortingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SortingPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" | "alphabet" => Ok(SortingPolicy::ByName),
            "size" => Ok(SortingPolicy::BySize),
            other => Err(format!("unknown sorting {other:?}, expected name or size")),
        }
    }
}

/// Orders entries by collated name or by descending size.
pub struct Sorter {
    collator: Collator,
}

impl Sorter {
    pub fn new() -> Result<Self> {
        let mut options = CollatorOptions::new();
        options.strength = Some(Strength::Tertiary);
        let collator = Collator::try_new(&locale!("und").into(), options)
            .map_err(|err| Error::Collator(err.to_string()))?;
        Ok(Self { collator })
    }

    /// Returns a new, stably sorted collection. Selection flags are carried
    /// through untouched.
    pub fn sort(&self, entries: &[Entry], policy: SortingPolicy) -> Vec<Entry> {
        let mut sorted = entries.to_vec();
        match policy {
            SortingPolicy::ByName => {
                sorted.sort_by(|a, b| self.collator.compare(&a.name, &b.name));
            }
            SortingPolicy::BySize => {
                sorted.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));
            }
        }
        sorted
    }
}

impl fmt::Debug for Sorter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sorter").finish_non_exhaustive()
    }
}
