//! The surface a presentation layer drives.
//!
//! A [`Session`] owns the selection state for one root and reports every
//! change through a [`Listener`]. The presentation keeps only the snapshots
//! it receives in [`Event::EntriesReady`] and refers back to entries by name.
//!
//! Every mutation takes `&mut self`, so a session has exactly one driver at a
//! time. Long work is not done here: scans and deletes run on a
//! [`Worker`](crate::Worker) and their results come back through
//! [`Session::apply_outcome`].

use crate::deleter::{self, DeleteReport};
use crate::error::{Error, Result};
use crate::preference::{PreferenceStore, SortingPreference};
use crate::scanner::{self, Entry, ExclusionPolicy, Scan};
use crate::selection::SelectionStore;
use crate::sorter::{Sorter, SortingPolicy};
use crate::worker::Outcome;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

#[derive(Debug)]
pub enum Event {
    /// Sorted snapshot of the current collection.
    EntriesReady(Vec<Entry>),
    AggregateSizeChanged(u64),
    DeletionCompleted(DeleteReport),
    Failed(String),
}

pub trait Listener {
    fn on_event(&mut self, event: Event);
}

impl<F: FnMut(Event)> Listener for F {
    fn on_event(&mut self, event: Event) {
        self(event)
    }
}

/// Forwards events into a channel. A closed channel drops them.
pub struct ChannelListener(pub Sender<Event>);

impl Listener for ChannelListener {
    fn on_event(&mut self, event: Event) {
        let _ = self.0.send(event);
    }
}

pub struct Session<S: PreferenceStore> {
    root: PathBuf,
    exclusions: ExclusionPolicy,
    sorter: Sorter,
    sorting: SortingPreference<S>,
    selection: SelectionStore,
    listener: Box<dyn Listener>,
}

impl<S: PreferenceStore> Session<S> {
    pub fn new(
        root: impl Into<PathBuf>,
        exclusions: ExclusionPolicy,
        sorting: SortingPreference<S>,
        listener: impl Listener + 'static,
    ) -> Result<Self> {
        let root = root.into();
        Ok(Self {
            selection: SelectionStore::new(root.clone()),
            root,
            exclusions,
            sorter: Sorter::new()?,
            sorting,
            listener: Box::new(listener),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exclusions(&self) -> &ExclusionPolicy {
        &self.exclusions
    }

    pub fn sorting(&self) -> SortingPolicy {
        self.sorting.current()
    }

    fn emit(&mut self, event: Event) {
        self.listener.on_event(event);
    }

    /// Scans the root on the calling thread and replaces the collection.
    pub fn refresh(&mut self) -> Result<()> {
        let scan = scanner::scan(&self.root, &self.exclusions);
        self.apply_scan(scan)
    }

    /// Installs the result of a scan that ran elsewhere, e.g. on a worker.
    pub fn apply_scan(&mut self, result: Result<Scan>) -> Result<()> {
        let scan = match result {
            Ok(scan) => scan,
            Err(err) => {
                self.emit(Event::Failed(err.to_string()));
                return Err(err);
            }
        };
        for name in &scan.unreadable {
            tracing::warn!(%name, "entry could not be fully read, its size is a lower bound");
        }

        self.selection.replace(scan);
        let entries = self.entries();
        let aggregate = self.selection.aggregate_size();
        self.emit(Event::EntriesReady(entries));
        self.emit(Event::AggregateSizeChanged(aggregate));
        Ok(())
    }

    /// Feeds a worker outcome back in. A finished delete is only reported;
    /// the caller submits the rescan.
    pub fn apply_outcome(&mut self, outcome: Outcome) -> Result<()> {
        match outcome {
            Outcome::Scanned { result, .. } => self.apply_scan(result),
            Outcome::Deleted(report) => self.apply_delete(report),
        }
    }

    pub fn toggle(&mut self, name: &str) -> Result<bool> {
        let marked = self.selection.toggle(name)?;
        let aggregate = self.selection.aggregate_size();
        self.emit(Event::AggregateSizeChanged(aggregate));
        Ok(marked)
    }

    pub fn deselect_all(&mut self) {
        self.selection.clear_all();
        self.emit(Event::AggregateSizeChanged(0));
    }

    /// Switches to the next sorting policy and re-sorts without rescanning.
    pub fn cycle_sorting(&mut self) -> Result<SortingPolicy> {
        let policy = self.sorting.advance()?;
        let entries = self.entries();
        self.emit(Event::EntriesReady(entries));
        Ok(policy)
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.sorter.sort(&self.selection.entries(), self.sorting())
    }

    pub fn selected_names(&self) -> Vec<String> {
        self.selection.selected_names()
    }

    pub fn aggregate_size(&self) -> u64 {
        self.selection.aggregate_size()
    }

    /// Deletes every marked entry on the calling thread, then rescans. Doing
    /// this with nothing marked changes nothing.
    pub fn delete_marked(&mut self) -> Result<()> {
        let names = self.selected_names();
        if names.is_empty() {
            tracing::debug!("nothing marked, skipping delete");
            return Ok(());
        }
        let report = deleter::delete(&self.root, &names);
        let outcome = self.apply_delete(report);
        self.refresh()?;
        outcome
    }

    /// Reports a finished delete. The collection is left as it was until the
    /// next scan is applied.
    pub fn apply_delete(&mut self, report: DeleteReport) -> Result<()> {
        let failed = report.failed_names();
        self.emit(Event::DeletionCompleted(report));

        if failed.is_empty() {
            return Ok(());
        }
        let err = Error::DeletePartialFailure { failed };
        self.emit(Event::Failed(err.to_string()));
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preference::MemoryStore;
    use std::fs::{self, File};
    use std::io::Write;
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn write(path: &Path, len: usize) {
        File::create(path).unwrap().write_all(&vec![b'x'; len]).unwrap();
    }

    fn session(root: &Path) -> (Session<MemoryStore>, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel();
        let session = Session::new(
            root,
            ExclusionPolicy::default(),
            SortingPreference::load(MemoryStore::new()),
            ChannelListener(tx),
        )
        .unwrap();
        (session, rx)
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("Android")).unwrap();
        fs::create_dir(dir.path().join("Music")).unwrap();
        write(&dir.path().join("Music").join("song.mp3"), 30);
        write(&dir.path().join("big.iso"), 90);
        write(&dir.path().join("a.txt"), 1);
        dir
    }

    fn names(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn refresh_emits_sorted_entries_and_size() {
        let dir = fixture();
        let (mut session, rx) = session(dir.path());

        session.refresh().unwrap();

        match rx.try_recv().unwrap() {
            Event::EntriesReady(entries) => assert_eq!(names(&entries), vec!["a.txt", "big.iso", "Music"]),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(rx.try_recv().unwrap(), Event::AggregateSizeChanged(0)));
    }

    #[test]
    fn cycle_sorting_resorts_in_place() {
        let dir = fixture();
        let (mut session, rx) = session(dir.path());
        session.refresh().unwrap();
        session.toggle("Music").unwrap();
        rx.try_iter().count();

        assert_eq!(session.cycle_sorting().unwrap(), SortingPolicy::BySize);

        match rx.try_recv().unwrap() {
            Event::EntriesReady(entries) => {
                assert_eq!(names(&entries), vec!["big.iso", "Music", "a.txt"]);
                assert!(entries[1].marked_for_deletion);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn toggle_reports_aggregate() {
        let dir = fixture();
        let (mut session, rx) = session(dir.path());
        session.refresh().unwrap();
        rx.try_iter().count();

        session.toggle("Music").unwrap();
        session.toggle("big.iso").unwrap();
        assert!(session.toggle("Android").is_err());
        session.deselect_all();

        let sizes: Vec<u64> = rx
            .try_iter()
            .filter_map(|e| match e {
                Event::AggregateSizeChanged(size) => Some(size),
                _ => None,
            })
            .collect();
        assert_eq!(sizes, vec![30, 120, 0]);
    }

    #[test]
    fn delete_marked_removes_and_rescans() {
        let dir = fixture();
        let (mut session, rx) = session(dir.path());
        session.refresh().unwrap();
        session.toggle("Music").unwrap();
        rx.try_iter().count();

        session.delete_marked().unwrap();

        let events: Vec<Event> = rx.try_iter().collect();
        assert!(matches!(&events[0], Event::DeletionCompleted(report) if report.deleted == vec!["Music"]));
        assert!(matches!(&events[1], Event::EntriesReady(entries) if names(entries) == vec!["a.txt", "big.iso"]));
        assert!(matches!(events[2], Event::AggregateSizeChanged(0)));
        assert!(session.selected_names().is_empty());
        assert!(dir.path().join("Android").exists());
    }

    #[test]
    fn applied_delete_waits_for_the_next_scan() {
        let dir = fixture();
        let (mut session, rx) = session(dir.path());
        session.refresh().unwrap();
        session.toggle("Music").unwrap();
        rx.try_iter().count();

        let report = deleter::delete(dir.path(), session.selected_names());
        session.apply_outcome(Outcome::Deleted(report)).unwrap();

        let events: Vec<Event> = rx.try_iter().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Event::DeletionCompleted(report) if report.freed_bytes == 30));
        assert_eq!(session.selected_names(), vec!["Music"]);

        session
            .apply_outcome(Outcome::Scanned {
                generation: 2,
                result: scanner::scan(dir.path(), &ExclusionPolicy::default()),
            })
            .unwrap();
        assert!(session.selected_names().is_empty());
        assert_eq!(names(&session.entries()), vec!["a.txt", "big.iso"]);
    }

    #[test]
    fn failed_delete_is_reported() {
        let dir = fixture();
        let (mut session, rx) = session(dir.path());
        session.refresh().unwrap();
        rx.try_iter().count();

        let report = deleter::delete(dir.path(), ["../a.txt"]);
        let err = session.apply_delete(report).unwrap_err();

        assert!(matches!(err, Error::DeletePartialFailure { .. }));
        let events: Vec<Event> = rx.try_iter().collect();
        assert!(matches!(events[0], Event::DeletionCompleted(_)));
        assert!(matches!(&events[1], Event::Failed(reason) if reason.contains("../a.txt")));
    }

    #[test]
    fn delete_with_nothing_marked_is_silent() {
        let dir = fixture();
        let (mut session, rx) = session(dir.path());
        session.refresh().unwrap();
        rx.try_iter().count();

        session.delete_marked().unwrap();

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn failed_scan_is_reported() {
        let dir = fixture();
        let (mut session, rx) = session(&dir.path().join("a.txt"));

        assert!(session.refresh().is_err());
        assert!(matches!(rx.try_recv().unwrap(), Event::Failed(_)));
    }
}
