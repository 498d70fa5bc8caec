use rootsweep::{
    ChannelListener, Event, ExclusionPolicy, MemoryStore, Outcome, SelectionStore, Session,
    SortingPolicy, SortingPreference, Worker, delete, scan, size_of,
};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::mpsc;
use tempfile::TempDir;

fn write(path: &Path, len: usize) {
    File::create(path).unwrap().write_all(&vec![b'x'; len]).unwrap();
}

/// Android/ (reserved), Pictures/ with three files, .secret, todo.txt
fn storage() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir(root.join("Android")).unwrap();
    write(&root.join("Android").join("obb"), 500);
    fs::create_dir_all(root.join("Pictures").join("Camera")).unwrap();
    write(&root.join("Pictures").join("a.jpg"), 10);
    write(&root.join("Pictures").join("b.jpg"), 20);
    write(&root.join("Pictures").join("Camera").join("c.jpg"), 30);
    write(&root.join(".secret"), 5);
    write(&root.join("todo.txt"), 2);
    dir
}

#[test]
fn scan_mark_delete_rescan() {
    let dir = storage();
    let root = dir.path();

    let first = scan(root, &ExclusionPolicy::default()).unwrap();
    assert_eq!(first.entries.len(), 3);
    assert!(first.get("Android").is_none());
    assert_eq!(first.get("Pictures").unwrap().size_bytes, 60);

    let mut store = SelectionStore::from_scan(first);
    store.toggle("Pictures").unwrap();
    store.toggle(".secret").unwrap();
    assert_eq!(store.aggregate_size(), 65);

    let report = delete(root, store.selected_names());
    assert_eq!(report.freed_bytes, 65);
    assert!(report.is_complete());
    assert!(!root.join("Pictures").exists());

    store.replace(scan(root, &ExclusionPolicy::default()).unwrap());
    assert!(store.selected_names().is_empty());
    assert_eq!(store.aggregate_size(), 0);
    let names: Vec<String> = store.entries().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["todo.txt".to_string()]);
    assert_eq!(size_of(&root.join("Android")), 500);
}

#[test]
fn out_of_band_removal_does_not_block_the_batch() {
    let dir = storage();
    let root = dir.path();
    let mut store = SelectionStore::from_scan(scan(root, &ExclusionPolicy::default()).unwrap());
    store.toggle("Pictures").unwrap();
    store.toggle("todo.txt").unwrap();

    fs::remove_file(root.join("todo.txt")).unwrap();
    assert_eq!(store.aggregate_size(), 60);

    let report = delete(root, store.selected_names());
    assert_eq!(report.deleted, vec!["Pictures"]);
    assert_eq!(report.missing, vec!["todo.txt"]);
    assert!(report.into_result().is_ok());
}

#[test]
fn session_over_worker() {
    let dir = storage();
    let root = dir.path();
    let (tx, rx) = mpsc::channel();
    let mut session = Session::new(
        root,
        ExclusionPolicy::default(),
        SortingPreference::load(MemoryStore::with(SortingPolicy::BySize)),
        ChannelListener(tx),
    )
    .unwrap();
    let mut worker = Worker::spawn();

    worker.submit_scan(root, session.exclusions().clone());
    match worker.recv().unwrap() {
        Outcome::Scanned { result, .. } => session.apply_scan(result).unwrap(),
        other => panic!("unexpected {other:?}"),
    }
    let sizes: Vec<u64> = session.entries().iter().map(|e| e.size_bytes).collect();
    assert_eq!(sizes, vec![60, 5, 2]);

    session.toggle("Pictures").unwrap();
    worker.submit_delete(root, session.selected_names());
    let outcome = worker.recv().unwrap();
    assert!(matches!(outcome, Outcome::Deleted(_)));
    session.apply_outcome(outcome).unwrap();
    worker.submit_scan(root, session.exclusions().clone());
    session.apply_outcome(worker.recv().unwrap()).unwrap();

    assert_eq!(session.cycle_sorting().unwrap(), SortingPolicy::ByName);
    let events: Vec<Event> = rx.try_iter().collect();
    assert!(events.iter().any(|e| matches!(e, Event::DeletionCompleted(r) if r.freed_bytes == 60)));
    match events.last().unwrap() {
        Event::EntriesReady(entries) => {
            let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
            assert_eq!(names, vec![".secret", "todo.txt"]);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn newest_rescan_wins() {
    let dir = storage();
    let root = dir.path();
    let (tx, rx) = mpsc::channel();
    let mut session = Session::new(
        root,
        ExclusionPolicy::default(),
        SortingPreference::load(MemoryStore::new()),
        ChannelListener(tx),
    )
    .unwrap();
    let mut worker = Worker::spawn();

    worker.submit_scan(root, session.exclusions().clone());
    fs::remove_dir_all(root.join("Pictures")).unwrap();
    write(&root.join("new.bin"), 7);
    let latest = worker.submit_scan(root, session.exclusions().clone());

    let outcome = worker.recv().unwrap();
    assert!(matches!(outcome, Outcome::Scanned { generation, .. } if generation == latest));
    session.apply_outcome(outcome).unwrap();
    assert!(worker.try_recv().is_none());

    let names: Vec<String> = session.entries().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec![".secret", "new.bin", "todo.txt"]);
    let ready: Vec<Event> = rx
        .try_iter()
        .filter(|e| matches!(e, Event::EntriesReady(_)))
        .collect();
    assert_eq!(ready.len(), 1);
}
