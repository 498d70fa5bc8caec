use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::size::size_of;
use std::fs;
use std::io;
use std::path::{Component, Path};
use walkdir::WalkDir;

#[derive(Debug, Default)]
pub struct DeleteReport {
    pub deleted: Vec<String>,
    /// Already gone before we got to them.
    pub missing: Vec<String>,
    pub failed: Vec<(String, io::Error)>,
    /// Not attempted because the run was cancelled.
    pub skipped: Vec<String>,
    pub freed_bytes: u64,
}

impl DeleteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    pub fn failed_names(&self) -> Vec<String> {
        self.failed.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn into_result(self) -> Result<DeleteReport> {
        if self.failed.is_empty() {
            Ok(self)
        } else {
            Err(Error::DeletePartialFailure {
                failed: self.failed_names(),
            })
        }
    }
}

pub fn delete<I, S>(root: &Path, names: I) -> DeleteReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    delete_with_cancel(root, names, &CancelToken::new())
}

pub fn delete_with_cancel<I, S>(root: &Path, names: I, cancel: &CancelToken) -> DeleteReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut report = DeleteReport::default();

    for name in names {
        let name = name.as_ref();
        if cancel.is_cancelled() {
            report.skipped.push(name.to_string());
            continue;
        }

        if !is_single_segment(name) {
            report.failed.push((
                name.to_string(),
                io::Error::new(io::ErrorKind::InvalidInput, "not a direct child of the root"),
            ));
            continue;
        }

        let path = root.join(name);
        match fs::symlink_metadata(&path) {
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(%name, "already gone");
                report.missing.push(name.to_string());
                continue;
            }
            Err(err) => {
                tracing::warn!(%name, error = %err, "cannot stat entry, not deleting it");
                report.failed.push((name.to_string(), err));
                continue;
            }
        }

        let size = size_of(&path);
        match remove_tree(&path) {
            Ok(()) => {
                tracing::debug!(%name, bytes = size, "deleted");
                report.freed_bytes = report.freed_bytes.saturating_add(size);
                report.deleted.push(name.to_string());
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                report.missing.push(name.to_string());
            }
            Err(err) => {
                tracing::warn!(%name, error = %err, "delete failed");
                report.failed.push((name.to_string(), err));
            }
        }
    }

    tracing::info!(
        deleted = report.deleted.len(),
        missing = report.missing.len(),
        failed = report.failed.len(),
        freed = report.freed_bytes,
        "delete finished"
    );
    report
}

fn is_single_segment(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

/// Removes `path` children first. Keeps going after errors and returns the
/// first one. Descendants that disappear on their own are not errors.
fn remove_tree(path: &Path) -> io::Result<()> {
    let mut first_error: Option<io::Error> = None;

    for entry in WalkDir::new(path)
        .follow_links(false)
        .follow_root_links(false)
        .contents_first(true)
    {
        let result = match entry {
            Ok(entry) if entry.file_type().is_dir() => fs::remove_dir(entry.path()),
            Ok(entry) => fs::remove_file(entry.path()),
            Err(err) => Err(err.into()),
        };

        if let Err(err) = result {
            if err.kind() == io::ErrorKind::NotFound {
                continue;
            }
            first_error.get_or_insert(err);
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
