use std::io;
use std::path::Path;
use walkdir::WalkDir;

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;

/// Byte count of one walk plus the number of descendants it had to skip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Measured {
    pub bytes: u64,
    pub errors: usize,
}

/// Size in bytes of a file, or of every regular file below a directory.
///
/// A missing path is empty rather than an error. Symlinks are not followed,
/// so they contribute nothing. Descendants that cannot be read count as 0.
pub fn size_of(path: &Path) -> u64 {
    measure(path).bytes
}

/// Like [`size_of`], but counts the descendants that could not be read.
/// Paths that vanish during the walk are not errors.
pub fn measure(path: &Path) -> Measured {
    let mut measured = Measured::default();

    for entry in WalkDir::new(path).follow_links(false).follow_root_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.io_error().map(io::Error::kind) == Some(io::ErrorKind::NotFound) => continue,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping unreadable path");
                measured.errors += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.metadata() {
            Ok(meta) => measured.bytes = measured.bytes.saturating_add(meta.len()),
            Err(err) => {
                tracing::warn!(path = %entry.path().display(), error = %err, "cannot read file size");
                measured.errors += 1;
            }
        }
    }

    measured
}

/// Sum of [`size_of`] over `root/name` for every name.
pub fn total_size<I, S>(root: &Path, names: I) -> u64
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| size_of(&root.join(name.as_ref())))
        .fold(0u64, u64::saturating_add)
}

pub fn to_megabytes(bytes: u64) -> f64 {
    bytes as f64 / MB as f64
}

pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", to_megabytes(bytes))
}

pub fn format_size(bytes: u64) -> String {
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
