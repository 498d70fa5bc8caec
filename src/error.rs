use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot list {}: {source}", root.display())]
    ListingFailed {
        root: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no entry named {0:?} in the current scan")]
    ToggleUnknownName(String),

    #[error("failed to delete {}", failed.join(", "))]
    DeletePartialFailure { failed: Vec<String> },

    #[error("operation cancelled")]
    Cancelled,

    #[error("collation unavailable: {0}")]
    Collator(String),

    #[error("preferences {}: {message}", path.display())]
    Preference { path: PathBuf, message: String },

    #[error("config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
