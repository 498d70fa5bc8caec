//! Storage cleanup engine: scan the immediate children of a root, size them,
//! mark some and delete them.

pub mod cancel;
pub mod config;
pub mod deleter;
pub mod error;
pub mod logging;
pub mod preference;
pub mod scanner;
pub mod selection;
pub mod session;
pub mod size;
pub mod sorter;
pub mod worker;

pub const APP_NAME: &str = "rootsweep";

pub use cancel::CancelToken;
pub use config::Config;
pub use deleter::{DeleteReport, delete};
pub use error::{Error, Result};
pub use preference::{FileStore, MemoryStore, PreferenceStore, SortingPreference};
pub use scanner::{Entry, EntryKind, ExclusionPolicy, Scan, scan};
pub use selection::SelectionStore;
pub use session::{ChannelListener, Event, Listener, Session};
pub use size::size_of;
pub use sorter::{Sorter, SortingPolicy};
pub use worker::{Outcome, Worker};
