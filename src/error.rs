use thiserror::Error;

/// Failures surfaced by the store, allocator, and run pipeline. Everything
/// user-visible is rendered in place (warning banner or terminal text);
/// nothing here escapes the UI loop as a panic.
#[derive(Debug, Error)]
pub enum Error {
    #[error("run id pool exhausted: all {0} ids are outstanding")]
    CapacityExceeded(usize),

    #[error("language not supported yet, download the desktop version: {0}")]
    UnsupportedLanguage(String),

    #[error("no file named {0}")]
    FileNotFound(String),

    #[error("a file with that name already exists: {0}")]
    FileAlreadyExists(String),

    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    #[error("cache and persistent store diverged: {detail}")]
    PersistenceInconsistency { detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to encode file document: {0}")]
    Persist(String),
}

pub type Result<T> = std::result::Result<T, Error>;
