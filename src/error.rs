//! Error taxonomy shared by the vault, normalizer, index and pinning clients

use std::path::PathBuf;

use thiserror::Error;

use crate::store::ArchiveRecord;

#[derive(Error, Debug)]
pub enum Error {
    // Bad local input
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Path is not a file: {}", .0.display())]
    NotAFile(PathBuf),

    // Vault state
    #[error("Vault already initialized at {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Vault config at {} is corrupt: {source}", .path.display())]
    CorruptConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Remote credentials are not configured for this vault")]
    CredentialsNotConfigured,

    /// Not a failure for most callers: the content is already in the index.
    #[error("Content {} is already archived as record #{}", .0.content_hash, .0.id)]
    DuplicateContent(Box<ArchiveRecord>),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Local storage
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Storage unavailable at {}: {source}", .path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The index was written by a newer release; it is left untouched.
    #[error(
        "Storage error: index at {} uses schema v{found}, newer than supported v{supported}",
        .path.display()
    )]
    IncompatibleSchema {
        path: PathBuf,
        found: i64,
        supported: i64,
    },

    #[error("Archive index is closed")]
    IndexClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Remote pinning
    #[error("Upload rejected ({status}): {message}")]
    Upload { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl Error {
    /// True when the error only signals that the content was archived before.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Error::DuplicateContent(_))
    }

    /// The previously archived record, for `DuplicateContent`.
    pub fn existing_record(&self) -> Option<&ArchiveRecord> {
        match self {
            Error::DuplicateContent(record) => Some(record),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
