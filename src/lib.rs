#![deny(clippy::cargo)]
#![deny(clippy::complexity)]
#![deny(clippy::correctness)]
#![deny(clippy::nursery)]
#![deny(clippy::perf)]
#![deny(clippy::style)]
#![deny(clippy::suspicious)]
#![deny(clippy::pedantic)]

use std::io;
use thiserror::Error;

pub mod app;
pub mod backends;
pub mod note;
pub mod setup;
pub mod ui;

pub use backends::{BackendGuard, NoteBackend};
pub use note::{Note, NoteId, NoteType};

// More convenient Result type
pub type Result<T> = std::result::Result<T, NoteError>;

// Every outcome a backend or the service can report
#[derive(Debug, Error)]
pub enum NoteError {
    #[error("Note not found with ID: {0}")]
    NotFound(NoteId),

    #[error("Note already exists with ID: {0}")]
    AlreadyExists(NoteId),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error(transparent)]
    Validation(#[from] NoteValidationError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

// Enum for all possible data and input validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NoteValidationError {
    #[error("Title is empty")]
    TitleEmpty,

    #[error("Invalid note ID: '{0}'")]
    InvalidId(String),

    #[error("Unknown note type '{0}'. Expected 'personal' or 'work'")]
    UnknownNoteType(String),
}

// Enum for all possible backend errors
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend has not been started")]
    NotStarted,

    #[error("Failed writing note data to file")]
    FileWriteError(io::Error),

    #[error("Failed reading note data from file")]
    FileReadError(io::Error),

    #[error("Failed removing note file")]
    FileRemoveError(io::Error),

    #[error("Failed reading directory contents")]
    DirectoryReadError(io::Error),

    #[error("Note is improperly formatted: {0}")]
    Deserialize(serde_json::Error),

    #[error("Failed serializing note: {0}")]
    Serialize(serde_json::Error),

    #[error("Database is locked or busy")]
    DatabaseBusy,

    #[error("Database corruption or file I/O error")]
    DatabaseCorruptOrIo,

    #[error("Database file is not a valid SQLite database")]
    NotADatabase,

    #[error("Database schema has changed unexpectedly")]
    SchemaChanged,

    #[error("Insufficient permissions")]
    PermissionDenied,

    #[error(transparent)]
    Other(#[from] anyhow::Error), // Used as fallback
}
