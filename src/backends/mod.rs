pub mod factory;
pub mod filesystem;
pub mod memory;
pub mod sqlite;


pub use factory::BackendConfig;
pub use filesystem::FilesystemBackend;
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

pub use crate::{BackendError, Note, NoteError, NoteId, Result};

use log::{debug, error};
use std::ops::Deref;

/// Lazy sequence of every stored note, produced fresh by each `list_all` call
pub type NoteEntries<'a> = Box<dyn Iterator<Item = Result<(NoteId, Note)>> + 'a>;

/// Trait to be implemented by all backends that manage storing and retrieving notes
///
/// Backends do no internal locking. None of them is `Sync`, so sharing one
/// instance across threads requires an external mutex. Check-then-act
/// sequences (existence check, then write) are not atomic against other
/// processes using the same directory or database file.
pub trait NoteBackend {
    /// Acquires any resource the backend holds (connection, directory)
    ///
    /// # Errors
    ///
    /// Returns `NoteError::InvalidConfiguration` if the resource cannot be acquired
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Releases what `start` acquired. Calling it twice is harmless
    ///
    /// # Errors
    ///
    /// Returns an error if the resource fails to close cleanly
    fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    /// Stores a new note and returns its ID
    ///
    /// When `id` is `None` the backend generates a fresh one. The stored note
    /// carries the returned ID, whatever ID it was built with.
    ///
    /// # Errors
    ///
    /// Returns `NoteError::AlreadyExists` if `id` is already taken
    fn create(&self, note: Note, id: Option<NoteId>) -> Result<NoteId>;

    /// Fetches the most recently stored note under `id`
    ///
    /// # Errors
    ///
    /// Returns `NoteError::NotFound` if no such note exists
    fn read(&self, id: &NoteId) -> Result<Note>;

    /// Replaces the note stored under `id` entirely
    ///
    /// # Errors
    ///
    /// Returns `NoteError::NotFound` if no such note exists
    fn update(&self, id: &NoteId, note: Note) -> Result<()>;

    /// Deletes the note stored under `id`
    ///
    /// # Errors
    ///
    /// Returns `NoteError::NotFound` if no such note exists
    fn delete(&self, id: &NoteId) -> Result<()>;

    /// Returns every stored note, unordered and weakly consistent: changes
    /// made while the sequence is consumed may or may not show up
    ///
    /// # Errors
    ///
    /// Returns an error if the scan cannot begin. Failures on individual
    /// entries are yielded as items
    fn list_all(&self) -> Result<NoteEntries<'_>>;

    /// Removes every stored note. Administrative and test use only
    ///
    /// # Errors
    ///
    /// Returns an error if any note cannot be removed
    fn clear(&self) -> Result<()>;
}

/// Draws IDs until one is free according to `taken`
pub(crate) fn unused_id(taken: impl Fn(&NoteId) -> Result<bool>) -> Result<NoteId> {
    loop {
        let id = NoteId::generate();
        if !taken(&id)? {
            return Ok(id);
        }
        debug!("Generated ID {id} is taken, drawing another");
    }
}

/// Keeps a backend started for as long as the guard lives
///
/// `stop` runs on drop, so the backend is released on every exit path.
/// Use [`BackendGuard::close`] to observe the result of stopping.
pub struct BackendGuard {
    backend: Box<dyn NoteBackend>,
    stopped: bool,
}

impl BackendGuard {
    /// Starts `backend` and wraps it
    ///
    /// # Errors
    ///
    /// Returns whatever `start` fails with. The backend is dropped unstarted
    pub fn start(mut backend: Box<dyn NoteBackend>) -> Result<Self> {
        backend.start()?;
        Ok(Self {
            backend,
            stopped: false,
        })
    }

    /// Stops the backend and reports the outcome
    ///
    /// # Errors
    ///
    /// Returns whatever `stop` fails with
    pub fn close(mut self) -> Result<()> {
        self.stopped = true;
        self.backend.stop()
    }
}

impl Deref for BackendGuard {
    type Target = dyn NoteBackend;

    fn deref(&self) -> &Self::Target {
        self.backend.as_ref()
    }
}

impl Drop for BackendGuard {
    fn drop(&mut self) {
        if !self.stopped {
            if let Err(e) = self.backend.stop() {
                error!("Failed stopping backend: {e}");
            }
        }
    }
}
