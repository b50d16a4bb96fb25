use super::{BackendError, Note, NoteBackend, NoteEntries, NoteError, NoteId, Result, unused_id};
use log::{debug, trace, warn};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

const NOTE_EXTENSION: &str = ".json";

/// Stores each note as `<id>.json` in a directory.
///
/// Files are overwritten in place, not written to a temporary file and
/// renamed, so a crash mid-write can leave a truncated file behind. Reading
/// it back fails with `BackendError::Deserialize`.
#[derive(Debug)]
pub struct FilesystemBackend {
    base_path: PathBuf,
}

impl FilesystemBackend {
    /// Creates a new `FilesystemBackend` rooted at `path`, creating the directory if needed
    ///
    /// # Errors
    ///
    /// Returns `NoteError::InvalidConfiguration` if the directory cannot be created,
    /// or if `path` is not a writable directory
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        let invalid = |reason: String| {
            NoteError::InvalidConfiguration(format!(
                "Note store '{}' is not a writable directory: {reason}",
                base_path.display()
            ))
        };

        fs::create_dir_all(&base_path).map_err(|e| invalid(e.to_string()))?;
        let metadata = fs::metadata(&base_path).map_err(|e| invalid(e.to_string()))?;
        if !metadata.is_dir() {
            return Err(invalid("not a directory".to_string()));
        }
        // Permission bits alone don't tell whether this process may write here
        NamedTempFile::new_in(&base_path).map_err(|e| invalid(e.to_string()))?;

        debug!("Using directory for notes: {}", base_path.display());
        Ok(Self { base_path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    /// Constructs a filesystem path for the note file based on its ID
    fn note_path(&self, id: &NoteId) -> PathBuf {
        self.base_path.join(format!("{id}{NOTE_EXTENSION}"))
    }

    fn exists(&self, id: &NoteId) -> bool {
        self.note_path(id).is_file()
    }

    fn write_note(&self, id: &NoteId, note: Note) -> Result<()> {
        let data = serde_json::to_string(&note.with_id(id.clone())).map_err(BackendError::Serialize)?;
        let path = self.note_path(id);
        fs::write(&path, &data).map_err(BackendError::FileWriteError)?;
        trace!("Wrote data to {}:\n{}", path.display(), &data);
        Ok(())
    }

    fn read_note(&self, id: &NoteId) -> Result<Note> {
        let contents = fs::read_to_string(self.note_path(id)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => NoteError::NotFound(id.clone()),
            _ => NoteError::Backend(BackendError::FileReadError(e)),
        })?;
        let note = serde_json::from_str(&contents).map_err(BackendError::Deserialize)?;
        Ok(note)
    }

    /// Maps a directory entry to the ID it stores, if it is a note file
    fn entry_id(entry: &fs::DirEntry) -> Option<NoteId> {
        let name = entry.file_name();
        let id = name.to_str()?.strip_suffix(NOTE_EXTENSION)?;
        if !entry.file_type().is_ok_and(|t| t.is_file()) {
            return None;
        }
        id.parse().ok()
    }
}

impl NoteBackend for FilesystemBackend {
    /// Writes the note to a new file
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `NoteError::AlreadyExists` if a note file with the same ID exists
    /// - `BackendError::FileWriteError` if writing to the file fails
    fn create(&self, note: Note, id: Option<NoteId>) -> Result<NoteId> {
        // Any entry under the note's name counts as taken, not only regular files
        let taken = |id: &NoteId| self.note_path(id).exists();
        let id = match id {
            Some(id) if taken(&id) => return Err(NoteError::AlreadyExists(id)),
            Some(id) => id,
            None => unused_id(|id| Ok(taken(id)))?,
        };
        self.write_note(&id, note)?;
        Ok(id)
    }

    /// Reads and parses a note file
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `NoteError::NotFound` if the note file does not exist
    /// - `BackendError::FileReadError` if the file cannot be read
    /// - `BackendError::Deserialize` if the file is not a valid note
    fn read(&self, id: &NoteId) -> Result<Note> {
        self.read_note(id)
    }

    /// Overwrites an existing note file
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `NoteError::NotFound` if the note file does not exist
    /// - `BackendError::FileWriteError` if writing to the file fails
    fn update(&self, id: &NoteId, note: Note) -> Result<()> {
        if !self.exists(id) {
            return Err(NoteError::NotFound(id.clone()));
        }
        self.write_note(id, note)
    }

    /// Deletes a note file
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `NoteError::NotFound` if the file does not exist
    /// - `BackendError::PermissionDenied` if the file can't be deleted due to missing privileges
    /// - `BackendError::FileRemoveError` for other filesystem errors
    fn delete(&self, id: &NoteId) -> Result<()> {
        if !self.exists(id) {
            return Err(NoteError::NotFound(id.clone()));
        }
        fs::remove_file(self.note_path(id)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => NoteError::NotFound(id.clone()),
            ErrorKind::PermissionDenied => NoteError::Backend(BackendError::PermissionDenied),
            _ => NoteError::Backend(BackendError::FileRemoveError(e)),
        })?;
        trace!("Removed note file for #{id}");
        Ok(())
    }

    /// Walks the directory lazily, parsing each note file when it is reached
    ///
    /// Files removed between listing and reading are skipped. Corrupt files
    /// are yielded as errors
    fn list_all(&self) -> Result<NoteEntries<'_>> {
        let entries = fs::read_dir(&self.base_path).map_err(BackendError::DirectoryReadError)?;

        Ok(Box::new(entries.filter_map(move |entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => return Some(Err(BackendError::DirectoryReadError(e).into())),
            };
            let id = Self::entry_id(&entry)?;
            match self.read_note(&id) {
                Ok(note) => Some(Ok((id, note))),
                Err(NoteError::NotFound(_)) => None,
                Err(e) => {
                    warn!("Failed reading note file {}: {e}", entry.path().display());
                    Some(Err(e))
                }
            }
        })))
    }

    /// Removes every note file, leaving other files in the directory alone
    fn clear(&self) -> Result<()> {
        let entries = fs::read_dir(&self.base_path).map_err(BackendError::DirectoryReadError)?;
        for entry in entries {
            let entry = entry.map_err(BackendError::DirectoryReadError)?;
            if Self::entry_id(&entry).is_some() {
                match fs::remove_file(entry.path()) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(BackendError::FileRemoveError(e).into()),
                }
            }
        }
        debug!("Cleared notes in {}", self.base_path.display());
        Ok(())
    }
}
