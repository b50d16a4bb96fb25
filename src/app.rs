use crate::{BackendGuard, Note, NoteBackend, NoteId, NoteType, Result};
use chrono::Utc;
use log::{debug, info};

/// Thin facade over one started backend
///
/// Stamps `updated_on` on every write and otherwise forwards calls
/// unchanged. The backend is stopped when the service is dropped or
/// explicitly stopped.
pub struct NoteService {
    backend: BackendGuard,
}

impl NoteService {
    /// Starts `backend` and serves from it
    ///
    /// # Errors
    ///
    /// Returns `NoteError::InvalidConfiguration` if the backend cannot be started
    pub fn start(backend: Box<dyn NoteBackend>) -> Result<Self> {
        let backend = BackendGuard::start(backend)?;
        info!("Notes service started");
        Ok(Self { backend })
    }

    /// Stops the backend
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to release its resources
    pub fn stop(self) -> Result<()> {
        self.backend.close()?;
        info!("Notes service stopped");
        Ok(())
    }

    // Retrieve all notes, newest first
    pub fn list_notes(&self) -> Result<Vec<(NoteId, Note)>> {
        let mut notes = self.backend.list_all()?.collect::<Result<Vec<_>>>()?;
        notes.sort_by(|(a_id, a), (b_id, b)| {
            b.updated_on()
                .cmp(&a.updated_on())
                .then_with(|| a_id.cmp(b_id))
        });
        Ok(notes)
    }

    // Create a new note stamped with the current time
    pub fn create_note(&self, title: String, body: String, note_type: NoteType) -> Result<NoteId> {
        let note = Note::new(None, title, body, note_type, now())?;
        let id = self.backend.create(note, None)?;
        debug!("Created note #{id}");
        Ok(id)
    }

    pub fn get_note(&self, id: &NoteId) -> Result<Note> {
        self.backend.read(id)
    }

    // Replace title, body and type, restamping the time
    pub fn update_note(
        &self,
        id: &NoteId,
        title: String,
        body: String,
        note_type: NoteType,
    ) -> Result<()> {
        let note = Note::new(Some(id.clone()), title, body, note_type, now())?;
        self.backend.update(id, note)?;
        debug!("Updated note #{id}");
        Ok(())
    }

    pub fn delete_note(&self, id: &NoteId) -> Result<()> {
        self.backend.delete(id)?;
        debug!("Deleted note #{id}");
        Ok(())
    }
}

fn now() -> i64 {
    Utc::now().timestamp()
}
