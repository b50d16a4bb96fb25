use super::{Note, NoteBackend, NoteEntries, NoteError, NoteId, Result, unused_id};
use log::trace;
use std::{cell::RefCell, collections::HashMap};

/// Keeps notes in a process-local map. Nothing survives the instance
#[derive(Debug, Default)]
pub struct MemoryBackend {
    notes: RefCell<HashMap<NoteId, Note>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl NoteBackend for MemoryBackend {
    fn create(&self, note: Note, id: Option<NoteId>) -> Result<NoteId> {
        let id = match id {
            Some(id) if self.notes.borrow().contains_key(&id) => {
                return Err(NoteError::AlreadyExists(id));
            }
            Some(id) => id,
            None => unused_id(|id| Ok(self.notes.borrow().contains_key(id)))?,
        };
        self.notes
            .borrow_mut()
            .insert(id.clone(), note.with_id(id.clone()));
        trace!("Stored note #{id} in memory");
        Ok(id)
    }

    fn read(&self, id: &NoteId) -> Result<Note> {
        self.notes
            .borrow()
            .get(id)
            .cloned()
            .ok_or_else(|| NoteError::NotFound(id.clone()))
    }

    fn update(&self, id: &NoteId, note: Note) -> Result<()> {
        let mut notes = self.notes.borrow_mut();
        let stored = notes
            .get_mut(id)
            .ok_or_else(|| NoteError::NotFound(id.clone()))?;
        *stored = note.with_id(id.clone());
        Ok(())
    }

    fn delete(&self, id: &NoteId) -> Result<()> {
        self.notes
            .borrow_mut()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| NoteError::NotFound(id.clone()))
    }

    /// Captures the key set at call time and looks each note up on demand.
    /// Notes deleted during iteration are skipped
    fn list_all(&self) -> Result<NoteEntries<'_>> {
        let ids: Vec<NoteId> = self.notes.borrow().keys().cloned().collect();
        Ok(Box::new(ids.into_iter().filter_map(move |id| {
            let note = self.notes.borrow().get(&id).cloned();
            note.map(|note| Ok((id, note)))
        })))
    }

    fn clear(&self) -> Result<()> {
        self.notes.borrow_mut().clear();
        Ok(())
    }
}
