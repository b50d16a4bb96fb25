use crate::NoteValidationError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Opaque identifier of a stored note.
///
/// IDs double as file names in the filesystem backend, so they must be
/// non-empty and free of path separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NoteId(String);

impl NoteId {
    /// Generates a random 128-bit ID rendered as 32 lowercase hex characters
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for NoteId {
    type Error = NoteValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let unsafe_name = value == "." || value == "..";
        if value.trim().is_empty()
            || unsafe_name
            || value.contains(['/', '\\', '\0'])
        {
            return Err(NoteValidationError::InvalidId(value));
        }
        Ok(Self(value))
    }
}

impl FromStr for NoteId {
    type Err = NoteValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_string())
    }
}

impl From<NoteId> for String {
    fn from(id: NoteId) -> Self {
        id.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Category of a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteType {
    Personal,
    Work,
}

impl NoteType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Work => "work",
        }
    }
}

impl FromStr for NoteType {
    type Err = NoteValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "personal" => Ok(Self::Personal),
            "work" => Ok(Self::Work),
            other => Err(NoteValidationError::UnknownNoteType(other.to_string())),
        }
    }
}

impl fmt::Display for NoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated, immutable note.
///
/// Serialized as `{"id", "title", "body", "note_type", "updated_on"}`, with
/// `id` omitted when unset. Deserialization runs the same validation as
/// [`Note::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNote")]
pub struct Note {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<NoteId>,
    title: String,
    body: String,
    note_type: NoteType,
    updated_on: i64,
}

// Unvalidated shape read from JSON
#[derive(Deserialize)]
struct RawNote {
    #[serde(default)]
    id: Option<NoteId>,
    title: String,
    #[serde(default)]
    body: String,
    note_type: NoteType,
    updated_on: i64,
}

impl TryFrom<RawNote> for Note {
    type Error = NoteValidationError;

    fn try_from(raw: RawNote) -> Result<Self, Self::Error> {
        Self::new(raw.id, raw.title, raw.body, raw.note_type, raw.updated_on)
    }
}

impl Note {
    /// Builds a note, rejecting an empty or whitespace-only title
    ///
    /// # Errors
    ///
    /// Returns `NoteValidationError::TitleEmpty` if `title` has no visible characters
    pub fn new(
        id: Option<NoteId>,
        title: impl Into<String>,
        body: impl Into<String>,
        note_type: NoteType,
        updated_on: i64,
    ) -> Result<Self, NoteValidationError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(NoteValidationError::TitleEmpty);
        }
        Ok(Self {
            id,
            title,
            body: body.into(),
            note_type,
            updated_on,
        })
    }

    /// Returns the same note carrying `id`
    #[must_use]
    pub fn with_id(self, id: NoteId) -> Self {
        Self {
            id: Some(id),
            ..self
        }
    }

    #[must_use]
    pub const fn id(&self) -> Option<&NoteId> {
        self.id.as_ref()
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    #[must_use]
    pub const fn note_type(&self) -> NoteType {
        self.note_type
    }

    #[must_use]
    pub const fn updated_on(&self) -> i64 {
        self.updated_on
    }
}
