use super::{BackendError, Note, NoteBackend, NoteEntries, NoteError, NoteId, Result, unused_id};
use crate::NoteType;
use log::{debug, trace};
use rusqlite::{
    Connection, Error as SqliteError, ErrorCode, OptionalExtension, Row, ToSql, ffi, params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
};

// Rows fetched per round trip by `list_all`
const PAGE_SIZE: i64 = 64;

const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS notes (
        id         TEXT PRIMARY KEY,
        title      TEXT NOT NULL,
        body       TEXT NOT NULL DEFAULT '',
        note_type  TEXT CHECK(note_type IN ('personal', 'work')) NOT NULL,
        updated_on INTEGER DEFAULT 0
    )
";

/// Stores notes in a single `notes` table of an `SQLite` database file.
///
/// The connection is opened by `start` and closed by `stop`; every statement
/// autocommits. Existence checks before writes are advisory, the primary key
/// is what actually rejects duplicate IDs.
#[derive(Debug)]
pub struct SqliteBackend {
    path: PathBuf,
    connection: Option<Connection>,
}

impl SqliteBackend {
    /// Creates an unstarted backend for the database file at `path`
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            connection: None,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connection(&self) -> Result<&Connection> {
        self.connection
            .as_ref()
            .ok_or(NoteError::Backend(BackendError::NotStarted))
    }

    fn exists(&self, id: &NoteId) -> Result<bool> {
        let found = self
            .connection()?
            .query_row("SELECT 1 FROM notes WHERE id = ?1", params![id], |_| Ok(()))
            .optional()
            .map_err(map_sqlite_error)?;
        Ok(found.is_some())
    }
}

/// Maps a `rusqlite::Error` into a `NoteError`, wrapping known SQLite-specific codes into domain-specific variants.
///
/// A primary-key violation means another writer inserted the same ID after our
/// existence check, and is reported as `NoteError::AlreadyExists` by `create`.
fn map_sqlite_error(e: SqliteError) -> NoteError {
    match e {
        SqliteError::SqliteFailure(code, _) => match code.code {
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                NoteError::Backend(BackendError::DatabaseBusy)
            }
            ErrorCode::PermissionDenied | ErrorCode::ReadOnly => {
                NoteError::Backend(BackendError::PermissionDenied)
            }
            ErrorCode::NotADatabase => NoteError::Backend(BackendError::NotADatabase),
            ErrorCode::SchemaChanged => NoteError::Backend(BackendError::SchemaChanged),
            ErrorCode::DatabaseCorrupt | ErrorCode::SystemIoFailure => {
                NoteError::Backend(BackendError::DatabaseCorruptOrIo)
            }
            _ => NoteError::Backend(BackendError::Other(anyhow::anyhow!(
                "SQLite error: {:?}",
                code
            ))),
        },
        other => NoteError::Backend(BackendError::Other(anyhow::Error::new(other))),
    }
}

fn is_primary_key_violation(e: &SqliteError) -> bool {
    matches!(
        e,
        SqliteError::SqliteFailure(code, _)
            if code.code == ErrorCode::ConstraintViolation
                && code.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

/// Maps an error from inserting `id`, reporting a primary-key violation as
/// `NoteError::AlreadyExists`
fn map_insert_error(e: SqliteError, id: &NoteId) -> NoteError {
    if is_primary_key_violation(&e) {
        NoteError::AlreadyExists(id.clone())
    } else {
        map_sqlite_error(e)
    }
}

impl ToSql for NoteId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for NoteId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for NoteType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for NoteType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

// Raw column values of one row, validated into a `Note` outside of rusqlite
struct NoteRow {
    id: NoteId,
    title: String,
    body: String,
    note_type: NoteType,
    updated_on: i64,
}

impl NoteRow {
    // Expects columns: id, title, body, note_type, updated_on
    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            title: row.get(offset + 1)?,
            body: row.get(offset + 2)?,
            note_type: row.get(offset + 3)?,
            updated_on: row.get::<_, Option<i64>>(offset + 4)?.unwrap_or_default(),
        })
    }

    fn into_entry(self) -> Result<(NoteId, Note)> {
        let note = Note::new(
            Some(self.id.clone()),
            self.title,
            self.body,
            self.note_type,
            self.updated_on,
        )?;
        Ok((self.id, note))
    }
}

/// Keyset-paginated scan over the `notes` table.
///
/// Each page is a separate statement, so no cursor stays open between pages
/// and dropping the iterator early needs no cleanup.
struct NotePages<'a> {
    connection: &'a Connection,
    last_rowid: i64,
    buffer: VecDeque<Result<(NoteId, Note)>>,
    exhausted: bool,
}

impl<'a> NotePages<'a> {
    const fn new(connection: &'a Connection) -> Self {
        Self {
            connection,
            last_rowid: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    fn fetch_page(&mut self) -> Result<()> {
        let mut stmt = self
            .connection
            .prepare_cached(
                "SELECT rowid, id, title, body, note_type, updated_on FROM notes
                 WHERE rowid > ?1 ORDER BY rowid LIMIT ?2",
            )
            .map_err(map_sqlite_error)?;

        let rows = stmt
            .query_map(params![self.last_rowid, PAGE_SIZE], |row| {
                Ok((row.get::<_, i64>(0)?, NoteRow::from_row(row, 1)?))
            })
            .map_err(map_sqlite_error)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(map_sqlite_error)?;

        trace!("Fetched page of {} notes after rowid {}", rows.len(), self.last_rowid);
        if rows.len() < usize::try_from(PAGE_SIZE).unwrap_or(usize::MAX) {
            self.exhausted = true;
        }
        for (rowid, row) in rows {
            self.last_rowid = rowid;
            self.buffer.push_back(row.into_entry());
        }
        Ok(())
    }
}

impl Iterator for NotePages<'_> {
    type Item = Result<(NoteId, Note)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(e) = self.fetch_page() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front()
    }
}

impl NoteBackend for SqliteBackend {
    /// Opens the database file and creates the `notes` table if it doesn't exist
    ///
    /// # Errors
    ///
    /// Returns `NoteError::InvalidConfiguration` if the database cannot be opened
    /// or the table cannot be created
    fn start(&mut self) -> Result<()> {
        if self.connection.is_some() {
            return Ok(());
        }
        let connection = Connection::open(&self.path).map_err(|e| {
            NoteError::InvalidConfiguration(format!(
                "Failed opening DB at '{}': {e}",
                self.path.display()
            ))
        })?;
        debug!("Opened connection to db: {}", self.path.display());

        connection.execute(CREATE_TABLE, []).map_err(|e| {
            NoteError::InvalidConfiguration(format!("Failed creating `notes` table: {e}"))
        })?;
        debug!("Initialized db with `notes` table");

        self.connection = Some(connection);
        Ok(())
    }

    /// Closes the connection if one is open
    ///
    /// # Errors
    ///
    /// Returns a mapped `SQLite` error if the connection fails to close. It is
    /// dropped either way
    fn stop(&mut self) -> Result<()> {
        if let Some(connection) = self.connection.take() {
            connection.close().map_err(|(_, e)| map_sqlite_error(e))?;
            debug!("Closed connection to db: {}", self.path.display());
        }
        Ok(())
    }

    /// Inserts a new row
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `NoteError::AlreadyExists` if the ID is taken, whether caught by the
    ///   existence check or by the primary key
    /// - `BackendError::NotStarted` if `start` has not been called
    /// - Other mapped `SQLite` errors
    fn create(&self, note: Note, id: Option<NoteId>) -> Result<NoteId> {
        let id = match id {
            Some(id) => {
                if self.exists(&id)? {
                    return Err(NoteError::AlreadyExists(id));
                }
                id
            }
            None => unused_id(|id| self.exists(id))?,
        };

        self.connection()?
            .execute(
                "INSERT INTO notes (id, title, body, note_type, updated_on)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    note.title(),
                    note.body(),
                    note.note_type(),
                    note.updated_on()
                ],
            )
            .map_err(|e| map_insert_error(e, &id))?;
        trace!("Created row with note data: {note:?}");
        Ok(id)
    }

    /// Reads a note row by ID
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `NoteError::NotFound` if no note with the given ID exists
    /// - `NoteError::Validation` if the stored row is not a valid note
    /// - Other mapped `SQLite` errors for query failure
    fn read(&self, id: &NoteId) -> Result<Note> {
        if !self.exists(id)? {
            return Err(NoteError::NotFound(id.clone()));
        }
        let row = self
            .connection()?
            .query_row(
                "SELECT id, title, body, note_type, updated_on FROM notes WHERE id = ?1",
                params![id],
                |row| NoteRow::from_row(row, 0),
            )
            .optional()
            .map_err(map_sqlite_error)?
            .ok_or_else(|| NoteError::NotFound(id.clone()))?;
        Ok(row.into_entry()?.1)
    }

    /// Replaces every column of an existing row except its ID
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `NoteError::NotFound` if no note with the given ID exists
    /// - Other mapped `SQLite` errors if the update fails
    fn update(&self, id: &NoteId, note: Note) -> Result<()> {
        if !self.exists(id)? {
            return Err(NoteError::NotFound(id.clone()));
        }
        let rows = self
            .connection()?
            .execute(
                "UPDATE notes SET title = ?2, body = ?3, note_type = ?4, updated_on = ?5
                 WHERE id = ?1",
                params![
                    id,
                    note.title(),
                    note.body(),
                    note.note_type(),
                    note.updated_on()
                ],
            )
            .map_err(map_sqlite_error)?;

        if rows == 0 {
            Err(NoteError::NotFound(id.clone()))
        } else {
            Ok(())
        }
    }

    /// Deletes a note row by ID
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `NoteError::NotFound` if the note was not found
    /// - Other mapped `SQLite` errors if the deletion fails
    fn delete(&self, id: &NoteId) -> Result<()> {
        if !self.exists(id)? {
            return Err(NoteError::NotFound(id.clone()));
        }
        let rows = self
            .connection()?
            .execute("DELETE FROM notes WHERE id = ?1", params![id])
            .map_err(map_sqlite_error)?;

        if rows == 0 {
            Err(NoteError::NotFound(id.clone()))
        } else {
            Ok(())
        }
    }

    fn list_all(&self) -> Result<NoteEntries<'_>> {
        Ok(Box::new(NotePages::new(self.connection()?)))
    }

    fn clear(&self) -> Result<()> {
        let rows = self
            .connection()?
            .execute("DELETE FROM notes", [])
            .map_err(map_sqlite_error)?;
        debug!("Cleared {rows} notes from db");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::tests as common_tests;
    use tempfile::TempDir;

    fn get_backend() -> (TempDir, SqliteBackend) {
        let dir = TempDir::new().unwrap();
        let mut backend = SqliteBackend::new(dir.path().join("store.db"));
        backend.start().unwrap();
        (dir, backend)
    }

    #[test]
    fn round_trip() {
        let (_dir, backend) = get_backend();
        common_tests::round_trip(&backend);
    }

    #[test]
    fn explicit_id_is_used() {
        let (_dir, backend) = get_backend();
        common_tests::explicit_id_is_used(&backend);
    }

    #[test]
    fn duplicate_create_fails() {
        let (_dir, backend) = get_backend();
        common_tests::duplicate_create_fails(&backend);
    }

    #[test]
    fn not_found_symmetry() {
        let (_dir, backend) = get_backend();
        common_tests::not_found_symmetry(&backend);
    }

    #[test]
    fn update_replaces_wholesale() {
        let (_dir, backend) = get_backend();
        common_tests::update_replaces_wholesale(&backend);
    }

    #[test]
    fn embedded_id_follows_key() {
        let (_dir, backend) = get_backend();
        common_tests::embedded_id_follows_key(&backend);
    }

    #[test]
    fn count_invariant() {
        let (_dir, backend) = get_backend();
        common_tests::count_invariant(&backend);
    }

    #[test]
    fn list_all_is_restartable() {
        let (_dir, backend) = get_backend();
        common_tests::list_all_is_restartable(&backend);
    }

    #[test]
    fn clear_empties() {
        let (_dir, backend) = get_backend();
        common_tests::clear_empties(&backend);
    }

    #[test]
    fn groceries_scenario() {
        let (_dir, backend) = get_backend();
        common_tests::groceries_scenario(&backend);
    }

    #[test]
    fn start_creates_database_file() {
        let (dir, _backend) = get_backend();
        assert!(dir.path().join("store.db").is_file());
    }

    #[test]
    fn operations_before_start_fail() {
        let dir = TempDir::new().unwrap();
        let backend = SqliteBackend::new(dir.path().join("store.db"));
        let id: NoteId = "x".parse().unwrap();
        assert!(matches!(
            backend.read(&id),
            Err(NoteError::Backend(BackendError::NotStarted))
        ));
    }

    #[test]
    fn stop_releases_connection() {
        let (_dir, mut backend) = get_backend();
        backend.stop().unwrap();
        backend.stop().unwrap();
        assert!(matches!(
            backend.list_all().map(|_| ()),
            Err(NoteError::Backend(BackendError::NotStarted))
        ));
    }

    #[test]
    fn data_survives_restart() {
        let (_dir, mut backend) = get_backend();
        let id = backend.create(common_tests::sample("kept"), None).unwrap();
        backend.stop().unwrap();
        backend.start().unwrap();
        assert_eq!(backend.read(&id).unwrap().title(), "kept");
    }

    #[test]
    fn unopenable_path_is_invalid_configuration() {
        let dir = TempDir::new().unwrap();
        let mut backend = SqliteBackend::new(dir.path().join("missing").join("store.db"));
        assert!(matches!(
            backend.start(),
            Err(NoteError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn primary_key_backstops_racing_insert() {
        let (dir, backend) = get_backend();
        let id: NoteId = "raced".parse().unwrap();

        // A second connection inserts between our existence check and insert
        let other = Connection::open(dir.path().join("store.db")).unwrap();
        other
            .execute(
                "INSERT INTO notes (id, title, note_type) VALUES ('raced', 'other', 'work')",
                [],
            )
            .unwrap();

        let err = backend
            .connection()
            .unwrap()
            .execute(
                "INSERT INTO notes (id, title, body, note_type, updated_on)
                 VALUES ('raced', 't', '', 'work', 0)",
                [],
            )
            .unwrap_err();
        assert!(is_primary_key_violation(&err));
        assert!(matches!(
            map_insert_error(err, &id),
            NoteError::AlreadyExists(ref i) if *i == id
        ));
        assert!(matches!(
            backend.create(common_tests::sample("mine"), Some(id)),
            Err(NoteError::AlreadyExists(_))
        ));
    }

    #[test]
    fn other_insert_errors_are_not_duplicates() {
        let (_dir, backend) = get_backend();
        let id: NoteId = "typed".parse().unwrap();
        let err = backend
            .connection()
            .unwrap()
            .execute(
                "INSERT INTO notes (id, title, note_type) VALUES ('typed', 't', 'hobby')",
                [],
            )
            .unwrap_err();
        assert!(!is_primary_key_violation(&err));
        assert!(matches!(
            map_insert_error(err, &id),
            NoteError::Backend(BackendError::Other(_))
        ));
    }

    #[test]
    fn list_all_spans_several_pages() {
        let (_dir, backend) = get_backend();
        let total = usize::try_from(PAGE_SIZE).unwrap() * 2 + 3;
        for i in 0..total {
            backend
                .create(common_tests::sample(&format!("note {i}")), None)
                .unwrap();
        }
        assert_eq!(backend.list_all().unwrap().count(), total);
    }

    #[test]
    fn schema_rejects_unknown_note_type() {
        let (_dir, backend) = get_backend();
        let result = backend.connection().unwrap().execute(
            "INSERT INTO notes (id, title, note_type) VALUES ('x', 't', 'hobby')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn column_defaults_apply() {
        let (_dir, backend) = get_backend();
        backend
            .connection()
            .unwrap()
            .execute(
                "INSERT INTO notes (id, title, note_type) VALUES ('bare', 'Bare', 'personal')",
                [],
            )
            .unwrap();
        let note = backend.read(&"bare".parse().unwrap()).unwrap();
        assert_eq!(note.body(), "");
        assert_eq!(note.updated_on(), 0);
    }
}
