use super::{FilesystemBackend, MemoryBackend, NoteBackend, NoteError, Result, SqliteBackend};
use log::info;
use serde_yaml::Value;
use std::{collections::BTreeMap, path::PathBuf};

/// Which backend to build, and where it keeps its data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Memory,
    Filesystem(PathBuf),
    Sqlite(PathBuf),
}

impl BackendConfig {
    /// Reads a single-key mapping: `memory` (value ignored), `fs` (directory
    /// path) or `sql` (database file path)
    ///
    /// # Errors
    ///
    /// Returns `NoteError::InvalidConfiguration` for an unknown key, a mapping
    /// without exactly one key, or a path that is not a string
    pub fn from_mapping(mapping: &BTreeMap<String, Value>) -> Result<Self> {
        let mut entries = mapping.iter();
        let (Some((tag, value)), None) = (entries.next(), entries.next()) else {
            return Err(NoteError::InvalidConfiguration(format!(
                "Expected exactly one of `memory`, `fs` or `sql`, got {} keys",
                mapping.len()
            )));
        };

        let path = || {
            value.as_str().map(PathBuf::from).ok_or_else(|| {
                NoteError::InvalidConfiguration(format!("`{tag}` expects a path, got {value:?}"))
            })
        };

        match tag.as_str() {
            "memory" => Ok(Self::Memory),
            "fs" => Ok(Self::Filesystem(path()?)),
            "sql" => Ok(Self::Sqlite(path()?)),
            other => Err(NoteError::InvalidConfiguration(format!(
                "Unknown backend `{other}`"
            ))),
        }
    }

    /// Constructs the selected backend. It still has to be started
    ///
    /// # Errors
    ///
    /// Returns `NoteError::InvalidConfiguration` if the filesystem backend's
    /// directory is unusable
    pub fn build(&self) -> Result<Box<dyn NoteBackend>> {
        // Allow any struct that implements NoteBackend, and store on heap because size is unknown at compile time
        let backend: Box<dyn NoteBackend> = match self {
            Self::Memory => Box::new(MemoryBackend::new()),
            Self::Filesystem(path) => Box::new(FilesystemBackend::new(path)?),
            Self::Sqlite(path) => Box::new(SqliteBackend::new(path)),
        };
        info!("Using {self:?} backend");
        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn mapping(yaml: &str) -> BTreeMap<String, Value> {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn memory_value_is_ignored() {
        assert_eq!(
            BackendConfig::from_mapping(&mapping("memory: null")).unwrap(),
            BackendConfig::Memory
        );
        assert_eq!(
            BackendConfig::from_mapping(&mapping("memory: whatever")).unwrap(),
            BackendConfig::Memory
        );
    }

    #[test]
    fn fs_and_sql_carry_paths() {
        assert_eq!(
            BackendConfig::from_mapping(&mapping("fs: /tmp")).unwrap(),
            BackendConfig::Filesystem(PathBuf::from("/tmp"))
        );
        assert_eq!(
            BackendConfig::from_mapping(&mapping("sql: ./tests/tmp/store.db")).unwrap(),
            BackendConfig::Sqlite(PathBuf::from("./tests/tmp/store.db"))
        );
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!(matches!(
            BackendConfig::from_mapping(&mapping("redis: localhost")),
            Err(NoteError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn mapping_needs_exactly_one_key() {
        assert!(matches!(
            BackendConfig::from_mapping(&BTreeMap::new()),
            Err(NoteError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            BackendConfig::from_mapping(&mapping("memory: null\nfs: /tmp")),
            Err(NoteError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn path_must_be_a_string() {
        assert!(matches!(
            BackendConfig::from_mapping(&mapping("fs: null")),
            Err(NoteError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn builds_each_backend() {
        let dir = TempDir::new().unwrap();
        let configs = [
            BackendConfig::Memory,
            BackendConfig::Filesystem(dir.path().join("notes")),
            BackendConfig::Sqlite(dir.path().join("store.db")),
        ];
        for config in configs {
            let mut backend = config.build().unwrap();
            backend.start().unwrap();
            let id = backend
                .create(crate::backends::tests::sample("built"), None)
                .unwrap();
            assert_eq!(backend.read(&id).unwrap().title(), "built");
            backend.stop().unwrap();
        }
    }
}
