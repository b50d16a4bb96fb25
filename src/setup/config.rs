use crate::backends::BackendConfig;
use crate::{NoteError, Result};
use serde::Deserialize;
use serde_yaml::Value;
use std::{collections::BTreeMap, fs, path::Path};

/// Contents of the YAML configuration file
///
/// ```yaml
/// service:
///   name: notesbook
/// notes-db:
///   fs: ./notes
/// ```
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(rename = "notes-db")]
    pub notes_db: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,
}

fn default_service_name() -> String {
    "notesbook".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
        }
    }
}

impl Config {
    /// Parses a configuration document
    ///
    /// # Errors
    ///
    /// Returns `NoteError::InvalidConfiguration` if the YAML is malformed or misses `notes-db`
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| NoteError::InvalidConfiguration(format!("Malformed configuration: {e}")))
    }

    /// Selects the backend named under `notes-db`
    ///
    /// # Errors
    ///
    /// Returns `NoteError::InvalidConfiguration` if the mapping names no known backend
    pub fn backend(&self) -> Result<BackendConfig> {
        BackendConfig::from_mapping(&self.notes_db)
    }
}

/// Reads and parses the configuration file at `path`
///
/// # Errors
///
/// Returns `NoteError::InvalidConfiguration` if the file cannot be read or parsed
pub fn load_config(path: &Path) -> Result<Config> {
    let yaml = fs::read_to_string(path).map_err(|e| {
        NoteError::InvalidConfiguration(format!(
            "Failed reading configuration file '{}': {e}",
            path.display()
        ))
    })?;
    Config::from_yaml(&yaml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn reads_service_and_backend() {
        let config = Config::from_yaml(
            "
service:
  name: notes-test
notes-db:
  sql: ./tests/tmp/store.db
",
        )
        .unwrap();
        assert_eq!(config.service.name, "notes-test");
        assert_eq!(
            config.backend().unwrap(),
            BackendConfig::Sqlite(PathBuf::from("./tests/tmp/store.db"))
        );
    }

    #[test]
    fn service_name_defaults() {
        let config = Config::from_yaml("notes-db:\n  memory: null\n").unwrap();
        assert_eq!(config.service.name, "notesbook");
        assert_eq!(config.backend().unwrap(), BackendConfig::Memory);
    }

    #[test]
    fn missing_backend_section_is_invalid() {
        assert!(matches!(
            Config::from_yaml("service:\n  name: x\n"),
            Err(NoteError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "notes-db:\n  fs: /tmp\n").unwrap();
        assert_eq!(
            load_config(&path).unwrap().backend().unwrap(),
            BackendConfig::Filesystem(PathBuf::from("/tmp"))
        );
        assert!(matches!(
            load_config(&dir.path().join("missing.yaml")),
            Err(NoteError::InvalidConfiguration(_))
        ));
    }
}
