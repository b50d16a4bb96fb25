use crate::backends::BackendConfig;
use crate::setup::config::load_config;
use crate::{NoteId, NoteType, Result};

use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about)]
#[command(group(
    ArgGroup::new("backend")
        .required(true)
        .args(["config", "memory", "fs", "sql"]),
))]
pub struct Args {
    /// YAML configuration file with a `notes-db` section
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Keep notes in memory for this invocation only
    #[arg(long)]
    pub memory: bool,
    /// Directory holding one JSON file per note
    #[arg(long)]
    pub fs: Option<PathBuf>,
    /// SQLite database file
    #[arg(long)]
    pub sql: Option<PathBuf>,
    /// Turn on debug logging
    #[arg(short, long)]
    pub debug: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a note and print its ID
    Create {
        #[arg(short, long)]
        title: String,
        #[arg(short, long, default_value = "")]
        body: String,
        #[arg(short = 'n', long)]
        note_type: NoteType,
    },
    /// Show a note
    Read { id: NoteId },
    /// Replace a note's title, body and type
    Update {
        id: NoteId,
        #[arg(short, long)]
        title: String,
        #[arg(short, long, default_value = "")]
        body: String,
        #[arg(short = 'n', long)]
        note_type: NoteType,
    },
    /// Delete a note
    Delete { id: NoteId },
    /// List all notes
    List,
}

impl Args {
    /// Resolves the backend selected on the command line
    ///
    /// # Errors
    ///
    /// Forwards configuration file errors as `NoteError::InvalidConfiguration`
    pub fn backend_config(&self) -> Result<BackendConfig> {
        if let Some(path) = &self.config {
            return load_config(path)?.backend();
        }
        Ok(match (&self.fs, &self.sql) {
            (Some(dir), _) => BackendConfig::Filesystem(dir.clone()),
            (None, Some(file)) => BackendConfig::Sqlite(file.clone()),
            (None, None) => BackendConfig::Memory,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_create_with_fs_backend() {
        let args = Args::try_parse_from([
            "notesbook",
            "--fs",
            "/tmp/notes",
            "create",
            "--title",
            "Groceries",
            "--body",
            "milk,eggs",
            "--note-type",
            "personal",
        ])
        .unwrap();
        assert_eq!(
            args.backend_config().unwrap(),
            BackendConfig::Filesystem(PathBuf::from("/tmp/notes"))
        );
        assert!(matches!(
            args.command,
            Command::Create { ref title, note_type: NoteType::Personal, .. } if title == "Groceries"
        ));
    }

    #[test]
    fn backend_is_required() {
        assert!(Args::try_parse_from(["notesbook", "list"]).is_err());
    }

    #[test]
    fn backends_are_exclusive() {
        assert!(Args::try_parse_from(["notesbook", "--memory", "--sql", "x.db", "list"]).is_err());
    }

    #[test]
    fn rejects_unknown_note_type() {
        assert!(
            Args::try_parse_from([
                "notesbook", "--memory", "create", "--title", "t", "--note-type", "hobby",
            ])
            .is_err()
        );
    }
}
