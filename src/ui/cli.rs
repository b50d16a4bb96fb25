use crate::app::NoteService;
use crate::setup::arguments::{Args, Command};
use crate::{Note, NoteId, Result};

use colored::Colorize;
use log::{debug, info};
use tabled::{Table, Tabled, settings::Style};

// Note summary displayed in lists
#[derive(Tabled)]
pub struct NoteRow {
    pub id: NoteId,
    pub title: String,
    pub note_type: String,
    pub updated_on: i64,
}

impl From<(NoteId, Note)> for NoteRow {
    fn from((id, note): (NoteId, Note)) -> Self {
        Self {
            id,
            title: note.title().to_string(),
            note_type: note.note_type().to_string(),
            updated_on: note.updated_on(),
        }
    }
}

/// Renders a table of notes in `psql` style to stdout.
pub fn show_notes_list(notes: Vec<(NoteId, Note)>) {
    let rows: Vec<NoteRow> = notes.into_iter().map(NoteRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::psql());
    println!("{table}");
}

/// Prints a single note with a bolded title line.
pub fn show_note(id: &NoteId, note: &Note) {
    println!("{}", format!("#{id}: {}", note.title()).bold());
    println!("[{}] updated {}\n", note.note_type(), note.updated_on());
    println!("{}", note.body());
}

/// Builds the backend chosen by `args`, runs one command against it, and
/// stops the backend again
///
/// # Errors
///
/// Returns the first error raised while building the backend or running the command
pub fn run(args: Args) -> Result<()> {
    let backend = args.backend_config()?.build()?;
    let service = NoteService::start(backend)?;
    debug!("Running command: {:?}", args.command);

    match args.command {
        Command::Create {
            title,
            body,
            note_type,
        } => {
            let id = service.create_note(title, body, note_type)?;
            info!("Note saved with ID #{id}");
            println!("{id}");
        }
        Command::Read { id } => {
            let note = service.get_note(&id)?;
            show_note(&id, &note);
        }
        Command::Update {
            id,
            title,
            body,
            note_type,
        } => {
            service.update_note(&id, title, body, note_type)?;
            info!("Successfully updated note #{id}");
        }
        Command::Delete { id } => {
            service.delete_note(&id)?;
            info!("Successfully deleted note #{id}");
        }
        Command::List => show_notes_list(service.list_notes()?),
    }

    service.stop()
}
