use clap::Parser;
use log::error;
use notesbook::setup::{arguments::Args, logging};
use notesbook::ui::cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();
    logging::setup_log(args.debug);

    match cli::run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
