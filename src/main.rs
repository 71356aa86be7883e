//! Provides the main entry point to the program.
use human_panic::{metadata, setup_panic};
use std::process::ExitCode;

fn main() -> ExitCode {
    setup_panic!(metadata!().support("Please report the bug, including the report file above."));

    if let Err(err) = resite::cli::run_cli() {
        // The logger may not be running yet, so report straight to stderr
        eprintln!("Error: {err:?}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
