//! CLI smoke entry point.
//!
//! # Responsibility
//! - Wire `notekeep_core` at a composition root outside any UI host.
//! - Print a deterministic summary of the store at the given data directory.
//!
//! Usage: `notekeep_cli [DATA_DIR]`. Without a directory, a throwaway store
//! under the system temp dir is used.

use notekeep_core::{init_logging, open_notes, split_pinned, NotesConfig};
use std::path::PathBuf;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let data_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            std::env::temp_dir().join(format!("notekeep-cli-{}", std::process::id()))
        });
    let config = NotesConfig::new(data_dir);

    if let Err(err) = init_logging(&config.log_level, config.log_dir()) {
        eprintln!("notekeep logging disabled: {err}");
    }

    let app = match open_notes(config).await {
        Ok(app) => app,
        Err(err) => {
            eprintln!("notekeep open failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    println!("notekeep_core version={}", notekeep_core::core_version());
    println!("data_dir={}", app.config().data_dir.display());

    match app.service().notes_feed("").snapshot().await {
        Ok(notes) => {
            let split = split_pinned(notes);
            println!("pinned={} others={}", split.pinned.len(), split.others.len());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("notekeep list failed: {err}");
            ExitCode::FAILURE
        }
    }
}
