//! Core note store for Notekeep.
//! This crate is the single source of truth for note content and image
//! ownership invariants.

pub mod app;
pub mod codec;
pub mod config;
pub mod db;
pub mod image;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use app::{open_notes, AppError, DefaultNotesRepository, NotesApp};
pub use codec::{ContentRow, MalformedContentError};
pub use config::NotesConfig;
pub use image::{FsImageFileManager, ImageError, ImageFileManager, ImageResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::note::{
    split_pinned, BlockKind, ContentBlock, Note, NoteId, PinnedSplit, UNSAVED_NOTE_ID,
};
pub use repo::{LocalNotesRepository, NoteFeed, NotesRepository, RepoError, RepoResult};
pub use service::note_service::{NoteService, NoteServiceError, OverviewFeed};
pub use store::memory::MemoryNoteStore;
pub use store::sqlite::SqliteNoteStore;
pub use store::{ChangeReceiver, NoteQueries, NoteRow};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
