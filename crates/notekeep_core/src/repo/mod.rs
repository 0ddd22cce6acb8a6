//! Note repository: the only writer of persisted notes.
//!
//! # Responsibility
//! - Orchestrate whole-note create/read/update/delete over `NoteQueries`.
//! - Keep every persisted image reference pointing at an owned file.
//! - Clean up owned image files that notes stop referencing.
//!
//! # Invariants
//! - Image materialization runs before every encode-and-persist.
//! - Row mutations happen before file cleanup; cleanup is best-effort.
//! - Repository APIs return semantic errors (`NotFound`, `MalformedContent`)
//!   in addition to storage and filesystem errors.

use crate::codec::{decode, MalformedContentError};
use crate::db::{DbError, DbResult};
use crate::image::ImageError;
use crate::model::note::{ContentBlock, Note, NoteId};
use crate::store::{NoteQueries, NoteRow};
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

mod feed;
mod notes_repo;

pub use feed::NoteFeed;
pub use notes_repo::LocalNotesRepository;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for note persistence and image bookkeeping.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(NoteId),
    MalformedContent {
        note_id: NoteId,
        source: MalformedContentError,
    },
    Image(ImageError),
    /// Blocking storage task panicked or was cancelled.
    Task(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::MalformedContent { note_id, source } => {
                write!(f, "malformed content in note {note_id}: {source}")
            }
            Self::Image(err) => write!(f, "{err}"),
            Self::Task(message) => write!(f, "storage task failed: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::MalformedContent { source, .. } => Some(source),
            Self::Image(err) => Some(err),
            Self::NotFound(_) | Self::Task(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<ImageError> for RepoError {
    fn from(value: ImageError) -> Self {
        Self::Image(value)
    }
}

/// Note use-case storage contract.
#[async_trait]
pub trait NotesRepository: Send + Sync {
    /// Persists a new note and returns its assigned id.
    async fn add_note(
        &self,
        title: String,
        content: Vec<ContentBlock>,
        is_pinned: bool,
        updated_at: i64,
    ) -> RepoResult<NoteId>;
    /// Overwrites an existing note keyed by `note.id`.
    async fn edit_note(&self, note: Note) -> RepoResult<()>;
    /// Removes the note row, then its owned images.
    async fn delete_note(&self, id: NoteId) -> RepoResult<()>;
    async fn get_note(&self, id: NoteId) -> RepoResult<Note>;
    /// Live feed of all notes.
    fn get_all_notes(&self) -> NoteFeed;
    /// Live feed filtered by `query`; a blank query means all notes.
    fn search_notes(&self, query: &str) -> NoteFeed;
    async fn switch_pin_status(&self, id: NoteId) -> RepoResult<()>;
    /// Deletes owned image files no note references. Returns the count removed.
    async fn sweep_orphaned_images(&self) -> RepoResult<usize>;
}

/// Runs one store call on the blocking pool.
pub(crate) async fn run_blocking<Q, T, F>(queries: &Arc<Q>, f: F) -> RepoResult<T>
where
    Q: NoteQueries + ?Sized,
    T: Send + 'static,
    F: FnOnce(&Q) -> DbResult<T> + Send + 'static,
{
    let queries = Arc::clone(queries);
    tokio::task::spawn_blocking(move || f(queries.as_ref()))
        .await
        .map_err(|err| RepoError::Task(err.to_string()))?
        .map_err(RepoError::from)
}

/// Decodes a stored row into a note snapshot.
pub(crate) fn row_to_note(row: NoteRow) -> RepoResult<Note> {
    let content = decode(row.content).map_err(|source| RepoError::MalformedContent {
        note_id: row.id,
        source,
    })?;
    Ok(Note {
        id: row.id,
        title: row.title,
        content,
        updated_at: row.updated_at,
        is_pinned: row.is_pinned,
    })
}
