//! Note use-case service.
//!
//! # Responsibility
//! - Apply editing-flow rules (blank pruning, savability, timestamps) before
//!   handing notes to the repository.
//! - Shape list feeds into pinned/other groups for list screens.
//!
//! # Invariants
//! - Blank text blocks never reach storage through this service.
//! - `updated_at` is stamped here, in epoch milliseconds, on every write.
//! - A blank search query selects the all-notes feed.

use crate::model::note::{split_pinned, ContentBlock, Note, NoteId, PinnedSplit, UNSAVED_NOTE_ID};
use crate::repo::{NoteFeed, NotesRepository, RepoError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Service error for note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Title is blank or no block carries content.
    EmptyNote,
    /// Target note does not exist.
    NoteNotFound(NoteId),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyNote => write!(f, "note needs a title and some content"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for NoteServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NoteNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// List feed split into pinned and other notes.
pub struct OverviewFeed {
    inner: NoteFeed,
}

impl OverviewFeed {
    /// Waits for the next grouped snapshot; `None` once the feed closes.
    pub async fn next(&mut self) -> Option<Result<PinnedSplit, NoteServiceError>> {
        let snapshot = self.inner.next().await?;
        Some(snapshot.map(split_pinned).map_err(NoteServiceError::from))
    }
}

/// Note service facade over repository implementations.
pub struct NoteService<R: NotesRepository> {
    repo: R,
}

impl<R: NotesRepository> NoteService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Creates a note from editor content and returns the stored version.
    pub async fn create_note(
        &self,
        title: impl Into<String>,
        content: Vec<ContentBlock>,
        is_pinned: bool,
    ) -> Result<Note, NoteServiceError> {
        let mut draft = Note::draft(title, content, now_epoch_ms()).without_blank_text();
        draft.is_pinned = is_pinned;
        if !draft.is_savable() {
            return Err(NoteServiceError::EmptyNote);
        }

        let id = self
            .repo
            .add_note(draft.title, draft.content, draft.is_pinned, draft.updated_at)
            .await?;
        Ok(self.repo.get_note(id).await?)
    }

    /// Saves an edited note and returns the stored version.
    pub async fn save_note(&self, note: Note) -> Result<Note, NoteServiceError> {
        if note.id == UNSAVED_NOTE_ID {
            return self
                .create_note(note.title, note.content, note.is_pinned)
                .await;
        }

        let mut pruned = note.without_blank_text();
        if !pruned.is_savable() {
            return Err(NoteServiceError::EmptyNote);
        }
        pruned.updated_at = now_epoch_ms();

        let id = pruned.id;
        self.repo.edit_note(pruned).await?;
        Ok(self.repo.get_note(id).await?)
    }

    /// Loads a note shaped for the editor: always ends in a text block.
    pub async fn open_for_editing(&self, id: NoteId) -> Result<Note, NoteServiceError> {
        Ok(self.repo.get_note(id).await?.with_trailing_text())
    }

    pub async fn get_note(&self, id: NoteId) -> Result<Note, NoteServiceError> {
        Ok(self.repo.get_note(id).await?)
    }

    pub async fn delete_note(&self, id: NoteId) -> Result<(), NoteServiceError> {
        Ok(self.repo.delete_note(id).await?)
    }

    /// Flips the pinned flag and returns the updated note.
    pub async fn toggle_pin(&self, id: NoteId) -> Result<Note, NoteServiceError> {
        self.repo.switch_pin_status(id).await?;
        Ok(self.repo.get_note(id).await?)
    }

    /// All-notes feed for a blank query, search feed otherwise.
    pub fn notes_feed(&self, query: &str) -> NoteFeed {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            self.repo.get_all_notes()
        } else {
            self.repo.search_notes(trimmed)
        }
    }

    /// Same selection as [`Self::notes_feed`], grouped by pinned state.
    pub fn overview_feed(&self, query: &str) -> OverviewFeed {
        OverviewFeed {
            inner: self.notes_feed(query),
        }
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
