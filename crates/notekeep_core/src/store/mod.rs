//! Query surface over persisted notes.
//!
//! # Responsibility
//! - Define the minimal storage contract the repository is allowed to use.
//! - Publish a change counter so read feeds can re-query after writes.
//!
//! # Invariants
//! - One `upsert` writes scalar fields and content rows atomically.
//! - Every successful mutation bumps the change counter exactly once.
//! - `fetch_all` and `search` share one stable order:
//!   `updated_at DESC, id DESC`.

use crate::codec::ContentRow;
use crate::db::DbResult;
use crate::model::note::NoteId;
use tokio::sync::watch;

pub mod memory;
pub mod sqlite;

/// Receiver side of the store change counter.
pub type ChangeReceiver = watch::Receiver<u64>;

/// Persisted shape of one note: scalar fields plus encoded content rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRow {
    pub id: NoteId,
    pub title: String,
    pub updated_at: i64,
    pub is_pinned: bool,
    pub content: Vec<ContentRow>,
}

/// Storage contract consumed by the note repository.
///
/// Implementations are synchronous; the repository moves calls onto the
/// blocking pool.
pub trait NoteQueries: Send + Sync + 'static {
    /// Inserts (`id == UNSAVED_NOTE_ID`) or overwrites a note keyed by id.
    /// Returns the effective id.
    fn upsert(&self, row: &NoteRow) -> DbResult<NoteId>;
    fn fetch_by_id(&self, id: NoteId) -> DbResult<Option<NoteRow>>;
    fn fetch_all(&self) -> DbResult<Vec<NoteRow>>;
    /// Substring match on title or any text content row.
    fn search(&self, text: &str) -> DbResult<Vec<NoteRow>>;
    /// Returns `false` when no row had this id.
    fn delete_by_id(&self, id: NoteId) -> DbResult<bool>;
    /// Returns `false` when no row had this id.
    fn toggle_pinned(&self, id: NoteId) -> DbResult<bool>;
    /// Number of image content rows pointing at `path`, across all notes.
    fn count_image_references(&self, path: &str) -> DbResult<u64>;
    /// Subscribes to the change counter.
    fn subscribe(&self) -> ChangeReceiver;
}

/// Change-notification bus shared by store implementations.
#[derive(Debug)]
pub struct ChangeBus {
    sender: watch::Sender<u64>,
}

impl ChangeBus {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(0);
        Self { sender }
    }

    /// Bumps the counter and wakes every subscriber.
    pub fn notify(&self) {
        self.sender
            .send_modify(|version| *version = version.wrapping_add(1));
    }

    pub fn subscribe(&self) -> ChangeReceiver {
        self.sender.subscribe()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}
