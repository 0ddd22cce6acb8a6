//! Live note list subscriptions.

use super::{row_to_note, run_blocking, RepoResult};
use crate::model::note::Note;
use crate::store::{ChangeReceiver, NoteQueries, NoteRow};
use log::warn;
use std::sync::Arc;

/// Push-based view over the note store.
///
/// The first `next()` yields the current snapshot; each later call waits
/// for the store to change and yields a fresh full snapshot. Every feed owns
/// its receiver, so a slow consumer only ever skips to the newest state and
/// never holds back other feeds.
///
/// Rows with malformed content are left out of snapshots and logged.
pub struct NoteFeed {
    queries: Arc<dyn NoteQueries>,
    filter: Option<String>,
    changes: ChangeReceiver,
    primed: bool,
}

impl NoteFeed {
    pub(crate) fn new(queries: Arc<dyn NoteQueries>, filter: Option<String>) -> Self {
        let changes = queries.subscribe();
        Self {
            queries,
            filter,
            changes,
            primed: false,
        }
    }

    /// Active search filter, `None` for the all-notes feed.
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Waits for the next snapshot.
    ///
    /// The feed holds its store, so the built-in stores keep their change
    /// sender alive for as long as the feed exists and their feeds never
    /// end. `None` is returned only when a store hands out a receiver whose
    /// sender it does not keep.
    pub async fn next(&mut self) -> Option<RepoResult<Vec<Note>>> {
        if self.primed {
            if self.changes.changed().await.is_err() {
                return None;
            }
        } else {
            self.primed = true;
        }
        // Mark seen before querying so a write racing the query re-triggers.
        self.changes.borrow_and_update();
        Some(self.snapshot().await)
    }

    /// Queries the current snapshot without waiting.
    pub async fn snapshot(&self) -> RepoResult<Vec<Note>> {
        let filter = self.filter.clone();
        let rows = run_blocking(&self.queries, move |queries| match filter {
            Some(text) => queries.search(&text),
            None => queries.fetch_all(),
        })
        .await?;
        Ok(decode_rows(rows))
    }
}

fn decode_rows(rows: Vec<NoteRow>) -> Vec<Note> {
    rows.into_iter()
        .filter_map(|row| {
            let note_id = row.id;
            match row_to_note(row) {
                Ok(note) => Some(note),
                Err(err) => {
                    warn!(
                        "event=note_feed module=repo status=skipped note_id={} error_code=malformed_content error={}",
                        note_id, err
                    );
                    None
                }
            }
        })
        .collect()
}
