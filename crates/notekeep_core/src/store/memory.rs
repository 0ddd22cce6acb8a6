//! In-memory note store.
//!
//! Same contract as the SQLite store, with nothing on disk. Search mirrors
//! SQLite `LIKE`: ASCII case-insensitive substring over title and text rows.

use super::{ChangeBus, ChangeReceiver, NoteQueries, NoteRow};
use crate::db::DbResult;
use crate::model::note::{BlockKind, NoteId, UNSAVED_NOTE_ID};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MemoryState {
    last_id: NoteId,
    notes: BTreeMap<NoteId, NoteRow>,
}

/// Cloneable in-memory note store.
#[derive(Debug, Clone, Default)]
pub struct MemoryNoteStore {
    state: Arc<Mutex<MemoryState>>,
    changes: Arc<ChangeBus>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sorted(mut rows: Vec<NoteRow>) -> Vec<NoteRow> {
        rows.sort_by_key(|row| (Reverse(row.updated_at), Reverse(row.id)));
        rows
    }
}

impl NoteQueries for MemoryNoteStore {
    fn upsert(&self, row: &NoteRow) -> DbResult<NoteId> {
        let id = {
            let mut state = self.state();
            let id = if row.id == UNSAVED_NOTE_ID {
                state.last_id + 1
            } else {
                row.id
            };
            state.last_id = state.last_id.max(id);
            state.notes.insert(
                id,
                NoteRow {
                    id,
                    ..row.clone()
                },
            );
            id
        };
        self.changes.notify();
        Ok(id)
    }

    fn fetch_by_id(&self, id: NoteId) -> DbResult<Option<NoteRow>> {
        Ok(self.state().notes.get(&id).cloned())
    }

    fn fetch_all(&self) -> DbResult<Vec<NoteRow>> {
        Ok(Self::sorted(self.state().notes.values().cloned().collect()))
    }

    fn search(&self, text: &str) -> DbResult<Vec<NoteRow>> {
        let needle = text.to_ascii_lowercase();
        let matches = self
            .state()
            .notes
            .values()
            .filter(|row| {
                row.title.to_ascii_lowercase().contains(&needle)
                    || row.content.iter().any(|item| {
                        item.content_type == BlockKind::Text.as_db_str()
                            && item.content.to_ascii_lowercase().contains(&needle)
                    })
            })
            .cloned()
            .collect();
        Ok(Self::sorted(matches))
    }

    fn delete_by_id(&self, id: NoteId) -> DbResult<bool> {
        let deleted = self.state().notes.remove(&id).is_some();
        if deleted {
            self.changes.notify();
        }
        Ok(deleted)
    }

    fn toggle_pinned(&self, id: NoteId) -> DbResult<bool> {
        let toggled = match self.state().notes.get_mut(&id) {
            Some(row) => {
                row.is_pinned = !row.is_pinned;
                true
            }
            None => false,
        };
        if toggled {
            self.changes.notify();
        }
        Ok(toggled)
    }

    fn count_image_references(&self, path: &str) -> DbResult<u64> {
        let count = self
            .state()
            .notes
            .values()
            .flat_map(|row| row.content.iter())
            .filter(|item| item.content_type == BlockKind::Image.as_db_str() && item.content == path)
            .count();
        Ok(count as u64)
    }

    fn subscribe(&self) -> ChangeReceiver {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryNoteStore;
    use crate::codec::encode;
    use crate::model::note::ContentBlock;
    use crate::store::{NoteQueries, NoteRow};

    fn row(id: i64, title: &str, updated_at: i64, content: &[ContentBlock]) -> NoteRow {
        NoteRow {
            id,
            title: title.to_string(),
            updated_at,
            is_pinned: false,
            content: encode(content),
        }
    }

    #[test]
    fn upsert_assigns_ids_past_explicit_ones() {
        let store = MemoryNoteStore::new();
        let explicit = store.upsert(&row(7, "seven", 1, &[])).unwrap();
        let fresh = store.upsert(&row(0, "fresh", 2, &[])).unwrap();
        assert_eq!(explicit, 7);
        assert_eq!(fresh, 8);
    }

    #[test]
    fn search_ignores_ascii_case_and_image_paths() {
        let store = MemoryNoteStore::new();
        store
            .upsert(&row(0, "Groceries", 1, &[ContentBlock::image("/gro.png")]))
            .unwrap();
        store
            .upsert(&row(0, "Trip plan", 2, &[ContentBlock::image("/gro.png")]))
            .unwrap();
        store
            .upsert(&row(0, "misc", 3, &[ContentBlock::text("grocery run")]))
            .unwrap();

        let titles: Vec<_> = store
            .search("GRO")
            .unwrap()
            .into_iter()
            .map(|row| row.title)
            .collect();
        assert_eq!(titles, vec!["misc".to_string(), "Groceries".to_string()]);
    }

    #[test]
    fn toggle_and_delete_report_missing_ids() {
        let store = MemoryNoteStore::new();
        assert!(!store.toggle_pinned(42).unwrap());
        assert!(!store.delete_by_id(42).unwrap());
    }
}
