//! SQLite-backed note store.
//!
//! # Responsibility
//! - Map `NoteRow` onto the `notes` and `content_items` tables.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Upsert replaces the whole content row set inside one IMMEDIATE
//!   transaction, so a failed write leaves the previous version intact.
//! - Content rows are returned unsorted; ordering is the codec's job.

use super::{ChangeBus, ChangeReceiver, NoteQueries, NoteRow};
use crate::codec::ContentRow;
use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::model::note::{BlockKind, NoteId, UNSAVED_NOTE_ID};
use rusqlite::{params, Connection, Params, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

// One row per content item; notes without content come back once with NULL
// item columns.
const NOTE_SELECT_SQL: &str = "SELECT
    notes.id AS id,
    notes.title AS title,
    notes.updated_at AS updated_at,
    notes.is_pinned AS is_pinned,
    content_items.content_type AS content_type,
    content_items.content AS content,
    content_items.item_order AS item_order
FROM notes
LEFT JOIN content_items ON content_items.note_id = notes.id";

// `notes.id` breaks ties, so each note's joined rows stay adjacent.
const NOTE_ORDER_SQL: &str = "ORDER BY notes.updated_at DESC, notes.id DESC";

/// Cloneable handle over one shared SQLite connection.
#[derive(Clone)]
pub struct SqliteNoteStore {
    conn: Arc<Mutex<Connection>>,
    changes: Arc<ChangeBus>,
}

impl SqliteNoteStore {
    /// Wraps a connection that already went through `open_db*`.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            changes: Arc::new(ChangeBus::new()),
        }
    }

    /// Opens (and migrates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    /// Runs `f` with exclusive access to the connection.
    ///
    /// Writes made here bypass change notification.
    pub fn with_connection<T, F>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&mut Connection) -> DbResult<T>,
    {
        // A panic mid-statement leaves no open transaction behind (rusqlite
        // rolls back on drop), so a poisoned lock still guards a usable
        // connection.
        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut conn)
    }
}

impl NoteQueries for SqliteNoteStore {
    fn upsert(&self, row: &NoteRow) -> DbResult<NoteId> {
        let id = self.with_connection(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let id = if row.id == UNSAVED_NOTE_ID {
                tx.execute(
                    "INSERT INTO notes (title, updated_at, is_pinned) VALUES (?1, ?2, ?3);",
                    params![row.title.as_str(), row.updated_at, row.is_pinned],
                )?;
                tx.last_insert_rowid()
            } else {
                tx.execute(
                    "INSERT INTO notes (id, title, updated_at, is_pinned)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(id) DO UPDATE SET
                        title = excluded.title,
                        updated_at = excluded.updated_at,
                        is_pinned = excluded.is_pinned;",
                    params![row.id, row.title.as_str(), row.updated_at, row.is_pinned],
                )?;
                tx.execute("DELETE FROM content_items WHERE note_id = ?1;", [row.id])?;
                row.id
            };

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO content_items (note_id, content_type, content, item_order)
                     VALUES (?1, ?2, ?3, ?4);",
                )?;
                for item in &row.content {
                    stmt.execute(params![
                        id,
                        item.content_type.as_str(),
                        item.content.as_str(),
                        item.order,
                    ])?;
                }
            }

            tx.commit()?;
            Ok(id)
        })?;

        self.changes.notify();
        Ok(id)
    }

    fn fetch_by_id(&self, id: NoteId) -> DbResult<Option<NoteRow>> {
        self.with_connection(|conn| {
            let mut notes = query_notes(
                conn,
                &format!("{NOTE_SELECT_SQL} WHERE notes.id = ?1;"),
                [id],
            )?;
            Ok(notes.pop())
        })
    }

    fn fetch_all(&self) -> DbResult<Vec<NoteRow>> {
        self.with_connection(|conn| {
            query_notes(conn, &format!("{NOTE_SELECT_SQL} {NOTE_ORDER_SQL};"), [])
        })
    }

    fn search(&self, text: &str) -> DbResult<Vec<NoteRow>> {
        let pattern = format!("%{}%", escape_like(text));
        self.with_connection(|conn| {
            query_notes(
                conn,
                &format!(
                    "{NOTE_SELECT_SQL}
                     WHERE notes.title LIKE ?1 ESCAPE '\\'
                        OR EXISTS (
                            SELECT 1
                            FROM content_items ci
                            WHERE ci.note_id = notes.id
                              AND ci.content_type = ?2
                              AND ci.content LIKE ?1 ESCAPE '\\'
                        )
                     {NOTE_ORDER_SQL};"
                ),
                params![pattern, BlockKind::Text.as_db_str()],
            )
        })
    }

    fn delete_by_id(&self, id: NoteId) -> DbResult<bool> {
        let deleted = self.with_connection(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute("DELETE FROM content_items WHERE note_id = ?1;", [id])?;
            let changed = tx.execute("DELETE FROM notes WHERE id = ?1;", [id])?;
            tx.commit()?;
            Ok(changed > 0)
        })?;

        if deleted {
            self.changes.notify();
        }
        Ok(deleted)
    }

    fn toggle_pinned(&self, id: NoteId) -> DbResult<bool> {
        let toggled = self.with_connection(|conn| {
            let changed = conn.execute(
                "UPDATE notes SET is_pinned = 1 - is_pinned WHERE id = ?1;",
                [id],
            )?;
            Ok(changed > 0)
        })?;

        if toggled {
            self.changes.notify();
        }
        Ok(toggled)
    }

    fn count_image_references(&self, path: &str) -> DbResult<u64> {
        self.with_connection(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*)
                 FROM content_items
                 WHERE content_type = ?1
                   AND content = ?2;",
                params![BlockKind::Image.as_db_str(), path],
                |row| row.get(0),
            )?;
            Ok(count.max(0) as u64)
        })
    }

    fn subscribe(&self) -> ChangeReceiver {
        self.changes.subscribe()
    }
}

fn query_notes<P: Params>(conn: &Connection, sql: &str, params: P) -> DbResult<Vec<NoteRow>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut notes: Vec<NoteRow> = Vec::new();
    while let Some(row) = rows.next()? {
        let id: NoteId = row.get("id")?;
        if notes.last().map(|note| note.id) != Some(id) {
            notes.push(NoteRow {
                id,
                title: row.get("title")?,
                updated_at: row.get("updated_at")?,
                is_pinned: row.get("is_pinned")?,
                content: Vec::new(),
            });
        }

        let content_type: Option<String> = row.get("content_type")?;
        if let (Some(content_type), Some(note)) = (content_type, notes.last_mut()) {
            note.content.push(ContentRow {
                content_type,
                content: row.get("content")?,
                order: row.get("item_order")?,
            });
        }
    }
    Ok(notes)
}

/// Escapes `LIKE` wildcards so user text matches literally.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn escape_like_escapes_wildcards_and_backslash() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
