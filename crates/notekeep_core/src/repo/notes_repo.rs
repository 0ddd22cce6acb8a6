//! Default note repository over a query surface and an image store.

use super::{row_to_note, run_blocking, NoteFeed, NotesRepository, RepoError, RepoResult};
use crate::codec::encode;
use crate::image::ImageFileManager;
use crate::model::note::{image_paths, BlockKind, ContentBlock, Note, NoteId, UNSAVED_NOTE_ID};
use crate::store::{NoteQueries, NoteRow};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Content after image materialization, plus the files copied for it.
struct Materialized {
    content: Vec<ContentBlock>,
    copied: Vec<String>,
}

/// Repository wiring `NoteQueries` and `ImageFileManager` together.
///
/// Constructed once at the composition root and shared by reference.
///
/// `file_gate` orders image files against rows: saves hold it shared from
/// the first copy until the row is written, releases and sweeps hold it
/// exclusively. A reference count of zero is therefore only ever observed
/// when no save has an unwritten reference in flight.
pub struct LocalNotesRepository<Q, I> {
    queries: Arc<Q>,
    images: I,
    file_gate: RwLock<()>,
}

impl<Q, I> LocalNotesRepository<Q, I>
where
    Q: NoteQueries,
    I: ImageFileManager,
{
    pub fn new(queries: Q, images: I) -> Self {
        Self {
            queries: Arc::new(queries),
            images,
            file_gate: RwLock::new(()),
        }
    }

    async fn fetch_row(&self, id: NoteId) -> RepoResult<NoteRow> {
        run_blocking(&self.queries, move |queries| queries.fetch_by_id(id))
            .await?
            .ok_or(RepoError::NotFound(id))
    }

    async fn persist(&self, row: NoteRow, copied: &[String]) -> RepoResult<NoteId> {
        let result = run_blocking(&self.queries, move |queries| queries.upsert(&row)).await;
        if result.is_err() {
            self.discard_copies(copied).await;
        }
        result
    }

    /// Copies every external image into owned storage and rewrites its path.
    ///
    /// On failure, copies made so far are removed before returning.
    async fn materialize(&self, content: Vec<ContentBlock>) -> RepoResult<Materialized> {
        let mut copied = Vec::new();
        let mut materialized = Vec::with_capacity(content.len());

        for block in content {
            match block {
                ContentBlock::Text { .. } => materialized.push(block),
                ContentBlock::Image { path } if self.images.is_internal(&path) => {
                    materialized.push(ContentBlock::Image { path });
                }
                ContentBlock::Image { path } => {
                    match self.images.copy_to_internal_storage(&path).await {
                        Ok(internal) => {
                            copied.push(internal.clone());
                            materialized.push(ContentBlock::Image { path: internal });
                        }
                        Err(err) => {
                            error!(
                                "event=image_materialize module=repo status=error copied={} error={}",
                                copied.len(),
                                err
                            );
                            self.discard_copies(&copied).await;
                            return Err(err.into());
                        }
                    }
                }
            }
        }

        Ok(Materialized {
            content: materialized,
            copied,
        })
    }

    async fn discard_copies(&self, copied: &[String]) {
        for path in copied {
            if let Err(err) = self.images.delete_image(path).await {
                warn!(
                    "event=image_discard module=repo status=error path={} error={}",
                    path, err
                );
            }
        }
    }

    /// Deletes owned files that no persisted note references any more.
    ///
    /// Never fails; problems are logged and the file is left for a sweep.
    async fn release_images(&self, candidates: Vec<String>) -> usize {
        if candidates.is_empty() {
            return 0;
        }
        let _exclusive = self.file_gate.write().await;
        let mut deleted = 0;
        for path in candidates {
            if !self.images.is_internal(&path) {
                continue;
            }

            let lookup = path.clone();
            let references = match run_blocking(&self.queries, move |queries| {
                queries.count_image_references(&lookup)
            })
            .await
            {
                Ok(count) => count,
                Err(err) => {
                    warn!(
                        "event=image_release module=repo status=error path={} error={}",
                        path, err
                    );
                    continue;
                }
            };
            if references > 0 {
                debug!("event=image_release module=repo status=skipped reason=still_referenced");
                continue;
            }

            match self.images.delete_image(&path).await {
                Ok(()) => deleted += 1,
                Err(err) => warn!(
                    "event=image_release module=repo status=error path={} error={}",
                    path, err
                ),
            }
        }
        deleted
    }
}

#[async_trait]
impl<Q, I> NotesRepository for LocalNotesRepository<Q, I>
where
    Q: NoteQueries,
    I: ImageFileManager,
{
    async fn add_note(
        &self,
        title: String,
        content: Vec<ContentBlock>,
        is_pinned: bool,
        updated_at: i64,
    ) -> RepoResult<NoteId> {
        let started_at = Instant::now();
        let _saving = self.file_gate.read().await;
        let materialized = self.materialize(content).await?;
        let row = NoteRow {
            id: UNSAVED_NOTE_ID,
            title,
            updated_at,
            is_pinned,
            content: encode(&materialized.content),
        };

        match self.persist(row, &materialized.copied).await {
            Ok(id) => {
                info!(
                    "event=note_add module=repo status=ok note_id={} blocks={} images_copied={} duration_ms={}",
                    id,
                    materialized.content.len(),
                    materialized.copied.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(id)
            }
            Err(err) => {
                error!(
                    "event=note_add module=repo status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    async fn edit_note(&self, note: Note) -> RepoResult<()> {
        let started_at = Instant::now();
        let previous = self.fetch_row(note.id).await?;

        let saving = self.file_gate.read().await;
        let materialized = self.materialize(note.content).await?;
        let row = NoteRow {
            id: note.id,
            title: note.title,
            updated_at: note.updated_at,
            is_pinned: note.is_pinned,
            content: encode(&materialized.content),
        };
        if let Err(err) = self.persist(row, &materialized.copied).await {
            error!(
                "event=note_edit module=repo status=error note_id={} duration_ms={} error={}",
                note.id,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err);
        }
        // Release takes the gate exclusively.
        drop(saving);

        let kept: HashSet<&str> = image_paths(&materialized.content).into_iter().collect();
        let mut seen = HashSet::new();
        let removed: Vec<String> = previous
            .content
            .into_iter()
            .filter(|item| item.content_type == BlockKind::Image.as_db_str())
            .map(|item| item.content)
            .filter(|path| !kept.contains(path.as_str()) && seen.insert(path.clone()))
            .collect();
        let released = self.release_images(removed).await;

        info!(
            "event=note_edit module=repo status=ok note_id={} blocks={} images_copied={} images_released={} duration_ms={}",
            note.id,
            materialized.content.len(),
            materialized.copied.len(),
            released,
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    async fn delete_note(&self, id: NoteId) -> RepoResult<()> {
        let started_at = Instant::now();
        let previous = self.fetch_row(id).await?;

        if !run_blocking(&self.queries, move |queries| queries.delete_by_id(id)).await? {
            return Err(RepoError::NotFound(id));
        }

        let mut seen = HashSet::new();
        let owned: Vec<String> = previous
            .content
            .into_iter()
            .filter(|item| item.content_type == BlockKind::Image.as_db_str())
            .map(|item| item.content)
            .filter(|path| seen.insert(path.clone()))
            .collect();
        let released = self.release_images(owned).await;

        info!(
            "event=note_delete module=repo status=ok note_id={} images_released={} duration_ms={}",
            id,
            released,
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    async fn get_note(&self, id: NoteId) -> RepoResult<Note> {
        row_to_note(self.fetch_row(id).await?)
    }

    fn get_all_notes(&self) -> NoteFeed {
        NoteFeed::new(self.queries.clone(), None)
    }

    fn search_notes(&self, query: &str) -> NoteFeed {
        let trimmed = query.trim();
        let filter = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        NoteFeed::new(self.queries.clone(), filter)
    }

    async fn switch_pin_status(&self, id: NoteId) -> RepoResult<()> {
        if !run_blocking(&self.queries, move |queries| queries.toggle_pinned(id)).await? {
            return Err(RepoError::NotFound(id));
        }
        info!("event=note_pin_toggle module=repo status=ok note_id={id}");
        Ok(())
    }

    async fn sweep_orphaned_images(&self) -> RepoResult<usize> {
        let started_at = Instant::now();
        let owned = self.images.list_internal_images().await?;
        let scanned = owned.len();
        let deleted = self.release_images(owned).await;
        info!(
            "event=image_sweep module=repo status=ok scanned={} deleted={} duration_ms={}",
            scanned,
            deleted,
            started_at.elapsed().as_millis()
        );
        Ok(deleted)
    }
}
