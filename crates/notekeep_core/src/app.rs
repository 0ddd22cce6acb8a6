//! Composition root.
//!
//! # Responsibility
//! - Build the store, image manager, repository, and service from config.
//! - Hand the host one explicitly owned value instead of a global instance.

use crate::config::NotesConfig;
use crate::db::DbError;
use crate::image::{FsImageFileManager, ImageError};
use crate::repo::LocalNotesRepository;
use crate::service::note_service::NoteService;
use crate::store::sqlite::SqliteNoteStore;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Repository type produced by [`open_notes`].
pub type DefaultNotesRepository = LocalNotesRepository<SqliteNoteStore, FsImageFileManager>;

/// Bootstrap failure.
#[derive(Debug)]
pub enum AppError {
    InvalidConfig(String),
    Db(DbError),
    Image(ImageError),
    /// Blocking open task panicked or was cancelled.
    Task(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfig(message) => write!(f, "invalid config: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Image(err) => write!(f, "{err}"),
            Self::Task(message) => write!(f, "open task failed: {message}"),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Image(err) => Some(err),
            Self::InvalidConfig(_) | Self::Task(_) => None,
        }
    }
}

impl From<DbError> for AppError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<ImageError> for AppError {
    fn from(value: ImageError) -> Self {
        Self::Image(value)
    }
}

/// Fully wired note store owned by the host.
pub struct NotesApp {
    config: NotesConfig,
    service: NoteService<DefaultNotesRepository>,
}

impl NotesApp {
    pub fn config(&self) -> &NotesConfig {
        &self.config
    }

    pub fn service(&self) -> &NoteService<DefaultNotesRepository> {
        &self.service
    }
}

/// Opens (creating if needed) the note store described by `config`.
pub async fn open_notes(config: NotesConfig) -> Result<NotesApp, AppError> {
    config.validate().map_err(AppError::InvalidConfig)?;

    let images = FsImageFileManager::new(config.images_dir());
    images.ensure_root().await?;

    let db_path = config.db_path();
    let store = tokio::task::spawn_blocking(move || SqliteNoteStore::open(db_path))
        .await
        .map_err(|err| AppError::Task(err.to_string()))??;

    info!(
        "event=app_open module=app status=ok version={}",
        env!("CARGO_PKG_VERSION")
    );

    Ok(NotesApp {
        config,
        service: NoteService::new(LocalNotesRepository::new(store, images)),
    })
}
