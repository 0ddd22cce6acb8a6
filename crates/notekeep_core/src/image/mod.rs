//! App-owned image storage.
//!
//! # Responsibility
//! - Copy externally referenced images into a private directory.
//! - Answer whether a path is already owned, and delete owned files.
//!
//! # Invariants
//! - Ownership is decided lexically: a path is owned iff it lives under the
//!   storage root and contains no `..` component.
//! - Only owned paths are ever deleted.

use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

mod fs;

pub use fs::FsImageFileManager;

pub type ImageResult<T> = Result<T, ImageError>;

/// Image storage failure.
#[derive(Debug)]
pub enum ImageError {
    /// Filesystem operation failed for `path`.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Refused to touch a path outside the storage root.
    NotInternal(String),
    /// Source reference is not a local path or `file://` URI.
    InvalidUri(String),
    /// Storage path cannot be represented as UTF-8.
    NonUtf8Path(PathBuf),
}

impl Display for ImageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "image io failed at `{}`: {source}", path.display()),
            Self::NotInternal(path) => write!(f, "image path is not app-owned: `{path}`"),
            Self::InvalidUri(uri) => write!(f, "unsupported image uri: `{uri}`"),
            Self::NonUtf8Path(path) => {
                write!(f, "image path is not valid UTF-8: `{}`", path.display())
            }
        }
    }
}

impl Error for ImageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::NotInternal(_) | Self::InvalidUri(_) | Self::NonUtf8Path(_) => None,
        }
    }
}

/// File operations the repository needs to keep image references owned.
#[async_trait]
pub trait ImageFileManager: Send + Sync + 'static {
    /// Whether `path` already points into app-owned storage.
    fn is_internal(&self, path: &str) -> bool;

    /// Copies the referenced file into owned storage and returns the new path.
    async fn copy_to_internal_storage(&self, uri: &str) -> ImageResult<String>;

    /// Deletes one owned file.
    async fn delete_image(&self, path: &str) -> ImageResult<()>;

    /// Lists every owned file currently on disk.
    async fn list_internal_images(&self) -> ImageResult<Vec<String>>;
}
