use super::{ImageError, ImageFileManager, ImageResult};
use async_trait::async_trait;
use log::{debug, warn};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

const FILE_URI_PREFIX: &str = "file://";
const IMAGE_FILE_PREFIX: &str = "IMG_";
const FALLBACK_EXTENSION: &str = "jpg";
const MAX_EXTENSION_CHARS: usize = 5;

/// Filesystem image store rooted at one private directory.
///
/// Copies are named `IMG_<uuid>.<ext>`, keeping the source extension when it
/// looks like one.
#[derive(Debug, Clone)]
pub struct FsImageFileManager {
    root: PathBuf,
}

impl FsImageFileManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the storage directory if missing.
    pub async fn ensure_root(&self) -> ImageResult<()> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| ImageError::Io {
                path: self.root.clone(),
                source,
            })
    }

    fn owned_file_name(source: &Path) -> String {
        let extension = source
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .filter(|ext| {
                !ext.is_empty()
                    && ext.len() <= MAX_EXTENSION_CHARS
                    && ext.chars().all(|ch| ch.is_ascii_alphanumeric())
            })
            .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());
        format!("{IMAGE_FILE_PREFIX}{}.{extension}", Uuid::new_v4())
    }
}

#[async_trait]
impl ImageFileManager for FsImageFileManager {
    fn is_internal(&self, path: &str) -> bool {
        let candidate = Path::new(path);
        candidate != self.root.as_path()
            && candidate.starts_with(&self.root)
            && !candidate
                .components()
                .any(|component| matches!(component, Component::ParentDir))
    }

    async fn copy_to_internal_storage(&self, uri: &str) -> ImageResult<String> {
        let source = source_path(uri)?;
        let mut reader = fs::File::open(&source)
            .await
            .map_err(|source_err| ImageError::Io {
                path: source.clone(),
                source: source_err,
            })?;
        self.ensure_root().await?;

        let destination = self.root.join(Self::owned_file_name(&source));
        let destination_text = destination
            .to_str()
            .ok_or_else(|| ImageError::NonUtf8Path(destination.clone()))?
            .to_string();

        let mut writer = fs::File::create(&destination)
            .await
            .map_err(|source_err| ImageError::Io {
                path: destination.clone(),
                source: source_err,
            })?;
        let bytes = match tokio::io::copy(&mut reader, &mut writer).await {
            Ok(bytes) => bytes,
            Err(copy_err) => {
                drop(writer);
                discard_partial(&destination).await;
                return Err(ImageError::Io {
                    path: source,
                    source: copy_err,
                });
            }
        };
        debug!("event=image_copy module=image status=ok bytes={bytes}");
        Ok(destination_text)
    }

    async fn delete_image(&self, path: &str) -> ImageResult<()> {
        if !self.is_internal(path) {
            return Err(ImageError::NotInternal(path.to_string()));
        }
        fs::remove_file(path)
            .await
            .map_err(|source| ImageError::Io {
                path: PathBuf::from(path),
                source,
            })?;
        debug!("event=image_delete module=image status=ok");
        Ok(())
    }

    async fn list_internal_images(&self) -> ImageResult<Vec<String>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(ImageError::Io {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        let mut paths = Vec::new();
        loop {
            let entry = entries.next_entry().await.map_err(|source| ImageError::Io {
                path: self.root.clone(),
                source,
            })?;
            let Some(entry) = entry else {
                break;
            };
            let file_type = entry.file_type().await.map_err(|source| ImageError::Io {
                path: entry.path(),
                source,
            })?;
            if !file_type.is_file() {
                continue;
            }
            match entry.path().into_os_string().into_string() {
                Ok(path) => paths.push(path),
                Err(raw) => return Err(ImageError::NonUtf8Path(PathBuf::from(raw))),
            }
        }
        paths.sort();
        Ok(paths)
    }
}

/// Removes a half-written copy; a leftover is logged and left for a sweep.
async fn discard_partial(destination: &Path) {
    match fs::remove_file(destination).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(
            "event=image_copy module=image status=error path={} error_code=partial_copy_left error={}",
            destination.display(),
            err
        ),
    }
}

/// Resolves a plain path or `file://` URI to a local path.
fn source_path(uri: &str) -> ImageResult<PathBuf> {
    let trimmed = uri.trim();
    if trimmed.is_empty() {
        return Err(ImageError::InvalidUri(uri.to_string()));
    }
    if let Some(rest) = trimmed.strip_prefix(FILE_URI_PREFIX) {
        // file://localhost/x and file:///x both name /x.
        let rest = rest.strip_prefix("localhost").unwrap_or(rest);
        if !rest.starts_with('/') {
            return Err(ImageError::InvalidUri(uri.to_string()));
        }
        return Ok(PathBuf::from(rest));
    }
    if trimmed.contains("://") {
        return Err(ImageError::InvalidUri(uri.to_string()));
    }
    Ok(PathBuf::from(trimmed))
}
