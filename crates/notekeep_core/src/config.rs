//! Host-supplied configuration for the note store.
//!
//! # Responsibility
//! - Name where the database, owned images, and logs live.
//! - Provide defaults so hosts only need to pick a data directory.
//!
//! # Invariants
//! - `data_dir` must be absolute; relative paths would follow the process
//!   working directory.
//! - File and directory names are single path segments.

use crate::logging::default_log_level;
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};

const DEFAULT_DB_FILE_NAME: &str = "notes.sqlite3";
const DEFAULT_IMAGES_DIR_NAME: &str = "images";
const DEFAULT_LOGS_DIR_NAME: &str = "logs";

/// Note store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotesConfig {
    /// Root directory for all persisted state.
    pub data_dir: PathBuf,
    #[serde(default = "default_db_file_name")]
    pub db_file_name: String,
    #[serde(default = "default_images_dir_name")]
    pub images_dir_name: String,
    #[serde(default = "default_logs_dir_name")]
    pub logs_dir_name: String,
    /// `trace|debug|info|warn|error`.
    #[serde(default = "default_level_string")]
    pub log_level: String,
}

impl NotesConfig {
    /// Builds a config with defaults under `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            db_file_name: default_db_file_name(),
            images_dir_name: default_images_dir_name(),
            logs_dir_name: default_logs_dir_name(),
            log_level: default_level_string(),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file_name)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join(&self.images_dir_name)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join(&self.logs_dir_name)
    }

    /// Checks path shape; does not touch the filesystem.
    pub fn validate(&self) -> Result<(), String> {
        if !self.data_dir.is_absolute() {
            return Err(format!(
                "data_dir must be an absolute path, got `{}`",
                self.data_dir.display()
            ));
        }
        for (field, value) in [
            ("db_file_name", &self.db_file_name),
            ("images_dir_name", &self.images_dir_name),
            ("logs_dir_name", &self.logs_dir_name),
        ] {
            if !is_single_segment(value) {
                return Err(format!(
                    "{field} must be a single path segment, got `{value}`"
                ));
            }
        }
        if self.db_file_name == self.images_dir_name {
            return Err("db_file_name and images_dir_name must differ".to_string());
        }
        Ok(())
    }
}

fn is_single_segment(value: &str) -> bool {
    let mut components = Path::new(value).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn default_db_file_name() -> String {
    DEFAULT_DB_FILE_NAME.to_string()
}

fn default_images_dir_name() -> String {
    DEFAULT_IMAGES_DIR_NAME.to_string()
}

fn default_logs_dir_name() -> String {
    DEFAULT_LOGS_DIR_NAME.to_string()
}

fn default_level_string() -> String {
    default_log_level().to_string()
}

#[cfg(test)]
mod tests {
    use super::NotesConfig;
    use std::path::PathBuf;

    #[test]
    fn defaults_resolve_under_data_dir() {
        let config = NotesConfig::new("/var/lib/notekeep");
        assert_eq!(config.db_path(), PathBuf::from("/var/lib/notekeep/notes.sqlite3"));
        assert_eq!(config.images_dir(), PathBuf::from("/var/lib/notekeep/images"));
        assert_eq!(config.log_dir(), PathBuf::from("/var/lib/notekeep/logs"));
        config.validate().expect("defaults should validate");
    }

    #[test]
    fn deserialize_fills_missing_fields_with_defaults() {
        let config: NotesConfig =
            serde_json::from_str(r#"{"data_dir":"/data","images_dir_name":"pics"}"#).unwrap();
        assert_eq!(config.images_dir(), PathBuf::from("/data/pics"));
        assert_eq!(config.db_file_name, "notes.sqlite3");
    }

    #[test]
    fn validate_rejects_relative_root_and_nested_names() {
        let relative = NotesConfig::new("data");
        assert!(relative.validate().unwrap_err().contains("absolute"));

        let mut nested = NotesConfig::new("/data");
        nested.images_dir_name = "../escape".to_string();
        assert!(nested.validate().unwrap_err().contains("images_dir_name"));
    }
}
