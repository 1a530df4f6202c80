use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tutor_core::model::AppSettings;

use crate::repository::{
    AppSettingsRepository, ProgressMap, ProgressRepository, Storage, StorageError,
};

mod document;
mod mapping;

use document::IniDocument;

/// Default file name used when no config path is given.
pub const DEFAULT_CONFIG_FILE: &str = "ai_tutor_config.ini";

/// Settings and progress stored together in one INI file.
///
/// Each save re-reads the file, replaces only its own sections and rewrites
/// the file through a temporary sibling, so settings and progress writes never
/// clobber each other.
#[derive(Clone)]
pub struct IniFileRepository {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl IniFileRepository {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<IniDocument, StorageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(IniDocument::parse(&text)),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "config file not found, using defaults");
                Ok(IniDocument::default())
            }
            Err(err) => Err(io_error(&self.path, &err)),
        }
    }

    async fn update<F>(&self, apply: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut IniDocument) + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read_document().await?;
        apply(&mut doc);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, &e))?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, doc.render())
            .await
            .map_err(|e| io_error(&tmp, &e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io_error(&self.path, &e))?;
        tracing::debug!(path = %self.path.display(), "config file saved");
        Ok(())
    }
}

fn io_error(path: &Path, err: &std::io::Error) -> StorageError {
    StorageError::Io(format!("{}: {err}", path.display()))
}

#[async_trait]
impl AppSettingsRepository for IniFileRepository {
    async fn get_settings(&self) -> Result<Option<AppSettings>, StorageError> {
        let doc = self.read_document().await?;
        mapping::decode_settings(&doc)
    }

    async fn save_settings(&self, settings: &AppSettings) -> Result<(), StorageError> {
        self.update(|doc| mapping::encode_settings(doc, settings))
            .await
    }
}

#[async_trait]
impl ProgressRepository for IniFileRepository {
    async fn load_progress(&self) -> Result<ProgressMap, StorageError> {
        let doc = self.read_document().await?;
        Ok(mapping::decode_progress_section(&doc))
    }

    async fn save_progress(&self, progress: &ProgressMap) -> Result<(), StorageError> {
        self.update(|doc| mapping::encode_progress_section(doc, progress))
            .await
    }
}

impl Storage {
    /// Build a `Storage` backed by a single INI config file.
    #[must_use]
    pub fn ini_file(path: impl Into<PathBuf>) -> Self {
        Self::from_repository(IniFileRepository::new(path))
    }
}
