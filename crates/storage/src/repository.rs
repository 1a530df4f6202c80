use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tutor_core::model::{AppSettings, SkillProgress};

/// Per-skill progress keyed by document name.
pub type ProgressMap = BTreeMap<String, SkillProgress>;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("i/o error: {0}")]
    Io(String),

    #[error("lock poisoned: {0}")]
    Lock(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for the credentials and settings sections.
#[async_trait]
pub trait AppSettingsRepository: Send + Sync {
    /// Fetch persisted settings, or `None` if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    async fn get_settings(&self) -> Result<Option<AppSettings>, StorageError>;

    /// Persist settings, replacing any previous values.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the settings cannot be stored.
    async fn save_settings(&self, settings: &AppSettings) -> Result<(), StorageError>;
}

/// Repository contract for per-skill progress.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Load every stored skill. Unreadable entries are skipped by adapters.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    async fn load_progress(&self) -> Result<ProgressMap, StorageError>;

    /// Replace the stored progress with `progress`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the progress cannot be stored.
    async fn save_progress(&self, progress: &ProgressMap) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    settings: Arc<Mutex<Option<AppSettings>>>,
    progress: Arc<Mutex<ProgressMap>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing progress.
    #[must_use]
    pub fn with_progress(progress: ProgressMap) -> Self {
        Self {
            settings: Arc::new(Mutex::new(None)),
            progress: Arc::new(Mutex::new(progress)),
        }
    }
}

#[async_trait]
impl AppSettingsRepository for InMemoryRepository {
    async fn get_settings(&self) -> Result<Option<AppSettings>, StorageError> {
        let guard = self
            .settings
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn save_settings(&self, settings: &AppSettings) -> Result<(), StorageError> {
        let mut guard = self
            .settings
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        *guard = Some(settings.clone());
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_progress(&self) -> Result<ProgressMap, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn save_progress(&self, progress: &ProgressMap) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        guard.clone_from(progress);
        Ok(())
    }
}

/// Aggregates the settings and progress repositories behind trait objects for
/// easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub app_settings: Arc<dyn AppSettingsRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    pub(crate) fn from_repository<R>(repo: R) -> Self
    where
        R: AppSettingsRepository + ProgressRepository + Clone + 'static,
    {
        let app_settings: Arc<dyn AppSettingsRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self {
            app_settings,
            progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_core::model::AppSettingsDraft;

    #[tokio::test]
    async fn in_memory_round_trips_settings_and_progress() {
        let repo = InMemoryRepository::new();
        assert!(repo.get_settings().await.unwrap().is_none());

        let settings = AppSettingsDraft {
            api_key: Some("secret".into()),
            ..AppSettingsDraft::new()
        }
        .validate()
        .unwrap();
        repo.save_settings(&settings).await.unwrap();
        assert_eq!(repo.get_settings().await.unwrap(), Some(settings));

        let mut progress = ProgressMap::new();
        progress.insert(
            "notes.pdf".into(),
            SkillProgress::from_persisted(30, 2, 1, 4, 0),
        );
        repo.save_progress(&progress).await.unwrap();
        assert_eq!(repo.load_progress().await.unwrap(), progress);
    }

    #[tokio::test]
    async fn storage_handles_share_one_backend() {
        let storage = Storage::in_memory();
        let mut progress = ProgressMap::new();
        progress.insert("a.pdf".into(), SkillProgress::new());
        storage.progress.save_progress(&progress).await.unwrap();
        assert_eq!(storage.progress.load_progress().await.unwrap().len(), 1);
        assert!(storage.app_settings.get_settings().await.unwrap().is_none());
    }
}
