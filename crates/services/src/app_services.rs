use std::path::{Path, PathBuf};
use std::sync::Arc;

use storage::repository::Storage;

use crate::ai::{ClientFactory, gemini_factory};
use crate::app_settings_service::{AppSettingsService, EnvOverrides};
use crate::error::AppServicesError;
use crate::tasks::{EventReceiver, UploadPolicy};
use crate::tutor::TutorCoordinator;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    config_path: Option<PathBuf>,
    app_settings: Arc<AppSettingsService>,
    client_factory: ClientFactory,
    upload_policy: UploadPolicy,
}

impl AppServices {
    /// Services backed by an INI config file, talking to Gemini.
    #[must_use]
    pub fn new_ini(path: impl Into<PathBuf>, overrides: EnvOverrides) -> Self {
        let path = path.into();
        let mut services = Self::new(Storage::ini_file(&path), overrides);
        services.config_path = Some(path);
        services
    }

    #[must_use]
    pub fn new(storage: Storage, overrides: EnvOverrides) -> Self {
        let app_settings = Arc::new(
            AppSettingsService::new(Arc::clone(&storage.app_settings)).with_overrides(overrides),
        );
        Self {
            storage,
            config_path: None,
            app_settings,
            client_factory: gemini_factory(),
            upload_policy: UploadPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_client_factory(mut self, factory: ClientFactory) -> Self {
        self.client_factory = factory;
        self
    }

    #[must_use]
    pub fn with_upload_policy(mut self, policy: UploadPolicy) -> Self {
        self.upload_policy = policy;
        self
    }

    #[must_use]
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    #[must_use]
    pub fn app_settings(&self) -> Arc<AppSettingsService> {
        Arc::clone(&self.app_settings)
    }

    /// Load settings and progress and build the coordinator with its event
    /// receiver.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if stored state cannot be read or the
    /// environment overrides are invalid.
    pub async fn coordinator(&self) -> Result<(TutorCoordinator, EventReceiver), AppServicesError> {
        let settings = self.app_settings.load().await?;
        let progress = self.storage.progress.load_progress().await?;
        tracing::info!(skills = progress.len(), model = %settings.model(), "loaded saved state");

        let (coordinator, events) = TutorCoordinator::new(
            Arc::clone(&self.app_settings),
            Arc::clone(&self.storage.progress),
            Arc::clone(&self.client_factory),
            settings,
            progress,
        )?;
        Ok((coordinator.with_upload_policy(self.upload_policy), events))
    }
}
