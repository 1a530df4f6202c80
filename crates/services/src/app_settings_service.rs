use std::sync::Arc;

use storage::repository::AppSettingsRepository;
use tutor_core::model::{AppSettings, AppSettingsDraft};

use crate::error::AppSettingsServiceError;

pub const ENV_API_KEY: &str = "TUTOR_API_KEY";
pub const ENV_MODEL: &str = "TUTOR_MODEL";
pub const ENV_BASE_URL: &str = "TUTOR_BASE_URL";

/// Values from the environment that take precedence over the config file.
/// They are applied on top of persisted settings and never written back.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub api_base_url: Option<String>,
}

impl EnvOverrides {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build overrides from an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            api_key: read(ENV_API_KEY),
            model: read(ENV_MODEL),
            api_base_url: read(ENV_BASE_URL),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.api_key.is_none() && self.model.is_none() && self.api_base_url.is_none()
    }
}

#[derive(Clone)]
pub struct AppSettingsService {
    repo: Arc<dyn AppSettingsRepository>,
    overrides: EnvOverrides,
}

impl AppSettingsService {
    #[must_use]
    pub fn new(repo: Arc<dyn AppSettingsRepository>) -> Self {
        Self {
            repo,
            overrides: EnvOverrides::default(),
        }
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: EnvOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Load persisted settings (or defaults if missing).
    ///
    /// # Errors
    ///
    /// Returns `AppSettingsServiceError` on storage failures.
    pub async fn load(&self) -> Result<AppSettings, AppSettingsServiceError> {
        let settings = self.repo.get_settings().await?;
        Ok(settings.unwrap_or_default())
    }

    /// Validate and persist new settings.
    ///
    /// # Errors
    ///
    /// Returns `AppSettingsServiceError` if validation fails or persistence fails.
    pub async fn save(
        &self,
        draft: AppSettingsDraft,
    ) -> Result<AppSettings, AppSettingsServiceError> {
        let settings = draft.validate()?;
        self.repo.save_settings(&settings).await?;
        Ok(settings)
    }

    /// Settings with environment overrides applied.
    ///
    /// # Errors
    ///
    /// Returns `AppSettingsServiceError` if an override does not validate,
    /// e.g. a malformed base URL.
    pub fn effective(
        &self,
        persisted: &AppSettings,
    ) -> Result<AppSettings, AppSettingsServiceError> {
        if self.overrides.is_empty() {
            return Ok(persisted.clone());
        }
        let mut draft = AppSettingsDraft::from_settings(persisted);
        if let Some(key) = &self.overrides.api_key {
            draft.api_key = Some(key.clone());
        }
        if let Some(model) = &self.overrides.model {
            draft.model = Some(model.clone());
        }
        if let Some(url) = &self.overrides.api_base_url {
            draft.api_base_url = Some(url.clone());
        }
        Ok(draft.validate()?)
    }
}
