//! Generative API seam: remote file handles, generation requests and the
//! client trait the background tasks talk to.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tutor_core::model::AppSettings;

use crate::error::AiError;

pub mod gemini;

pub use gemini::{DEFAULT_BASE_URL, GeminiClient, GeminiConfig};

/// Processing state of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    #[default]
    StateUnspecified,
    Processing,
    Active,
    Failed,
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileState::StateUnspecified => "STATE_UNSPECIFIED",
            FileState::Processing => "PROCESSING",
            FileState::Active => "ACTIVE",
            FileState::Failed => "FAILED",
        })
    }
}

/// Handle to a file held by the remote file API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Resource name, e.g. `files/abc-123`.
    pub name: String,
    pub display_name: String,
    pub uri: String,
    pub mime_type: String,
    pub state: FileState,
    pub expires_at: Option<DateTime<Utc>>,
}

/// One `generateContent` call.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub system_instruction: String,
    pub prompt: String,
    /// Attached after the prompt text, in order.
    pub files: Vec<RemoteFile>,
}

#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Upload a local file under `display_name`.
    ///
    /// # Errors
    ///
    /// Returns `AiError` if the file cannot be read or the API rejects it.
    async fn upload_file(&self, path: &Path, display_name: &str) -> Result<RemoteFile, AiError>;

    /// Refresh a file's metadata, including its processing state.
    ///
    /// # Errors
    ///
    /// Returns `AiError` on transport or API failure.
    async fn get_file(&self, name: &str) -> Result<RemoteFile, AiError>;

    /// Delete a remote file.
    ///
    /// # Errors
    ///
    /// Returns `AiError` on transport or API failure.
    async fn delete_file(&self, name: &str) -> Result<(), AiError>;

    /// Generate text for a prompt plus attached files.
    ///
    /// # Errors
    ///
    /// Returns `AiError` for transport failures, blocked or empty responses.
    async fn generate(&self, request: &GenerateRequest) -> Result<String, AiError>;
}

/// Builds a client for the current settings. Swapped out in tests.
pub type ClientFactory =
    Arc<dyn Fn(&AppSettings, &str) -> Result<Arc<dyn GenerativeClient>, AiError> + Send + Sync>;

/// Factory producing `GeminiClient`s.
#[must_use]
pub fn gemini_factory() -> ClientFactory {
    Arc::new(|settings: &AppSettings, api_key: &str| {
        let config = GeminiConfig::new(api_key, settings.api_base_url())?;
        let client: Arc<dyn GenerativeClient> = Arc::new(GeminiClient::new(config));
        Ok(client)
    })
}
