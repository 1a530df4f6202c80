//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use tutor_core::model::{AppSettingsError, DocumentError};

use crate::ai::FileState;

/// Errors emitted by the generative API client and the background tasks
/// that drive it.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AiError {
    #[error("permission denied: check the API key ({0})")]
    PermissionDenied(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("response blocked by safety filters ({0})")]
    Safety(String),
    #[error("generation stopped unexpectedly ({0})")]
    UnexpectedFinish(String),
    #[error("the model returned an empty response")]
    EmptyResponse,
    #[error("malformed API response: {0}")]
    Malformed(String),
    #[error("upload session did not return an upload URL")]
    MissingUploadUrl,
    #[error("file '{name}' did not become active (state: {state})")]
    FileNotActive { name: String, state: FileState },
    #[error("upload finished without any usable files")]
    NoFilesUploaded,
    #[error("cannot read '{path}': {message}")]
    Io { path: String, message: String },
    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `TutorCoordinator` when a command cannot be carried out.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TutorError {
    #[error("a background task is already running")]
    Busy,
    #[error("no API key configured")]
    MissingApiKey,
    #[error("no documents added")]
    NoDocuments,
    #[error("materials have not been uploaded yet")]
    UploadRequired,
    #[error("'{0}' has not been uploaded")]
    NotUploaded(String),
    #[error("unknown skill: {0}")]
    UnknownSkill(String),
    #[error("no skill or review selected")]
    NoTarget,
    #[error("no active question")]
    NoActiveQuestion,
    #[error("answer is empty")]
    EmptyAnswer,
    #[error("no valid document reference")]
    NoReference,
    #[error("cannot find '{name}' at {path}")]
    FileMissing { name: String, path: String },
    #[error("no task is running")]
    NothingToCancel,
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Settings(#[from] AppSettingsServiceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Ai(#[from] AiError),
}

/// Errors emitted by `AppSettingsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppSettingsServiceError {
    #[error(transparent)]
    Settings(#[from] AppSettingsError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Settings(#[from] AppSettingsServiceError),
}
