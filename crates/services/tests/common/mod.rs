#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use services::ai::{ClientFactory, FileState, GenerateRequest, GenerativeClient, RemoteFile};
use services::tasks::EventReceiver;
use services::{AiError, AppServices, EnvOverrides, Notice, TutorCoordinator, UploadPolicy};
use storage::repository::{AppSettingsRepository, InMemoryRepository, Storage};
use tokio::sync::Notify;
use tutor_core::model::{AppSettings, AppSettingsDraft};

/// Scripted stand-in for the generative API.
#[derive(Default)]
pub struct FakeClient {
    responses: Mutex<VecDeque<Result<String, AiError>>>,
    refresh_states: Mutex<VecDeque<Result<FileState, AiError>>>,
    upload_state: Mutex<Option<FileState>>,
    upload_gate: Mutex<Option<Arc<Notify>>>,
    expires_at: Mutex<Option<DateTime<Utc>>>,
    pub uploads: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
    pub requests: Mutex<Vec<GenerateRequest>>,
}

impl FakeClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, text: &str) {
        self.responses.lock().unwrap().push_back(Ok(text.to_string()));
    }

    pub fn fail_next(&self, error: AiError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// State reported right after upload. Defaults to `Active`.
    pub fn set_upload_state(&self, state: FileState) {
        *self.upload_state.lock().unwrap() = Some(state);
    }

    /// Queue results for successive `get_file` calls. Defaults to `Active`.
    pub fn queue_refresh(&self, result: Result<FileState, AiError>) {
        self.refresh_states.lock().unwrap().push_back(result);
    }

    /// Make `upload_file` wait until the returned gate is notified.
    pub fn gate_uploads(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.upload_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Expiry stamped on every file handed out from now on.
    pub fn set_expiry(&self, at: DateTime<Utc>) {
        *self.expires_at.lock().unwrap() = Some(at);
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn remote(&self, display_name: &str, state: FileState) -> RemoteFile {
        RemoteFile {
            name: format!("files/{display_name}"),
            display_name: display_name.to_string(),
            uri: format!("https://fake.test/files/{display_name}"),
            mime_type: "application/pdf".to_string(),
            state,
            expires_at: *self.expires_at.lock().unwrap(),
        }
    }
}

#[async_trait]
impl GenerativeClient for FakeClient {
    async fn upload_file(&self, _path: &Path, display_name: &str) -> Result<RemoteFile, AiError> {
        self.uploads.lock().unwrap().push(display_name.to_string());
        let gate = self.upload_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let state = (*self.upload_state.lock().unwrap()).unwrap_or(FileState::Active);
        Ok(self.remote(display_name, state))
    }

    async fn get_file(&self, name: &str) -> Result<RemoteFile, AiError> {
        let next = self
            .refresh_states
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(FileState::Active));
        let display_name = name.trim_start_matches("files/");
        next.map(|state| self.remote(display_name, state))
    }

    async fn delete_file(&self, name: &str) -> Result<(), AiError> {
        self.deleted.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, AiError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(AiError::EmptyResponse))
    }
}

pub fn factory(client: &Arc<FakeClient>) -> ClientFactory {
    let client = Arc::clone(client);
    Arc::new(move |_settings: &AppSettings, _api_key: &str| {
        let client: Arc<dyn GenerativeClient> = client.clone();
        Ok(client)
    })
}

/// Coordinator over in-memory storage with an API key already saved.
pub async fn coordinator(
    client: &Arc<FakeClient>,
    repo: &InMemoryRepository,
) -> (TutorCoordinator, EventReceiver) {
    let settings = AppSettingsDraft {
        api_key: Some("test-key".into()),
        ..AppSettingsDraft::new()
    }
    .validate()
    .unwrap();
    repo.save_settings(&settings).await.unwrap();

    let storage = Storage {
        app_settings: Arc::new(repo.clone()),
        progress: Arc::new(repo.clone()),
    };
    AppServices::new(storage, EnvOverrides::default())
        .with_client_factory(factory(client))
        .with_upload_policy(UploadPolicy::immediate(3))
        .coordinator()
        .await
        .unwrap()
}

/// Feed events into the coordinator until its task finishes.
pub async fn drain(coordinator: &mut TutorCoordinator, events: &mut EventReceiver) -> Vec<Notice> {
    let mut notices = Vec::new();
    while coordinator.is_busy() {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("task event in time")
            .expect("event channel open");
        if let Some(notice) = coordinator.handle_event(event).await {
            notices.push(notice);
        }
    }
    notices
}
