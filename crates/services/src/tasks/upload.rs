use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::ai::{FileState, GenerativeClient, RemoteFile};
use crate::error::AiError;

use super::{CancelFlag, EventSender, TaskEvent, TaskId, emit};

/// Timing of the post-upload processing poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    pub initial_wait: Duration,
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl UploadPolicy {
    /// No waiting between polls. Used by tests and local fakes.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            initial_wait: Duration::ZERO,
            poll_interval: Duration::ZERO,
            max_attempts,
        }
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            initial_wait: Duration::from_secs(2),
            poll_interval: Duration::from_secs(5),
            max_attempts: 10,
        }
    }
}

/// Inputs of one upload run, in document-list order.
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub task: TaskId,
    pub documents: Vec<(String, PathBuf)>,
    pub policy: UploadPolicy,
    pub cancel: CancelFlag,
}

/// Upload every document and wait for each to become active.
///
/// Sends progress events along the way and exactly one terminal event:
/// `Uploaded`, `UploadFailed` or `Cancelled`.
pub async fn run_upload(client: Arc<dyn GenerativeClient>, job: UploadJob, events: EventSender) {
    let task = job.task;
    let terminal = match upload_all(client.as_ref(), &job, &events).await {
        Ok(Some(files)) => {
            tracing::info!(task = %task, count = files.len(), "upload finished");
            TaskEvent::Uploaded { task, files }
        }
        Ok(None) => {
            tracing::info!(task = %task, "upload cancelled");
            TaskEvent::Cancelled { task }
        }
        Err(error) if job.cancel.is_cancelled() => {
            tracing::info!(task = %task, %error, "upload cancelled while failing");
            TaskEvent::Cancelled { task }
        }
        Err(error) => {
            tracing::warn!(task = %task, %error, "upload failed");
            TaskEvent::UploadFailed { task, error }
        }
    };
    emit(&events, terminal).await;
}

/// `Ok(None)` means the run was cancelled.
async fn upload_all(
    client: &dyn GenerativeClient,
    job: &UploadJob,
    events: &EventSender,
) -> Result<Option<Vec<(String, RemoteFile)>>, AiError> {
    let total = job.documents.len();
    let mut uploaded = Vec::with_capacity(total);

    for (position, (name, path)) in job.documents.iter().enumerate() {
        if job.cancel.is_cancelled() {
            return Ok(None);
        }
        emit(
            events,
            TaskEvent::UploadProgress {
                task: job.task,
                document: name.clone(),
                position: position + 1,
                total,
            },
        )
        .await;

        tracing::debug!(document = %name, path = %path.display(), "uploading");
        let mut file = client.upload_file(path, name).await?;
        if job.cancel.is_cancelled() {
            discard_unless_failed(client, &file).await;
            return Ok(None);
        }

        tokio::time::sleep(job.policy.initial_wait).await;
        let mut attempts = 0;
        while file.state == FileState::Processing && attempts < job.policy.max_attempts {
            tracing::debug!(
                document = %name,
                attempt = attempts + 1,
                max = job.policy.max_attempts,
                "waiting for file processing"
            );
            tokio::time::sleep(job.policy.poll_interval).await;
            if job.cancel.is_cancelled() {
                break;
            }
            match client.get_file(&file.name).await {
                Ok(refreshed) => file = refreshed,
                Err(error) => {
                    tracing::warn!(document = %name, %error, "file state check failed, retrying");
                }
            }
            attempts += 1;
        }

        if job.cancel.is_cancelled() {
            discard_unless_failed(client, &file).await;
            return Ok(None);
        }

        if file.state != FileState::Active {
            discard(client, &file).await;
            return Err(AiError::FileNotActive {
                name: name.clone(),
                state: file.state,
            });
        }

        emit(
            events,
            TaskEvent::FileProcessed {
                task: job.task,
                document: name.clone(),
            },
        )
        .await;
        uploaded.push((name.clone(), file));
    }

    if uploaded.is_empty() {
        return Err(AiError::NoFilesUploaded);
    }
    Ok(Some(uploaded))
}

async fn discard_unless_failed(client: &dyn GenerativeClient, file: &RemoteFile) {
    if file.state != FileState::Failed {
        discard(client, file).await;
    }
}

async fn discard(client: &dyn GenerativeClient, file: &RemoteFile) {
    match client.delete_file(&file.name).await {
        Ok(()) => tracing::debug!(file = %file.name, "deleted remote file"),
        Err(error) => tracing::warn!(file = %file.name, %error, "could not delete remote file"),
    }
}
