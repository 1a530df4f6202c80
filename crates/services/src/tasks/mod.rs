//! Background work: uploads and model calls run on spawned tokio tasks and
//! report back through a single event channel.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use crate::ai::RemoteFile;
use crate::error::AiError;

mod generate;
mod upload;

pub use generate::{AiTaskKind, GenerationJob, run_generation};
pub use upload::{UploadJob, UploadPolicy, run_upload};

/// Capacity of the coordinator's event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

pub type EventSender = mpsc::Sender<TaskEvent>;
pub type EventReceiver = mpsc::Receiver<TaskEvent>;

#[must_use]
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::channel(EVENT_CHANNEL_CAPACITY)
}

/// Identifies one spawned task. Events carrying a stale id are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a task is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Upload,
    Ai(AiTaskKind),
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Upload => f.write_str("upload"),
            TaskKind::Ai(kind) => f.write_str(kind.label()),
        }
    }
}

/// Shared stop flag, checked before and after each blocking step.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a background task can report.
#[derive(Debug)]
pub enum TaskEvent {
    UploadProgress {
        task: TaskId,
        document: String,
        position: usize,
        total: usize,
    },
    FileProcessed {
        task: TaskId,
        document: String,
    },
    /// Files keyed by the document name they were uploaded for.
    Uploaded {
        task: TaskId,
        files: Vec<(String, RemoteFile)>,
    },
    UploadFailed {
        task: TaskId,
        error: AiError,
    },
    Generated {
        task: TaskId,
        kind: AiTaskKind,
        text: String,
    },
    GenerationFailed {
        task: TaskId,
        kind: AiTaskKind,
        error: AiError,
    },
    Cancelled {
        task: TaskId,
    },
}

impl TaskEvent {
    #[must_use]
    pub fn task(&self) -> TaskId {
        match self {
            TaskEvent::UploadProgress { task, .. }
            | TaskEvent::FileProcessed { task, .. }
            | TaskEvent::Uploaded { task, .. }
            | TaskEvent::UploadFailed { task, .. }
            | TaskEvent::Generated { task, .. }
            | TaskEvent::GenerationFailed { task, .. }
            | TaskEvent::Cancelled { task } => *task,
        }
    }

    /// Whether this is the last event its task sends.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            TaskEvent::UploadProgress { .. } | TaskEvent::FileProcessed { .. }
        )
    }
}

async fn emit(events: &EventSender, event: TaskEvent) {
    if events.send(event).await.is_err() {
        tracing::debug!("event receiver dropped, discarding task event");
    }
}
