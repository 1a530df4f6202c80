use std::sync::Arc;

use crate::ai::{GenerateRequest, GenerativeClient};

use super::{CancelFlag, EventSender, TaskEvent, TaskId, emit};

/// The three model calls a quiz makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AiTaskKind {
    NextQuestion,
    Hint,
    Evaluate,
}

impl AiTaskKind {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            AiTaskKind::NextQuestion => "next question",
            AiTaskKind::Hint => "hint",
            AiTaskKind::Evaluate => "answer evaluation",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub task: TaskId,
    pub kind: AiTaskKind,
    pub request: GenerateRequest,
    pub cancel: CancelFlag,
}

/// Run one model call and report `Generated`, `GenerationFailed` or
/// `Cancelled`.
pub async fn run_generation(
    client: Arc<dyn GenerativeClient>,
    job: GenerationJob,
    events: EventSender,
) {
    let GenerationJob {
        task,
        kind,
        request,
        cancel,
    } = job;

    if cancel.is_cancelled() {
        emit(&events, TaskEvent::Cancelled { task }).await;
        return;
    }

    tracing::debug!(task = %task, kind = kind.label(), model = %request.model, "calling model");
    let result = client.generate(&request).await;

    let event = if cancel.is_cancelled() {
        TaskEvent::Cancelled { task }
    } else {
        match result {
            Ok(text) => TaskEvent::Generated { task, kind, text },
            Err(error) => {
                tracing::warn!(task = %task, kind = kind.label(), %error, "model call failed");
                TaskEvent::GenerationFailed { task, kind, error }
            }
        }
    };
    emit(&events, event).await;
}
