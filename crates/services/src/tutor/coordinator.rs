use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use storage::repository::{ProgressMap, ProgressRepository, StorageError};
use tokio::task::JoinHandle;
use tutor_core::model::{
    AppSettings, AppSettingsDraft, DocumentError, DocumentList, DocumentReference, GradeStatus,
    ProgressRules, QuizTarget, SkillProgress,
};
use tutor_core::prompt::{self, PromptContext, PromptDocuments};
use tutor_core::{protocol, tracker};

use crate::ai::{ClientFactory, GenerateRequest, GenerativeClient, RemoteFile};
use crate::app_settings_service::AppSettingsService;
use crate::error::{AppSettingsServiceError, TutorError};
use crate::tasks::{
    AiTaskKind, CancelFlag, EventReceiver, EventSender, GenerationJob, TaskEvent, TaskId,
    TaskKind, UploadJob, UploadPolicy, event_channel, run_generation, run_upload,
};

use super::view::{
    GradeReport, Notice, Readiness, ReferenceTarget, ReferenceView, SkillSummary,
};

/// How long `shutdown` waits for a cancelled task before aborting it.
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(1500);

/// Result of adding a batch of paths.
#[derive(Debug, Default)]
pub struct AddDocumentsReport {
    pub added: Vec<String>,
    /// Paths already registered.
    pub skipped: Vec<PathBuf>,
    pub rejected: Vec<DocumentError>,
}

struct ActiveTask {
    id: TaskId,
    kind: TaskKind,
    target: Option<QuizTarget>,
    cancel: CancelFlag,
    handle: JoinHandle<()>,
}

/// Owns the whole tutoring state and the single background task slot.
///
/// Commands validate and spawn work; results come back as `TaskEvent`s that
/// the caller feeds into `handle_event`. Only this type mutates progress, and
/// only once a result has been delivered.
pub struct TutorCoordinator {
    rules: ProgressRules,
    settings_service: Arc<AppSettingsService>,
    progress_repo: Arc<dyn ProgressRepository>,
    client_factory: ClientFactory,
    upload_policy: UploadPolicy,
    events: EventSender,

    persisted_settings: AppSettings,
    settings: AppSettings,
    documents: DocumentList,
    uploaded: BTreeMap<String, RemoteFile>,
    progress: ProgressMap,
    target: Option<QuizTarget>,
    question: Option<String>,
    reference: Option<DocumentReference>,
    review_score: u64,

    active: Option<ActiveTask>,
    last_task_id: u64,
}

impl TutorCoordinator {
    /// Build a coordinator from already-loaded state.
    ///
    /// # Errors
    ///
    /// Returns `AppSettingsServiceError` if the environment overrides do not
    /// validate on top of `persisted_settings`.
    pub fn new(
        settings_service: Arc<AppSettingsService>,
        progress_repo: Arc<dyn ProgressRepository>,
        client_factory: ClientFactory,
        persisted_settings: AppSettings,
        progress: ProgressMap,
    ) -> Result<(Self, EventReceiver), AppSettingsServiceError> {
        let settings = settings_service.effective(&persisted_settings)?;
        let rules = ProgressRules::default();
        let progress = progress
            .into_iter()
            .map(|(name, p)| (name, tracker::normalize(&p, &rules)))
            .collect();
        let (events, receiver) = event_channel();
        Ok((
            Self {
                rules,
                settings_service,
                progress_repo,
                client_factory,
                upload_policy: UploadPolicy::default(),
                events,
                persisted_settings,
                settings,
                documents: DocumentList::new(),
                uploaded: BTreeMap::new(),
                progress,
                target: None,
                question: None,
                reference: None,
                review_score: 0,
                active: None,
                last_task_id: 0,
            },
            receiver,
        ))
    }

    #[must_use]
    pub fn with_upload_policy(mut self, policy: UploadPolicy) -> Self {
        self.upload_policy = policy;
        self
    }

    //
    // ─── QUERIES ────────────────────────────────────────────────────────────────
    //

    /// Effective settings, environment overrides included.
    #[must_use]
    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Draft of the persisted settings, for partial edits.
    #[must_use]
    pub fn settings_draft(&self) -> AppSettingsDraft {
        AppSettingsDraft::from_settings(&self.persisted_settings)
    }

    #[must_use]
    pub fn rules(&self) -> &ProgressRules {
        &self.rules
    }

    #[must_use]
    pub fn documents(&self) -> &DocumentList {
        &self.documents
    }

    #[must_use]
    pub fn target(&self) -> Option<&QuizTarget> {
        self.target.as_ref()
    }

    #[must_use]
    pub fn question(&self) -> Option<&str> {
        self.question.as_deref()
    }

    #[must_use]
    pub fn reference(&self) -> Option<ReferenceView> {
        self.reference.and_then(|r| self.reference_view(r))
    }

    #[must_use]
    pub fn progress_for(&self, skill: &str) -> Option<&SkillProgress> {
        self.progress.get(skill)
    }

    /// Sum of every stored skill's score. The combined review is separate.
    #[must_use]
    pub fn total_score(&self) -> u64 {
        tracker::total_score(self.progress.values())
    }

    /// Points earned in combined review this run. Never persisted.
    #[must_use]
    pub fn review_score(&self) -> u64 {
        self.review_score
    }

    #[must_use]
    pub fn highest_level(&self) -> u32 {
        tracker::highest_level(self.progress.values())
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    #[must_use]
    pub fn active_task(&self) -> Option<(TaskId, TaskKind)> {
        self.active.as_ref().map(|task| (task.id, task.kind))
    }

    #[must_use]
    pub fn is_uploaded(&self) -> bool {
        !self.uploaded.is_empty()
    }

    /// Skill path rows in document order.
    #[must_use]
    pub fn skills(&self) -> Vec<SkillSummary> {
        self.documents
            .iter()
            .map(|doc| {
                let progress = self.progress.get(doc.name()).copied().unwrap_or_default();
                SkillSummary {
                    name: doc.name().to_string(),
                    difficulty: tracker::difficulty_label(&progress, &self.rules).to_string(),
                    level_percent: tracker::level_progress_percent(&progress, &self.rules),
                    uploaded: self.uploaded.contains_key(doc.name()),
                    progress,
                }
            })
            .collect()
    }

    #[must_use]
    pub fn readiness(&self) -> Readiness {
        self.readiness_at(Utc::now())
    }

    /// Readiness as of `now`. Uploads past their expiry must be redone.
    #[must_use]
    pub fn readiness_at(&self, now: DateTime<Utc>) -> Readiness {
        let expires_at = self.uploaded.values().filter_map(|file| file.expires_at).min();
        if self.settings.api_key().is_none() {
            Readiness::MissingApiKey
        } else if self.documents.is_empty() {
            Readiness::NoDocuments
        } else if self.uploaded.is_empty() || expires_at.is_some_and(|at| at <= now) {
            Readiness::UploadNeeded
        } else {
            Readiness::Ready {
                uploaded: self.uploaded.len(),
                language: self.settings.language().to_string(),
                expires_at,
            }
        }
    }

    //
    // ─── SETTINGS & DOCUMENTS ───────────────────────────────────────────────────
    //

    /// Validate, persist and apply new settings.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::Busy` while a task runs, or a settings error if
    /// validation or persistence fails.
    pub async fn apply_settings(&mut self, draft: AppSettingsDraft) -> Result<&AppSettings, TutorError> {
        self.ensure_idle()?;
        let saved = self.settings_service.save(draft).await?;
        let effective = self.settings_service.effective(&saved)?;
        self.persisted_settings = saved;
        self.settings = effective;
        tracing::info!(model = %self.settings.model(), language = %self.settings.language(), "settings applied");
        Ok(&self.settings)
    }

    /// Register documents. Same-path repeats are skipped and name clashes
    /// rejected individually; any addition requires a fresh upload.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::Busy` while a task runs.
    pub fn add_documents<I, P>(&mut self, paths: I) -> Result<AddDocumentsReport, TutorError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.ensure_idle()?;
        let mut report = AddDocumentsReport::default();
        for path in paths {
            let path = path.into();
            match self.documents.add(path.clone()) {
                Ok(true) => {
                    if let Some(doc) = self.documents.iter().last() {
                        let name = doc.name().to_string();
                        self.progress.entry(name.clone()).or_default();
                        report.added.push(name);
                    }
                }
                Ok(false) => report.skipped.push(path),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "document not added");
                    report.rejected.push(err);
                }
            }
        }
        if !report.added.is_empty() {
            self.invalidate_uploads();
        }
        Ok(report)
    }

    /// Remove documents by name, discarding their progress.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::Busy` while a task runs, or a storage error if
    /// the updated progress cannot be saved.
    pub async fn remove_documents<S: AsRef<str>>(
        &mut self,
        names: &[S],
    ) -> Result<Vec<String>, TutorError> {
        self.ensure_idle()?;
        let removed = self.documents.remove_names(names);
        if removed.is_empty() {
            return Ok(removed);
        }
        for name in &removed {
            self.progress.remove(name);
        }
        self.invalidate_uploads();
        self.persist_progress().await?;
        Ok(removed)
    }

    /// Remove every document and all stored progress.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::Busy` while a task runs, or a storage error if
    /// the cleared progress cannot be saved.
    pub async fn clear_documents(&mut self) -> Result<usize, TutorError> {
        self.ensure_idle()?;
        let count = self.documents.len();
        if count == 0 {
            return Ok(0);
        }
        self.documents.clear();
        self.progress.clear();
        self.invalidate_uploads();
        self.persist_progress().await?;
        Ok(count)
    }

    //
    // ─── BACKGROUND TASKS ───────────────────────────────────────────────────────
    //

    /// Upload every registered document.
    ///
    /// # Errors
    ///
    /// Returns `TutorError` if busy, not configured, or there is nothing to
    /// upload.
    pub fn start_upload(&mut self) -> Result<TaskId, TutorError> {
        self.ensure_idle()?;
        if self.documents.is_empty() {
            return Err(TutorError::NoDocuments);
        }
        let client = self.client()?;
        self.invalidate_uploads();

        let task = self.next_task_id();
        let cancel = CancelFlag::new();
        let job = UploadJob {
            task,
            documents: self
                .documents
                .iter()
                .map(|doc| (doc.name().to_string(), doc.path().to_path_buf()))
                .collect(),
            policy: self.upload_policy,
            cancel: cancel.clone(),
        };
        tracing::info!(task = %task, count = job.documents.len(), "starting upload");
        let handle = tokio::spawn(run_upload(client, job, self.events.clone()));
        self.active = Some(ActiveTask {
            id: task,
            kind: TaskKind::Upload,
            target: None,
            cancel,
            handle,
        });
        Ok(task)
    }

    /// Select what the quiz draws from.
    ///
    /// # Errors
    ///
    /// Returns `TutorError` if busy, nothing is uploaded, or the skill is
    /// unknown or was not uploaded.
    pub fn start_quiz(&mut self, target: QuizTarget) -> Result<(), TutorError> {
        self.ensure_idle()?;
        if self.uploaded.is_empty() {
            return Err(TutorError::UploadRequired);
        }
        if let QuizTarget::Skill(name) = &target {
            if !self.documents.contains(name) {
                return Err(TutorError::UnknownSkill(name.clone()));
            }
            if !self.uploaded.contains_key(name) {
                return Err(TutorError::NotUploaded(name.clone()));
            }
        }
        tracing::info!(quiz = %target, "quiz started");
        self.target = Some(target);
        self.question = None;
        self.reference = None;
        Ok(())
    }

    /// Leave the current quiz.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::Busy` while a task runs.
    pub fn leave_quiz(&mut self) -> Result<(), TutorError> {
        self.ensure_idle()?;
        self.target = None;
        self.question = None;
        self.reference = None;
        Ok(())
    }

    /// Ask the model for a new question.
    ///
    /// # Errors
    ///
    /// Returns `TutorError` if busy, no quiz is selected, or the materials or
    /// client are unavailable.
    pub fn request_question(&mut self) -> Result<TaskId, TutorError> {
        self.ensure_idle()?;
        let target = self.target.clone().ok_or(TutorError::NoTarget)?;
        let files = self.files_for(&target)?;
        let client = self.client()?;
        let prompt = prompt::question_prompt(&self.prompt_context(&target));

        self.question = None;
        self.reference = None;
        Ok(self.spawn_generation(client, AiTaskKind::NextQuestion, target, prompt, files))
    }

    /// Ask for a hint on the current question.
    ///
    /// # Errors
    ///
    /// Returns `TutorError` if busy, no question is active, or the materials
    /// or client are unavailable.
    pub fn request_hint(&mut self, current_answer: &str) -> Result<TaskId, TutorError> {
        self.ensure_idle()?;
        let target = self.target.clone().ok_or(TutorError::NoTarget)?;
        let question = self.question.clone().ok_or(TutorError::NoActiveQuestion)?;
        let files = self.files_for(&target)?;
        let client = self.client()?;
        let prompt = prompt::hint_prompt(
            &self.prompt_context(&target),
            &question,
            current_answer.trim(),
        );
        Ok(self.spawn_generation(client, AiTaskKind::Hint, target, prompt, files))
    }

    /// Send an answer for grading.
    ///
    /// # Errors
    ///
    /// Returns `TutorError` if busy, no question is active, the answer is
    /// blank, or the materials or client are unavailable.
    pub fn submit_answer(&mut self, answer: &str) -> Result<TaskId, TutorError> {
        self.ensure_idle()?;
        let target = self.target.clone().ok_or(TutorError::NoTarget)?;
        let question = self.question.clone().ok_or(TutorError::NoActiveQuestion)?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(TutorError::EmptyAnswer);
        }
        let files = self.files_for(&target)?;
        let client = self.client()?;
        let prompt = prompt::evaluation_prompt(&self.prompt_context(&target), &question, answer);
        Ok(self.spawn_generation(client, AiTaskKind::Evaluate, target, prompt, files))
    }

    /// Ask the running task to stop. It reports `Cancelled` when it does.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::NothingToCancel` when idle.
    pub fn cancel_active(&mut self) -> Result<TaskId, TutorError> {
        let active = self.active.as_ref().ok_or(TutorError::NothingToCancel)?;
        tracing::info!(task = %active.id, kind = %active.kind, "cancelling task");
        active.cancel.cancel();
        Ok(active.id)
    }

    /// Apply a task event and describe what happened.
    ///
    /// Events from tasks other than the active one are dropped.
    pub async fn handle_event(&mut self, event: TaskEvent) -> Option<Notice> {
        let Some(active) = self.active.as_ref() else {
            tracing::debug!(task = %event.task(), "ignoring event with no active task");
            return None;
        };
        if active.id != event.task() {
            tracing::debug!(task = %event.task(), active = %active.id, "ignoring stale task event");
            return None;
        }
        let kind = active.kind;
        let task_target = active.target.clone();
        if event.is_terminal() {
            self.active = None;
        }

        match event {
            TaskEvent::UploadProgress {
                document,
                position,
                total,
                ..
            } => Some(Notice::UploadProgress {
                document,
                position,
                total,
            }),
            TaskEvent::FileProcessed { document, .. } => Some(Notice::FileProcessed { document }),
            TaskEvent::Uploaded { files, .. } => {
                self.uploaded = files.into_iter().collect();
                for name in self.uploaded.keys() {
                    self.progress.entry(name.clone()).or_default();
                }
                Some(Notice::UploadComplete {
                    count: self.uploaded.len(),
                })
            }
            TaskEvent::UploadFailed { error, .. } => {
                self.uploaded.clear();
                Some(Notice::UploadFailed {
                    message: error.to_string(),
                })
            }
            TaskEvent::Generated { kind, text, .. } => {
                let target = task_target.or_else(|| self.target.clone())?;
                Some(self.apply_generated(kind, &target, text).await)
            }
            TaskEvent::GenerationFailed { kind, error, .. } => {
                if kind == AiTaskKind::NextQuestion {
                    self.question = None;
                }
                Some(Notice::TaskFailed {
                    kind: TaskKind::Ai(kind),
                    message: error.to_string(),
                })
            }
            TaskEvent::Cancelled { .. } => Some(Notice::Cancelled { kind }),
        }
    }

    /// Resolve the current reference to a local file.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::NoReference` when there is none, or
    /// `FileMissing` when the document is no longer on disk.
    pub async fn view_reference(&self) -> Result<ReferenceTarget, TutorError> {
        let reference = self.reference.ok_or(TutorError::NoReference)?;
        let doc = self
            .documents
            .get(reference.doc_index)
            .ok_or(TutorError::NoReference)?;
        let exists = tokio::fs::try_exists(doc.path()).await.unwrap_or(false);
        if !exists {
            return Err(TutorError::FileMissing {
                name: doc.name().to_string(),
                path: doc.path().display().to_string(),
            });
        }
        Ok(ReferenceTarget {
            document: doc.name().to_string(),
            path: doc.path().to_path_buf(),
            page: reference.page,
        })
    }

    /// Stop any running task and save progress.
    ///
    /// # Errors
    ///
    /// Returns a storage error if progress cannot be saved.
    pub async fn shutdown(&mut self) -> Result<(), TutorError> {
        if let Some(active) = self.active.take() {
            tracing::info!(task = %active.id, kind = %active.kind, "stopping task before exit");
            active.cancel.cancel();
            let mut handle = active.handle;
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
                tracing::warn!(task = %active.id, "task did not stop in time, aborting");
                handle.abort();
            }
        }
        self.persist_progress().await?;
        Ok(())
    }

    //
    // ─── INTERNALS ──────────────────────────────────────────────────────────────
    //

    fn ensure_idle(&self) -> Result<(), TutorError> {
        if self.active.is_some() {
            return Err(TutorError::Busy);
        }
        Ok(())
    }

    fn next_task_id(&mut self) -> TaskId {
        self.last_task_id += 1;
        TaskId::new(self.last_task_id)
    }

    fn client(&self) -> Result<Arc<dyn GenerativeClient>, TutorError> {
        let api_key = self.settings.api_key().ok_or(TutorError::MissingApiKey)?;
        Ok((self.client_factory)(&self.settings, api_key)?)
    }

    fn invalidate_uploads(&mut self) {
        self.uploaded.clear();
        self.target = None;
        self.question = None;
        self.reference = None;
    }

    fn files_for(&self, target: &QuizTarget) -> Result<Vec<RemoteFile>, TutorError> {
        if self.uploaded.is_empty() {
            return Err(TutorError::UploadRequired);
        }
        match target {
            QuizTarget::Skill(name) => self
                .uploaded
                .get(name)
                .cloned()
                .map(|file| vec![file])
                .ok_or_else(|| TutorError::NotUploaded(name.clone())),
            QuizTarget::CombinedReview => Ok(self
                .documents
                .iter()
                .filter_map(|doc| self.uploaded.get(doc.name()).cloned())
                .collect()),
        }
    }

    fn difficulty_for(&self, target: &QuizTarget) -> String {
        match target {
            QuizTarget::Skill(name) => {
                let progress = self.progress.get(name).copied().unwrap_or_default();
                tracker::difficulty_label(&progress, &self.rules).to_string()
            }
            QuizTarget::CombinedReview => self.rules.review_label().to_string(),
        }
    }

    fn prompt_context(&self, target: &QuizTarget) -> PromptContext {
        PromptContext::new(
            self.settings.language(),
            self.difficulty_for(target),
            PromptDocuments::for_target(target, &self.documents),
        )
    }

    fn spawn_generation(
        &mut self,
        client: Arc<dyn GenerativeClient>,
        kind: AiTaskKind,
        target: QuizTarget,
        prompt: String,
        files: Vec<RemoteFile>,
    ) -> TaskId {
        let task = self.next_task_id();
        let cancel = CancelFlag::new();
        let job = GenerationJob {
            task,
            kind,
            request: GenerateRequest {
                model: self.settings.model().to_string(),
                system_instruction: self.settings.system_instruction().to_string(),
                prompt,
                files,
            },
            cancel: cancel.clone(),
        };
        tracing::info!(task = %task, kind = kind.label(), quiz = %target, "starting model call");
        let handle = tokio::spawn(run_generation(client, job, self.events.clone()));
        self.active = Some(ActiveTask {
            id: task,
            kind: TaskKind::Ai(kind),
            target: Some(target),
            cancel,
            handle,
        });
        task
    }

    async fn apply_generated(&mut self, kind: AiTaskKind, target: &QuizTarget, text: String) -> Notice {
        match kind {
            AiTaskKind::NextQuestion => {
                self.question = Some(text.clone());
                self.reference = None;
                Notice::Question {
                    text,
                    difficulty: self.difficulty_for(target),
                }
            }
            AiTaskKind::Hint => {
                let outcome = protocol::parse_response(&text, target, &self.documents);
                self.reference = outcome.reference;
                Notice::Hint {
                    reference: self.reference(),
                    text,
                }
            }
            AiTaskKind::Evaluate => Notice::Graded(self.apply_evaluation(target, text).await),
        }
    }

    async fn apply_evaluation(&mut self, target: &QuizTarget, feedback: String) -> GradeReport {
        let outcome = protocol::parse_response(&feedback, target, &self.documents);
        if outcome.status == GradeStatus::Unclear {
            tracing::warn!(quiz = %target, "grading status unclear, scoring as incorrect");
        }
        self.question = None;
        self.reference = outcome.reference;
        let reference = self.reference();

        match target {
            QuizTarget::Skill(name) => {
                let current = self.progress.get(name).copied().unwrap_or_default();
                let applied = tracker::apply_grade(&current, outcome.status, &self.rules);
                self.progress.insert(name.clone(), applied.progress);
                if applied.leveled_up {
                    tracing::info!(skill = %name, level = applied.progress.level(), "skill level up");
                }
                let save_error = self.persist_progress().await.err().map(|err| {
                    tracing::error!(error = %err, "failed to save progress");
                    err.to_string()
                });
                GradeReport {
                    target: target.clone(),
                    status: outcome.status,
                    feedback,
                    points_earned: applied.points_earned,
                    leveled_up: applied.leveled_up,
                    progress: Some(applied.progress),
                    reference,
                    save_error,
                }
            }
            QuizTarget::CombinedReview => {
                let points = tracker::review_points(outcome.status, &self.rules);
                self.review_score += u64::from(points);
                GradeReport {
                    target: target.clone(),
                    status: outcome.status,
                    feedback,
                    points_earned: points,
                    leveled_up: false,
                    progress: None,
                    reference,
                    save_error: None,
                }
            }
        }
    }

    fn reference_view(&self, reference: DocumentReference) -> Option<ReferenceView> {
        self.documents
            .get(reference.doc_index)
            .map(|doc| ReferenceView {
                document: doc.name().to_string(),
                page: reference.page,
            })
    }

    async fn persist_progress(&self) -> Result<(), StorageError> {
        self.progress_repo.save_progress(&self.progress).await
    }
}
