use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tutor_core::model::{GradeStatus, QuizTarget, SkillProgress};

use crate::tasks::TaskKind;

/// A reference resolved against the document list, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceView {
    pub document: String,
    pub page: u32,
}

/// A reference the front-end can open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTarget {
    pub document: String,
    pub path: PathBuf,
    pub page: u32,
}

/// One row of the skill path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillSummary {
    pub name: String,
    pub progress: SkillProgress,
    pub difficulty: String,
    /// Percent of the way to the next level.
    pub level_percent: u8,
    pub uploaded: bool,
}

/// Outcome of a graded answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeReport {
    pub target: QuizTarget,
    pub status: GradeStatus,
    pub feedback: String,
    pub points_earned: u32,
    pub leveled_up: bool,
    /// Updated progress; `None` for the combined review.
    pub progress: Option<SkillProgress>,
    pub reference: Option<ReferenceView>,
    /// Set when the grade was applied but could not be saved.
    pub save_error: Option<String>,
}

/// What the front-end should tell the user after a task event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    UploadProgress {
        document: String,
        position: usize,
        total: usize,
    },
    FileProcessed {
        document: String,
    },
    UploadComplete {
        count: usize,
    },
    UploadFailed {
        message: String,
    },
    Question {
        text: String,
        difficulty: String,
    },
    Hint {
        text: String,
        reference: Option<ReferenceView>,
    },
    Graded(GradeReport),
    TaskFailed {
        kind: TaskKind,
        message: String,
    },
    Cancelled {
        kind: TaskKind,
    },
}

/// Coarse readiness, in the order the user has to fix things.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    MissingApiKey,
    NoDocuments,
    UploadNeeded,
    Ready {
        uploaded: usize,
        language: String,
        /// Soonest expiry among the uploaded files, when the API reports one.
        expires_at: Option<DateTime<Utc>>,
    },
}
