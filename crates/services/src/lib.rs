#![forbid(unsafe_code)]

pub mod ai;
pub mod app_services;
pub mod app_settings_service;
pub mod error;
pub mod tasks;
pub mod tutor;

pub use app_services::AppServices;
pub use app_settings_service::{AppSettingsService, EnvOverrides};
pub use error::{AiError, AppServicesError, AppSettingsServiceError, TutorError};
pub use tasks::{AiTaskKind, TaskEvent, TaskId, TaskKind, UploadPolicy};
pub use tutor::{
    AddDocumentsReport, GradeReport, Notice, Readiness, ReferenceTarget, ReferenceView,
    SkillSummary, TutorCoordinator,
};
