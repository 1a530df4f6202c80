mod app_settings;
mod document;
mod grade;
mod progress;

pub use app_settings::{
    AppSettings, AppSettingsDraft, AppSettingsError, DEFAULT_LANGUAGE, DEFAULT_MODEL,
    DEFAULT_SYSTEM_INSTRUCTION, SUPPORTED_LANGUAGES,
};
pub use document::{COMBINED_REVIEW_NAME, Document, DocumentError, DocumentList, QuizTarget};
pub use grade::{DocumentReference, GradeOutcome, GradeStatus};
pub use progress::{ProgressRules, RulesError, SkillProgress};
