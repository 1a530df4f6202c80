mod coordinator;
mod view;

// Public API of the tutoring subsystem.
pub use crate::error::TutorError;
pub use coordinator::{AddDocumentsReport, SHUTDOWN_GRACE, TutorCoordinator};
pub use view::{GradeReport, Notice, Readiness, ReferenceTarget, ReferenceView, SkillSummary};
