
/// Verdict extracted from an evaluation response.
///
/// `Unclear` covers replies that start with none of the recognised status
/// prefixes; scoring treats it like `Incorrect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GradeStatus {
    Correct,
    PartiallyCorrect,
    Incorrect,
    Unclear,
}

impl GradeStatus {
    /// Whether this verdict keeps the answer streak alive.
    #[must_use]
    pub fn continues_streak(self) -> bool {
        matches!(self, GradeStatus::Correct)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            GradeStatus::Correct => "Correct",
            GradeStatus::PartiallyCorrect => "Partially Correct",
            GradeStatus::Incorrect => "Incorrect",
            GradeStatus::Unclear => "Unclear",
        }
    }
}

/// A page inside one of the registered documents.
///
/// `doc_index` is a position in the canonical document list once remapped;
/// before remapping it is whatever index the model wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentReference {
    pub doc_index: usize,
    pub page: u32,
}

impl DocumentReference {
    #[must_use]
    pub fn new(doc_index: usize, page: u32) -> Self {
        Self { doc_index, page }
    }
}

/// Verdict plus optional reference, as parsed from one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradeOutcome {
    pub status: GradeStatus,
    pub reference: Option<DocumentReference>,
}

impl GradeOutcome {
    #[must_use]
    pub fn new(status: GradeStatus, reference: Option<DocumentReference>) -> Self {
        Self { status, reference }
    }
}
