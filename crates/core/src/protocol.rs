//! Reading the tutor model's free-text replies.
//!
//! Evaluation replies open with a status phrase (`Status: Correct`,
//! `Status: Partially Correct`, `Status: Incorrect`). Any reply may carry a
//! loosely bracketed `Reference: [doc]:[page]` tag. The document index in that
//! tag is relative to the list the prompt presented, so it is remapped onto the
//! canonical document list before use.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{DocumentList, DocumentReference, GradeOutcome, GradeStatus, QuizTarget};

static STATUS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*status\s*:\s*(partially\s+correct|incorrect|correct)\b")
        .expect("status pattern should compile")
});

static REFERENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Reference:\s*\[?(\d+)\]?\s*:\s*\[?(\d+)\]?")
        .expect("reference pattern should compile")
});

/// Classify the leading status phrase of an evaluation reply.
///
/// Matching is case-insensitive and anchored on whole phrases, so
/// `status: partially correct` never reads as `status: correct`.
#[must_use]
pub fn parse_status(text: &str) -> GradeStatus {
    let Some(captures) = STATUS_REGEX.captures(text) else {
        return GradeStatus::Unclear;
    };
    let phrase = captures[1].to_ascii_lowercase();
    if phrase.starts_with("partially") {
        GradeStatus::PartiallyCorrect
    } else if phrase == "incorrect" {
        GradeStatus::Incorrect
    } else {
        GradeStatus::Correct
    }
}

/// Extract the first reference tag exactly as the model wrote it.
///
/// Returns `None` when there is no tag or either number does not parse.
#[must_use]
pub fn parse_raw_reference(text: &str) -> Option<DocumentReference> {
    let captures = REFERENCE_REGEX.captures(text)?;
    let doc_index = captures[1].parse::<usize>().ok()?;
    let page = captures[2].parse::<u32>().ok()?;
    Some(DocumentReference::new(doc_index, page))
}

/// Map a raw reference onto the canonical document list.
///
/// In combined review the prompt enumerated every document, so the index is
/// used as-is. For a single skill the prompt offered exactly one document, so
/// whatever index came back is replaced by that skill's canonical position.
/// Out-of-range results are dropped.
#[must_use]
pub fn resolve_reference(
    raw: DocumentReference,
    target: &QuizTarget,
    documents: &DocumentList,
) -> Option<DocumentReference> {
    let doc_index = match target {
        QuizTarget::CombinedReview => Some(raw.doc_index),
        QuizTarget::Skill(name) => documents.index_of(name),
    };

    match doc_index {
        Some(index) if index < documents.len() => {
            Some(DocumentReference::new(index, raw.page))
        }
        _ => {
            tracing::warn!(
                raw_index = raw.doc_index,
                page = raw.page,
                target = %target,
                documents = documents.len(),
                "discarding out-of-range document reference"
            );
            None
        }
    }
}

/// Status plus resolved reference for one reply.
#[must_use]
pub fn parse_response(text: &str, target: &QuizTarget, documents: &DocumentList) -> GradeOutcome {
    let reference = parse_raw_reference(text)
        .and_then(|raw| resolve_reference(raw, target, documents));
    GradeOutcome::new(parse_status(text), reference)
}
