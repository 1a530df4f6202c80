use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Display name of the pseudo-skill that quizzes across every document.
pub const COMBINED_REVIEW_NAME: &str = "All Materials Review";

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DocumentError {
    #[error("path has no file name: {0}")]
    MissingFileName(PathBuf),

    #[error("a document named '{0}' is already registered")]
    DuplicateName(String),

    #[error("'{0}' is reserved for the combined review")]
    ReservedName(String),
}

//
// ─── DOCUMENT ──────────────────────────────────────────────────────────────────
//

/// A local course file. Its base name doubles as the skill name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
    name: String,
}

impl Document {
    /// Derive a document from a filesystem path.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError::MissingFileName` if the path has no final
    /// component, or `ReservedName` if it collides with the combined review.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, DocumentError> {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| DocumentError::MissingFileName(path.clone()))?;
        if name == COMBINED_REVIEW_NAME {
            return Err(DocumentError::ReservedName(name));
        }
        Ok(Self { path, name })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

//
// ─── DOCUMENT LIST ─────────────────────────────────────────────────────────────
//

/// Canonical, ordered list of registered documents.
///
/// Positions in this list are the indices that references resolve to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentList {
    items: Vec<Document>,
}

impl DocumentList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a path at the end of the list.
    ///
    /// Returns `Ok(false)` when the exact path is already registered.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError::DuplicateName` if a different path with the same
    /// base name is registered, or any error from `Document::from_path`.
    pub fn add(&mut self, path: impl Into<PathBuf>) -> Result<bool, DocumentError> {
        let document = Document::from_path(path)?;
        if self.items.iter().any(|doc| doc.path == document.path) {
            return Ok(false);
        }
        if self.contains(&document.name) {
            return Err(DocumentError::DuplicateName(document.name));
        }
        self.items.push(document);
        Ok(true)
    }

    /// Remove every document whose name is listed. Returns the removed names
    /// in list order.
    pub fn remove_names<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<String> {
        let mut removed = Vec::new();
        self.items.retain(|doc| {
            let hit = names.iter().any(|name| name.as_ref() == doc.name);
            if hit {
                removed.push(doc.name.clone());
            }
            !hit
        });
        removed
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|doc| doc.name == name)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Document> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.items.iter()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.items.iter().map(|doc| doc.name.clone()).collect()
    }
}

//
// ─── QUIZ TARGET ───────────────────────────────────────────────────────────────
//

/// What the current quiz draws from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QuizTarget {
    /// A single registered document, by name.
    Skill(String),
    /// Every uploaded document at once. Never owns progress.
    CombinedReview,
}

impl QuizTarget {
    /// Interpret a user-facing name, mapping the combined review label (or
    /// `all`) to `CombinedReview`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let trimmed = name.trim();
        if trimmed == COMBINED_REVIEW_NAME || trimmed.eq_ignore_ascii_case("all") {
            Self::CombinedReview
        } else {
            Self::Skill(trimmed.to_string())
        }
    }
}

impl fmt::Display for QuizTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuizTarget::Skill(name) => f.write_str(name),
            QuizTarget::CombinedReview => f.write_str(COMBINED_REVIEW_NAME),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_keeps_upload_order_and_skips_same_path() {
        let mut docs = DocumentList::new();
        assert!(docs.add("/notes/a.pdf").unwrap());
        assert!(docs.add("/notes/b.pdf").unwrap());
        assert!(!docs.add("/notes/a.pdf").unwrap());

        assert_eq!(docs.names(), ["a.pdf", "b.pdf"]);
        assert_eq!(docs.index_of("b.pdf"), Some(1));
    }

    #[test]
    fn add_rejects_same_name_from_other_directory() {
        let mut docs = DocumentList::new();
        docs.add("/one/a.pdf").unwrap();
        let err = docs.add("/two/a.pdf").unwrap_err();
        assert_eq!(err, DocumentError::DuplicateName("a.pdf".into()));
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn add_rejects_reserved_and_nameless_paths() {
        let mut docs = DocumentList::new();
        assert!(matches!(
            docs.add(format!("/x/{COMBINED_REVIEW_NAME}")),
            Err(DocumentError::ReservedName(_))
        ));
        assert!(matches!(docs.add("/"), Err(DocumentError::MissingFileName(_))));
    }

    #[test]
    fn remove_names_preserves_remaining_order() {
        let mut docs = DocumentList::new();
        for name in ["a.pdf", "b.pdf", "c.pdf", "d.pdf"] {
            docs.add(format!("/n/{name}")).unwrap();
        }
        let removed = docs.remove_names(&["c.pdf", "a.pdf", "zzz.pdf"]);
        assert_eq!(removed, ["a.pdf", "c.pdf"]);
        assert_eq!(docs.names(), ["b.pdf", "d.pdf"]);
        assert_eq!(docs.index_of("d.pdf"), Some(1));
    }

    #[test]
    fn quiz_target_from_name() {
        assert_eq!(QuizTarget::from_name("all"), QuizTarget::CombinedReview);
        assert_eq!(
            QuizTarget::from_name(COMBINED_REVIEW_NAME),
            QuizTarget::CombinedReview
        );
        assert_eq!(
            QuizTarget::from_name(" b.pdf "),
            QuizTarget::Skill("b.pdf".into())
        );
        assert_eq!(QuizTarget::CombinedReview.to_string(), COMBINED_REVIEW_NAME);
    }
}
