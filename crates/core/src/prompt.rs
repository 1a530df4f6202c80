//! Prompt text sent alongside the uploaded documents.
//!
//! Every prompt names the answer language, the difficulty label and the
//! authoritative document(s), and lists the document indices the model must
//! use in a `Reference:` tag. A single skill is always presented as index 0.

use std::fmt::Write as _;

use crate::model::{DocumentList, QuizTarget};

/// Which documents a prompt presents, in presentation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptDocuments {
    Single(String),
    Combined(Vec<String>),
}

impl PromptDocuments {
    /// Presentation list for a quiz target.
    #[must_use]
    pub fn for_target(target: &QuizTarget, documents: &DocumentList) -> Self {
        match target {
            QuizTarget::Skill(name) => Self::Single(name.clone()),
            QuizTarget::CombinedReview => Self::Combined(documents.names()),
        }
    }

    fn is_combined(&self) -> bool {
        matches!(self, Self::Combined(_))
    }

    fn source_phrase(&self) -> String {
        match self {
            Self::Single(name) => format!("the provided document ('{name}')"),
            Self::Combined(_) => "ANY of the provided documents".to_string(),
        }
    }

    fn short_phrase(&self) -> &'static str {
        match self {
            Self::Single(_) => "the document",
            Self::Combined(_) => "the documents",
        }
    }

    fn reference_hint(&self) -> &'static str {
        match self {
            Self::Single(_) => "'Reference: [0]:[Page Number]'",
            Self::Combined(_) => {
                "'Reference: [Document Index]:[Page Number]', using the index from the document list below"
            }
        }
    }

    fn listing(&self) -> String {
        match self {
            Self::Single(name) => {
                format!("Document Provided (Use index [0] for references):\n [0]: {name}\n\nDocument Data:\n")
            }
            Self::Combined(names) if names.is_empty() => {
                "No documents provided.\n\nDocuments Data:\n".to_string()
            }
            Self::Combined(names) => {
                let mut out = String::from("Documents Provided (Use these indices for references):\n");
                for (index, name) in names.iter().enumerate() {
                    let _ = writeln!(out, "  [{index}]: {name}");
                }
                out.push_str("\nDocuments Data:\n");
                out
            }
        }
    }
}

/// Inputs shared by every prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptContext {
    pub language: String,
    pub difficulty: String,
    pub documents: PromptDocuments,
}

impl PromptContext {
    #[must_use]
    pub fn new(
        language: impl Into<String>,
        difficulty: impl Into<String>,
        documents: PromptDocuments,
    ) -> Self {
        Self {
            language: language.into(),
            difficulty: difficulty.into(),
            documents,
        }
    }
}

/// Ask for one new exam question.
#[must_use]
pub fn question_prompt(ctx: &PromptContext) -> String {
    format!(
        "Generate a single, clear, text-based exam question in {language} with '{difficulty}' difficulty. \
The question must test understanding of concepts, definitions, or processes explained ONLY within {source}. \
The question should require more than a simple yes/no answer. Avoid trivial or ambiguous questions.\n\n{listing}",
        language = ctx.language,
        difficulty = ctx.difficulty,
        source = ctx.documents.source_phrase(),
        listing = ctx.documents.listing(),
    )
}

/// Ask for a hint that does not reveal the answer.
#[must_use]
pub fn hint_prompt(ctx: &PromptContext, question: &str, current_answer: &str) -> String {
    format!(
        "Context: The student is answering the following '{difficulty}' difficulty question, based ONLY on {source}:\n\
Question: {question}\n\n\
Student's current answer: \"{current_answer}\"\n\n\
Task: Provide a concise hint or guiding question (1-2 sentences) in {language} to help the student find the answer using ONLY {short}. \
Do NOT give the answer. Focus on suggesting where to look or what concept to reconsider. \
If relevant, append a reference tag like {reference}.\n\n{listing}",
        difficulty = ctx.difficulty,
        source = ctx.documents.source_phrase(),
        language = ctx.language,
        short = ctx.documents.short_phrase(),
        reference = ctx.documents.reference_hint(),
        listing = ctx.documents.listing(),
    )
}

/// Ask for a graded evaluation that opens with a status phrase.
#[must_use]
pub fn evaluation_prompt(ctx: &PromptContext, question: &str, answer: &str) -> String {
    let derived_from = if ctx.documents.is_combined() {
        "the relevant document(s)"
    } else {
        "the document"
    };
    format!(
        "Context: Evaluate the student's answer to a '{difficulty}' difficulty question based ONLY on {source}.\n\n\
Question: {question}\n\
Student's Answer: {answer}\n\n\
Task: Evaluate in {language} using ONLY {short}:\n\
1. Status: Start *EXACTLY* with 'Status: Correct', 'Status: Partially Correct', or 'Status: Incorrect'.\n\
2. Correct Answer: Provide the correct answer derived ONLY from {derived_from}.\n\
3. Explanation: Analyze the student's answer against the correct one. Explain errors or omissions based ONLY on {short}.\n\n\
If relevant, append a reference tag like {reference}.\n\n{listing}",
        difficulty = ctx.difficulty,
        source = ctx.documents.source_phrase(),
        language = ctx.language,
        short = ctx.documents.short_phrase(),
        reference = ctx.documents.reference_hint(),
        listing = ctx.documents.listing(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combined() -> PromptContext {
        PromptContext::new(
            "Finnish",
            "Standard",
            PromptDocuments::Combined(vec!["a.pdf".into(), "b.pdf".into()]),
        )
    }

    fn single() -> PromptContext {
        PromptContext::new("English", "Hard", PromptDocuments::Single("b.pdf".into()))
    }

    #[test]
    fn question_prompt_states_language_difficulty_and_sources() {
        let prompt = question_prompt(&single());
        assert!(prompt.contains("in English with 'Hard' difficulty"));
        assert!(prompt.contains("('b.pdf')"));
        assert!(prompt.contains(" [0]: b.pdf\n"));

        let prompt = question_prompt(&combined());
        assert!(prompt.contains("in Finnish with 'Standard' difficulty"));
        assert!(prompt.contains("  [0]: a.pdf\n  [1]: b.pdf\n"));
        assert!(prompt.ends_with("Documents Data:\n"));
    }

    #[test]
    fn hint_prompt_includes_question_and_reference_format() {
        let prompt = hint_prompt(&single(), "What is X?", "partly Y");
        assert!(prompt.contains("Question: What is X?"));
        assert!(prompt.contains("\"partly Y\""));
        assert!(prompt.contains("'Reference: [0]:[Page Number]'"));
        assert!(prompt.contains("Do NOT give the answer"));
        assert!(prompt.contains("'Hard' difficulty"));
    }

    #[test]
    fn evaluation_prompt_demands_status_prefix() {
        let prompt = evaluation_prompt(&combined(), "Q?", "A.");
        assert!(prompt.contains("Start *EXACTLY* with 'Status: Correct'"));
        assert!(prompt.contains("Student's Answer: A."));
        assert!(prompt.contains("using the index from the document list below"));
        assert!(prompt.contains("  [1]: b.pdf"));
    }

    #[test]
    fn empty_combined_list_is_explicit() {
        let ctx = PromptContext::new("English", "Standard", PromptDocuments::Combined(Vec::new()));
        assert!(question_prompt(&ctx).contains("No documents provided."));
    }

    #[test]
    fn documents_for_target() {
        let mut docs = DocumentList::new();
        docs.add("/c/a.pdf").unwrap();
        docs.add("/c/b.pdf").unwrap();
        assert_eq!(
            PromptDocuments::for_target(&QuizTarget::CombinedReview, &docs),
            PromptDocuments::Combined(vec!["a.pdf".into(), "b.pdf".into()])
        );
        assert_eq!(
            PromptDocuments::for_target(&QuizTarget::Skill("b.pdf".into()), &docs),
            PromptDocuments::Single("b.pdf".into())
        );
    }
}
