use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RulesError {
    #[error("level-up threshold must be > 0")]
    InvalidLevelUpThreshold,

    #[error("questions per difficulty step must be > 0")]
    InvalidQuestionsPerLevelUp,

    #[error("at least one difficulty label is required")]
    MissingDifficultyLabels,
}

//
// ─── RULES ─────────────────────────────────────────────────────────────────────
//

/// Scoring and difficulty constants applied to every graded answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRules {
    points_correct: u32,
    points_partial: u32,
    streak_bonus_multiplier: u32,
    level_up_threshold: u32,
    questions_per_level_up: u32,
    difficulty_labels: Vec<String>,
    review_label: String,
}

impl ProgressRules {
    pub const POINTS_CORRECT: u32 = 10;
    pub const POINTS_PARTIAL: u32 = 5;
    pub const STREAK_BONUS_MULTIPLIER: u32 = 2;
    pub const LEVEL_UP_THRESHOLD: u32 = 50;
    pub const QUESTIONS_PER_LEVEL_UP: u32 = 5;

    /// Build a rule set.
    ///
    /// # Errors
    ///
    /// Returns `RulesError` if the threshold or step size is zero, or if no
    /// difficulty labels are given.
    pub fn new(
        points_correct: u32,
        points_partial: u32,
        streak_bonus_multiplier: u32,
        level_up_threshold: u32,
        questions_per_level_up: u32,
        difficulty_labels: Vec<String>,
    ) -> Result<Self, RulesError> {
        if level_up_threshold == 0 {
            return Err(RulesError::InvalidLevelUpThreshold);
        }
        if questions_per_level_up == 0 {
            return Err(RulesError::InvalidQuestionsPerLevelUp);
        }
        if difficulty_labels.is_empty() {
            return Err(RulesError::MissingDifficultyLabels);
        }

        Ok(Self {
            points_correct,
            points_partial,
            streak_bonus_multiplier,
            level_up_threshold,
            questions_per_level_up,
            difficulty_labels,
            review_label: "Standard".to_string(),
        })
    }

    #[must_use]
    pub fn points_correct(&self) -> u32 {
        self.points_correct
    }

    #[must_use]
    pub fn points_partial(&self) -> u32 {
        self.points_partial
    }

    #[must_use]
    pub fn streak_bonus_multiplier(&self) -> u32 {
        self.streak_bonus_multiplier
    }

    #[must_use]
    pub fn level_up_threshold(&self) -> u32 {
        self.level_up_threshold
    }

    #[must_use]
    pub fn questions_per_level_up(&self) -> u32 {
        self.questions_per_level_up
    }

    #[must_use]
    pub fn difficulty_labels(&self) -> &[String] {
        &self.difficulty_labels
    }

    #[must_use]
    pub fn difficulty_levels_count(&self) -> u32 {
        u32::try_from(self.difficulty_labels.len()).unwrap_or(u32::MAX)
    }

    /// Highest reachable difficulty index.
    #[must_use]
    pub fn max_difficulty_index(&self) -> u32 {
        self.difficulty_levels_count().saturating_sub(1)
    }

    /// Label used for combined-review prompts, which carry no per-skill difficulty.
    #[must_use]
    pub fn review_label(&self) -> &str {
        &self.review_label
    }

    /// Level implied by a score: `1 + floor(score / threshold)`.
    #[must_use]
    pub fn level_for(&self, score: u32) -> u32 {
        1 + score / self.level_up_threshold
    }
}

impl Default for ProgressRules {
    fn default() -> Self {
        Self {
            points_correct: Self::POINTS_CORRECT,
            points_partial: Self::POINTS_PARTIAL,
            streak_bonus_multiplier: Self::STREAK_BONUS_MULTIPLIER,
            level_up_threshold: Self::LEVEL_UP_THRESHOLD,
            questions_per_level_up: Self::QUESTIONS_PER_LEVEL_UP,
            difficulty_labels: vec!["Easy".into(), "Medium".into(), "Hard".into()],
            review_label: "Standard".into(),
        }
    }
}

//
// ─── SKILL PROGRESS ────────────────────────────────────────────────────────────
//

/// Mastery state for one uploaded document.
///
/// Only `tracker::apply_grade` moves a skill forward; everything else reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkillProgress {
    pub(crate) score: u32,
    pub(crate) streak: u32,
    pub(crate) level: u32,
    pub(crate) questions_answered: u32,
    pub(crate) difficulty_index: u32,
}

impl SkillProgress {
    /// Fresh state for a newly registered document.
    #[must_use]
    pub fn new() -> Self {
        Self {
            score: 0,
            streak: 0,
            level: 1,
            questions_answered: 0,
            difficulty_index: 0,
        }
    }

    /// Rehydrate from persisted values. A zero level is lifted to 1.
    #[must_use]
    pub fn from_persisted(
        score: u32,
        streak: u32,
        level: u32,
        questions_answered: u32,
        difficulty_index: u32,
    ) -> Self {
        Self {
            score,
            streak,
            level: level.max(1),
            questions_answered,
            difficulty_index,
        }
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub fn questions_answered(&self) -> u32 {
        self.questions_answered
    }

    #[must_use]
    pub fn difficulty_index(&self) -> u32 {
        self.difficulty_index
    }
}

impl Default for SkillProgress {
    fn default() -> Self {
        Self::new()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_match_documented_constants() {
        let rules = ProgressRules::default();
        assert_eq!(rules.points_correct(), 10);
        assert_eq!(rules.points_partial(), 5);
        assert_eq!(rules.streak_bonus_multiplier(), 2);
        assert_eq!(rules.level_up_threshold(), 50);
        assert_eq!(rules.questions_per_level_up(), 5);
        assert_eq!(rules.difficulty_labels(), ["Easy", "Medium", "Hard"]);
        assert_eq!(rules.max_difficulty_index(), 2);
        assert_eq!(rules.review_label(), "Standard");
    }

    #[test]
    fn rules_reject_degenerate_values() {
        let labels = vec!["Only".to_string()];
        assert_eq!(
            ProgressRules::new(10, 5, 2, 0, 5, labels.clone()).unwrap_err(),
            RulesError::InvalidLevelUpThreshold
        );
        assert_eq!(
            ProgressRules::new(10, 5, 2, 50, 0, labels).unwrap_err(),
            RulesError::InvalidQuestionsPerLevelUp
        );
        assert_eq!(
            ProgressRules::new(10, 5, 2, 50, 5, Vec::new()).unwrap_err(),
            RulesError::MissingDifficultyLabels
        );
    }

    #[test]
    fn level_for_uses_floor_division() {
        let rules = ProgressRules::default();
        assert_eq!(rules.level_for(0), 1);
        assert_eq!(rules.level_for(49), 1);
        assert_eq!(rules.level_for(50), 2);
        assert_eq!(rules.level_for(149), 3);
    }

    #[test]
    fn new_progress_starts_at_level_one() {
        let progress = SkillProgress::new();
        assert_eq!(progress.score(), 0);
        assert_eq!(progress.streak(), 0);
        assert_eq!(progress.level(), 1);
        assert_eq!(progress.questions_answered(), 0);
        assert_eq!(progress.difficulty_index(), 0);
        assert_eq!(progress, SkillProgress::default());
    }

    #[test]
    fn persisted_zero_level_is_lifted() {
        let progress = SkillProgress::from_persisted(10, 1, 0, 3, 0);
        assert_eq!(progress.level(), 1);
    }
}
