//! Score, streak, level and difficulty rules for graded answers.

use crate::model::{GradeStatus, ProgressRules, SkillProgress};

/// Result of applying one grade to a skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradeApplied {
    pub progress: SkillProgress,
    pub points_earned: u32,
    /// Set when the recomputed level exceeds the previous one. Only drives a
    /// transient UI cue.
    pub leveled_up: bool,
}

/// Apply a graded answer to one skill's progress.
///
/// The streak bonus is computed from the streak *before* this answer, so the
/// first correct answer of a run earns no bonus. Difficulty steps up by at most
/// one, only on a scoring answer that lands on a multiple of
/// `questions_per_level_up`, and never past the last label.
///
/// # Examples
///
/// ```
/// # use tutor_core::model::{GradeStatus, ProgressRules, SkillProgress};
/// # use tutor_core::tracker::apply_grade;
/// let rules = ProgressRules::default();
/// let start = SkillProgress::from_persisted(0, 0, 1, 4, 0);
/// let applied = apply_grade(&start, GradeStatus::Correct, &rules);
///
/// assert_eq!(applied.points_earned, 10);
/// assert_eq!(applied.progress.questions_answered(), 5);
/// assert_eq!(applied.progress.difficulty_index(), 1);
/// ```
#[must_use]
pub fn apply_grade(
    progress: &SkillProgress,
    status: GradeStatus,
    rules: &ProgressRules,
) -> GradeApplied {
    let mut next = *progress;

    let points_earned = match status {
        GradeStatus::Correct => {
            let bonus = progress
                .streak
                .saturating_mul(rules.streak_bonus_multiplier());
            next.streak = progress.streak.saturating_add(1);
            rules.points_correct().saturating_add(bonus)
        }
        GradeStatus::PartiallyCorrect => {
            next.streak = 0;
            rules.points_partial()
        }
        GradeStatus::Incorrect | GradeStatus::Unclear => {
            next.streak = 0;
            0
        }
    };

    next.score = next.score.saturating_add(points_earned);
    next.questions_answered = next.questions_answered.saturating_add(1);

    if next.questions_answered % rules.questions_per_level_up() == 0
        && points_earned > 0
        && next.difficulty_index < rules.max_difficulty_index()
    {
        next.difficulty_index += 1;
    }

    let new_level = rules.level_for(next.score);
    let leveled_up = new_level > next.level;
    if leveled_up {
        next.level = new_level;
    }

    GradeApplied {
        progress: next,
        points_earned,
        leveled_up,
    }
}

/// Points for a combined-review answer. No streak is kept there.
#[must_use]
pub fn review_points(status: GradeStatus, rules: &ProgressRules) -> u32 {
    match status {
        GradeStatus::Correct => rules.points_correct(),
        GradeStatus::PartiallyCorrect => rules.points_partial(),
        GradeStatus::Incorrect | GradeStatus::Unclear => 0,
    }
}

/// Re-establish the level/difficulty invariants on progress read from disk.
#[must_use]
pub fn normalize(progress: &SkillProgress, rules: &ProgressRules) -> SkillProgress {
    let mut next = *progress;
    next.level = rules.level_for(next.score);
    next.difficulty_index = next.difficulty_index.min(rules.max_difficulty_index());
    next
}

/// Difficulty label for a skill's current index.
#[must_use]
pub fn difficulty_label<'a>(progress: &SkillProgress, rules: &'a ProgressRules) -> &'a str {
    let labels = rules.difficulty_labels();
    let index = usize::try_from(progress.difficulty_index)
        .unwrap_or(usize::MAX)
        .min(labels.len().saturating_sub(1));
    labels.get(index).map_or("", String::as_str)
}

/// Percent of the way from the current level to the next one.
#[must_use]
pub fn level_progress_percent(progress: &SkillProgress, rules: &ProgressRules) -> u8 {
    let into_level = progress.score % rules.level_up_threshold();
    let percent = u64::from(into_level) * 100 / u64::from(rules.level_up_threshold());
    u8::try_from(percent).unwrap_or(100)
}

/// Sum of scores across skills.
pub fn total_score<'a>(progress: impl IntoIterator<Item = &'a SkillProgress>) -> u64 {
    progress.into_iter().map(|p| u64::from(p.score)).sum()
}

/// Highest level reached by any skill, or 1 when there are none.
pub fn highest_level<'a>(progress: impl IntoIterator<Item = &'a SkillProgress>) -> u32 {
    progress.into_iter().map(|p| p.level).max().unwrap_or(1)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> ProgressRules {
        ProgressRules::default()
    }

    #[test]
    fn correct_answer_at_fifth_question_steps_difficulty() {
        let start = SkillProgress::from_persisted(0, 0, 1, 4, 0);
        let applied = apply_grade(&start, GradeStatus::Correct, &rules());

        assert_eq!(applied.points_earned, 10);
        assert_eq!(applied.progress.score(), 10);
        assert_eq!(applied.progress.streak(), 1);
        assert_eq!(applied.progress.questions_answered(), 5);
        assert_eq!(applied.progress.level(), 1);
        assert_eq!(applied.progress.difficulty_index(), 1);
        assert!(!applied.leveled_up);
    }

    #[test]
    fn streak_bonus_uses_streak_before_increment() {
        let rules = rules();
        let mut progress = SkillProgress::new();
        for n in 1..=6_u32 {
            let applied = apply_grade(&progress, GradeStatus::Correct, &rules);
            assert_eq!(applied.progress.streak(), n);
            assert_eq!(
                applied.points_earned,
                rules.points_correct() + (n - 1) * rules.streak_bonus_multiplier()
            );
            progress = applied.progress;
        }
    }

    #[test]
    fn partial_scores_and_resets_streak() {
        let start = SkillProgress::from_persisted(20, 3, 1, 2, 0);
        let applied = apply_grade(&start, GradeStatus::PartiallyCorrect, &rules());
        assert_eq!(applied.points_earned, 5);
        assert_eq!(applied.progress.score(), 25);
        assert_eq!(applied.progress.streak(), 0);
        assert_eq!(applied.progress.questions_answered(), 3);
    }

    #[test]
    fn unclear_counts_as_incorrect() {
        let start = SkillProgress::from_persisted(20, 3, 1, 2, 0);
        let unclear = apply_grade(&start, GradeStatus::Unclear, &rules());
        let incorrect = apply_grade(&start, GradeStatus::Incorrect, &rules());
        assert_eq!(unclear, incorrect);
        assert_eq!(unclear.points_earned, 0);
        assert_eq!(unclear.progress.streak(), 0);
        assert_eq!(unclear.progress.score(), 20);
        assert_eq!(unclear.progress.questions_answered(), 3);
    }

    #[test]
    fn non_scoring_answer_on_boundary_keeps_difficulty() {
        let start = SkillProgress::from_persisted(0, 0, 1, 4, 0);
        let applied = apply_grade(&start, GradeStatus::Incorrect, &rules());
        assert_eq!(applied.progress.questions_answered(), 5);
        assert_eq!(applied.progress.difficulty_index(), 0);
    }

    #[test]
    fn difficulty_caps_at_last_label() {
        let start = SkillProgress::from_persisted(0, 0, 1, 9, 2);
        let applied = apply_grade(&start, GradeStatus::Correct, &rules());
        assert_eq!(applied.progress.difficulty_index(), 2);
    }

    #[test]
    fn crossing_threshold_reports_level_up() {
        let start = SkillProgress::from_persisted(45, 0, 1, 1, 0);
        let applied = apply_grade(&start, GradeStatus::Correct, &rules());
        assert_eq!(applied.progress.score(), 55);
        assert_eq!(applied.progress.level(), 2);
        assert!(applied.leveled_up);

        let again = apply_grade(&applied.progress, GradeStatus::Incorrect, &rules());
        assert!(!again.leveled_up);
        assert_eq!(again.progress.level(), 2);
    }

    #[test]
    fn invariants_hold_over_long_mixed_sequence() {
        let rules = rules();
        let pattern = [
            GradeStatus::Correct,
            GradeStatus::Correct,
            GradeStatus::PartiallyCorrect,
            GradeStatus::Correct,
            GradeStatus::Unclear,
            GradeStatus::Correct,
            GradeStatus::Correct,
            GradeStatus::Correct,
            GradeStatus::Incorrect,
        ];

        let mut progress = SkillProgress::new();
        let mut last_difficulty = 0;
        for step in 0..500 {
            let status = pattern[(step * 7 + step / 3) % pattern.len()];
            let before = progress;
            let applied = apply_grade(&progress, status, &rules);
            progress = applied.progress;

            assert_eq!(progress.level(), rules.level_for(progress.score()));
            assert!(progress.difficulty_index() >= last_difficulty);
            assert!(progress.difficulty_index() - last_difficulty <= 1);
            assert!(progress.difficulty_index() <= rules.max_difficulty_index());
            if !status.continues_streak() {
                assert_eq!(progress.streak(), 0);
            } else {
                assert_eq!(progress.streak(), before.streak() + 1);
            }
            last_difficulty = progress.difficulty_index();
        }
        assert_eq!(progress.questions_answered(), 500);
    }

    #[test]
    fn review_points_have_no_bonus() {
        let rules = rules();
        assert_eq!(review_points(GradeStatus::Correct, &rules), 10);
        assert_eq!(review_points(GradeStatus::PartiallyCorrect, &rules), 5);
        assert_eq!(review_points(GradeStatus::Incorrect, &rules), 0);
        assert_eq!(review_points(GradeStatus::Unclear, &rules), 0);
    }

    #[test]
    fn normalize_recomputes_level_and_clamps_difficulty() {
        let loaded = SkillProgress::from_persisted(120, 1, 9, 30, 7);
        let fixed = normalize(&loaded, &rules());
        assert_eq!(fixed.level(), 3);
        assert_eq!(fixed.difficulty_index(), 2);
        assert_eq!(fixed.score(), 120);
    }

    #[test]
    fn labels_and_aggregates() {
        let rules = rules();
        let a = SkillProgress::from_persisted(75, 0, 2, 10, 1);
        let b = SkillProgress::from_persisted(10, 0, 1, 2, 0);

        assert_eq!(difficulty_label(&a, &rules), "Medium");
        assert_eq!(difficulty_label(&b, &rules), "Easy");
        assert_eq!(level_progress_percent(&a, &rules), 50);
        assert_eq!(total_score([&a, &b]), 85);
        assert_eq!(highest_level([&a, &b]), 2);
        assert_eq!(highest_level(std::iter::empty::<&SkillProgress>()), 1);
    }
}
