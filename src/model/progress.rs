//! Progress arithmetic and the per-section completion state machine.
//!
//! A `(user, section)` pair is *not started* while no progress row exists,
//! *in progress* while the row is not completed and *completed* once every
//! question of the section has been attempted. Only an explicit reset moves a
//! completed row back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Answer counts of one user within one section. Answers are counted per
/// distinct question, so repeated submissions to the same question do not
/// inflate either number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct SectionCounts {
    pub total: i64,
    pub answered: i64,
    pub correct: i64,
}

impl SectionCounts {
    pub fn new(total: i64, answered: i64, correct: i64) -> Self {
        Self {
            total,
            answered,
            correct,
        }
    }

    pub fn percentage(&self) -> f64 {
        percentage(self.correct, self.total)
    }

    /// Completion follows attempts, not correctness.
    pub fn all_attempted(&self) -> bool {
        self.total > 0 && self.answered >= self.total
    }
}

/// `correct / total * 100`, or `0` for an empty section.
pub fn percentage(correct: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    correct as f64 / total as f64 * 100.0
}

/// Arithmetic mean, `0` for no values.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    pub progress: f64,
    pub is_completed: bool,
    pub completion_date: Option<DateTime<Utc>>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::reset()
    }
}

impl ProgressState {
    pub fn reset() -> Self {
        Self {
            progress: 0.0,
            is_completed: false,
            completion_date: None,
        }
    }

    /// Applies fresh counts. `completion_date` is stamped with `now` only on
    /// the transition into completed.
    pub fn recomputed(&self, counts: SectionCounts, now: DateTime<Utc>) -> Self {
        let mut next = *self;
        next.progress = counts.percentage();

        if counts.all_attempted() && !self.is_completed {
            next.is_completed = true;
            next.completion_date = Some(now);
        }

        next
    }
}

#[cfg(test)]
mod test {
    use chrono::Duration;

    use super::*;

    #[test]
    fn percentage_of_section() {
        assert_eq!(percentage(1, 2), 50.0);
        assert_eq!(percentage(2, 2), 100.0);
        assert_eq!(percentage(0, 3), 0.0);
        assert!((percentage(1, 3) - 33.333_333).abs() < 1e-4);
    }

    #[test]
    fn empty_section_is_zero() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(SectionCounts::new(0, 0, 0).percentage(), 0.0);
        assert!(!SectionCounts::new(0, 0, 0).all_attempted());
    }

    #[test]
    fn mean_of_sections() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[50.0]), 50.0);
        assert_eq!(mean(&[100.0, 50.0, 0.0]), 50.0);
    }

    #[test]
    fn completes_on_exact_call() {
        let now = Utc::now();
        let state = ProgressState::reset();

        let half = state.recomputed(SectionCounts::new(2, 1, 1), now);
        assert_eq!(half.progress, 50.0);
        assert!(!half.is_completed);
        assert!(half.completion_date.is_none());

        let full = half.recomputed(SectionCounts::new(2, 2, 2), now);
        assert_eq!(full.progress, 100.0);
        assert!(full.is_completed);
        assert_eq!(full.completion_date, Some(now));
    }

    #[test]
    fn completion_follows_attempts_not_correctness() {
        let state = ProgressState::reset().recomputed(SectionCounts::new(2, 2, 0), Utc::now());
        assert_eq!(state.progress, 0.0);
        assert!(state.is_completed);
        assert!(state.completion_date.is_some());
    }

    #[test]
    fn recompute_is_idempotent() {
        let first_at = Utc::now();
        let counts = SectionCounts::new(2, 2, 2);

        let once = ProgressState::reset().recomputed(counts, first_at);
        let twice = once.recomputed(counts, first_at + Duration::minutes(5));

        assert_eq!(once, twice);
        assert_eq!(twice.completion_date, Some(first_at));
    }

    #[test]
    fn recompute_never_uncompletes() {
        let done = ProgressState::reset().recomputed(SectionCounts::new(2, 2, 1), Utc::now());

        // a question was added to the section afterwards
        let later = done.recomputed(SectionCounts::new(3, 2, 1), Utc::now());
        assert!(later.is_completed);
        assert_eq!(later.completion_date, done.completion_date);
        assert!((later.progress - 33.333_333).abs() < 1e-4);
    }

    #[test]
    fn reset_then_complete_again() {
        let counts = SectionCounts::new(1, 1, 1);
        let done = ProgressState::reset().recomputed(counts, Utc::now());

        let reset = ProgressState::reset();
        assert_eq!(reset.progress, 0.0);
        assert!(!reset.is_completed);
        assert!(reset.completion_date.is_none());

        let again_at = Utc::now() + Duration::hours(1);
        let again = reset.recomputed(counts, again_at);
        assert!(again.is_completed);
        assert_eq!(again.completion_date, Some(again_at));
        assert_ne!(again.completion_date, done.completion_date);
    }
}
