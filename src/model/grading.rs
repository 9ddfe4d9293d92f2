//! Answer grading and the one-correct-option rule for questions.

use std::collections::HashSet;
use std::hash::Hash;

use crate::model::{DatabaseError, DatabaseResult, ResourceType};

/// Exact, case-sensitive comparison. Whitespace is significant.
pub fn grade(submitted: &str, correct_text: &str) -> bool {
    submitted == correct_text
}

/// A question must carry at least one option and exactly one of them must be
/// flagged correct.
pub fn ensure_single_correct<I>(flags: I) -> DatabaseResult<()>
where
    I: IntoIterator<Item = bool>,
{
    let (total, correct) = flags
        .into_iter()
        .fold((0usize, 0usize), |(total, correct), flag| {
            (total + 1, correct + usize::from(flag))
        });

    if total == 0 {
        return Err(DatabaseError::invariant(
            ResourceType::Question,
            "a question needs at least one option",
        ));
    }

    match correct {
        1 => Ok(()),
        0 => Err(DatabaseError::invariant(
            ResourceType::Question,
            "exactly one option must be marked correct, none is",
        )),
        n => Err(DatabaseError::invariant(
            ResourceType::Question,
            format!("exactly one option must be marked correct, {n} are"),
        )),
    }
}

/// Each existing option may be listed once in a replacement set.
pub fn ensure_distinct_options<I, T>(ids: I) -> DatabaseResult<()>
where
    I: IntoIterator<Item = T>,
    T: Eq + Hash,
{
    let mut seen = HashSet::new();
    if ids.into_iter().all(|id| seen.insert(id)) {
        Ok(())
    } else {
        Err(DatabaseError::invariant(
            ResourceType::QuestionOption,
            "an option is listed more than once",
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn grading_is_exact() {
        assert!(grade("Paris", "Paris"));
        assert!(!grade("Paris ", "Paris"));
        assert!(!grade(" Paris", "Paris"));
        assert!(!grade("paris", "Paris"));
        assert!(!grade("", "Paris"));
    }

    #[test]
    fn single_correct_accepted() {
        assert!(ensure_single_correct([false, true, false]).is_ok());
        assert!(ensure_single_correct([true]).is_ok());
    }

    #[test]
    fn no_options_rejected() {
        let err = ensure_single_correct(Vec::<bool>::new()).unwrap_err();
        assert!(matches!(err, DatabaseError::Invariant { .. }));
    }

    #[test]
    fn zero_or_many_correct_rejected() {
        assert!(matches!(
            ensure_single_correct([false, false]),
            Err(DatabaseError::Invariant { .. })
        ));

        let err = ensure_single_correct([true, false, true]).unwrap_err();
        assert!(err.to_string().contains("2 are"));
    }

    #[test]
    fn repeated_option_ids_rejected() {
        assert!(ensure_distinct_options([1, 2, 3]).is_ok());
        assert!(ensure_distinct_options(Vec::<u8>::new()).is_ok());
        assert!(matches!(
            ensure_distinct_options([1, 2, 1]),
            Err(DatabaseError::Invariant { .. })
        ));
    }
}
