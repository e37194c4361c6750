//! Pure scoring rules for the final quiz.

/// Attempts allowed per multiple choice question.
pub const MAX_ATTEMPTS: u32 = 2;

/// Points for a question answered correctly on the first attempt.
pub const POINTS_PER_QUESTION: u32 = 20;

/// Points for a coding exercise whose answer contains the expected output.
pub const POINTS_PER_EXERCISE: u32 = 50;

/// Points awarded for a question given how many attempts were used and
/// whether the last one was correct.
///
/// Full credit on the first try, half credit (rounded down) on the second,
/// nothing otherwise.
#[must_use]
pub fn attempt_points(attempts: u32, correct: bool) -> u32 {
    if !correct {
        return 0;
    }
    match attempts {
        1 => POINTS_PER_QUESTION,
        2 => POINTS_PER_QUESTION / 2,
        _ => 0,
    }
}

/// Whether a free-form coding answer satisfies the expected output.
///
/// Case-insensitive containment after trimming both sides. An empty
/// expectation accepts any answer.
#[must_use]
pub fn exercise_passes(answer: &str, expected: &str) -> bool {
    answer
        .trim()
        .to_lowercase()
        .contains(&expected.trim().to_lowercase())
}

/// Maximum points reachable for a quiz of the given shape.
#[must_use]
pub fn total_points(questions: usize, exercises: usize) -> u32 {
    let questions = u32::try_from(questions).unwrap_or(u32::MAX);
    let exercises = u32::try_from(exercises).unwrap_or(u32::MAX);
    questions
        .saturating_mul(POINTS_PER_QUESTION)
        .saturating_add(exercises.saturating_mul(POINTS_PER_EXERCISE))
}

/// Score as a percentage of `total`, `0.0` for an empty quiz.
#[must_use]
pub fn percentage(score: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    f64::from(score) / f64::from(total) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_try_is_full_credit_second_is_half() {
        assert_eq!(attempt_points(1, true), 20);
        assert_eq!(attempt_points(2, true), 10);
        assert_eq!(attempt_points(2, false), 0);
        assert_eq!(attempt_points(0, false), 0);
        assert_eq!(attempt_points(3, true), 0);
    }

    #[test]
    fn exercise_match_is_case_and_whitespace_insensitive() {
        assert!(exercise_passes("  println!(\"Hello\") => HELLO ", "hello"));
        assert!(!exercise_passes("goodbye", "hello"));
        assert!(exercise_passes("", ""));
    }

    #[test]
    fn totals_and_percentage() {
        assert_eq!(total_points(5, 2), 200);
        assert!((percentage(150, 200) - 75.0).abs() < f64::EPSILON);
        assert!(percentage(0, 0).abs() < f64::EPSILON);
    }
}
