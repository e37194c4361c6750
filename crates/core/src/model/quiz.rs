use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{QuestionId, TrailId, VideoId};
use crate::scoring::{self, MAX_ATTEMPTS};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("question {id} has no answer options")]
    NoOptions { id: QuestionId },

    #[error("question {id} marks option {index} correct but only has {len} options")]
    CorrectAnswerOutOfRange {
        id: QuestionId,
        index: usize,
        len: usize,
    },

    #[error("question {0} is already resolved")]
    QuestionClosed(QuestionId),

    #[error("unknown quiz item: {0}")]
    UnknownItem(QuestionId),

    #[error("quiz has no questions or exercises")]
    Empty,

    #[error("duplicate quiz item id: {0}")]
    DuplicateItem(QuestionId),

    #[error("{0} is a coding exercise, not a question")]
    NotAQuestion(QuestionId),

    #[error("{0} is a question, not a coding exercise")]
    NotAnExercise(QuestionId),

    #[error("quiz already finished")]
    Finished,

    #[error("current question must be resolved before moving on")]
    Unresolved,

    #[error("score ({score}) exceeds total points ({total})")]
    ScoreOverflow { score: u32, total: u32 },
}

//
// ─── ITEMS ─────────────────────────────────────────────────────────────────────
//

/// Multiple choice question of the final quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    id: QuestionId,
    question: String,
    options: Vec<String>,
    correct_answer: usize,
    explanation: String,
}

impl QuizQuestion {
    /// # Errors
    ///
    /// Returns `QuizError::NoOptions` or `QuizError::CorrectAnswerOutOfRange`
    /// when the options do not admit `correct_answer`.
    pub fn new(
        id: QuestionId,
        question: impl Into<String>,
        options: Vec<String>,
        correct_answer: usize,
        explanation: impl Into<String>,
    ) -> Result<Self, QuizError> {
        if options.is_empty() {
            return Err(QuizError::NoOptions { id });
        }
        if correct_answer >= options.len() {
            return Err(QuizError::CorrectAnswerOutOfRange {
                id,
                index: correct_answer,
                len: options.len(),
            });
        }
        Ok(Self {
            id,
            question: question.into(),
            options,
            correct_answer,
            explanation: explanation.into(),
        })
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> usize {
        self.correct_answer
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }
}

/// Free-form coding exercise graded against an expected output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodingExercise {
    pub id: QuestionId,
    pub title: String,
    pub description: String,
    pub starter_code: Option<String>,
    pub expected_output: Option<String>,
}

impl CodingExercise {
    #[must_use]
    pub fn passes(&self, answer: &str) -> bool {
        scoring::exercise_passes(answer, self.expected_output.as_deref().unwrap_or(""))
    }
}

//
// ─── ATTEMPTS ──────────────────────────────────────────────────────────────────
//

/// Feedback for a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Correct { attempt: u32, points: u32 },
    Retry { attempts_left: u32 },
    Exhausted { correct_answer: usize },
}

/// Per-question attempt state. All fields only move forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuestionAttempt {
    attempts: u32,
    selected: Option<usize>,
    correct: bool,
    exhausted: bool,
}

impl QuestionAttempt {
    /// Record an answer for `question`.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::QuestionClosed` once the question is correct or exhausted.
    pub fn record(
        &mut self,
        question: &QuizQuestion,
        selected: usize,
    ) -> Result<AttemptOutcome, QuizError> {
        if self.is_resolved() {
            return Err(QuizError::QuestionClosed(question.id().clone()));
        }

        self.attempts += 1;
        self.selected = Some(selected);

        if selected == question.correct_answer() {
            self.correct = true;
            return Ok(AttemptOutcome::Correct {
                attempt: self.attempts,
                points: self.points(),
            });
        }

        if self.attempts >= MAX_ATTEMPTS {
            self.exhausted = true;
            return Ok(AttemptOutcome::Exhausted {
                correct_answer: question.correct_answer(),
            });
        }

        Ok(AttemptOutcome::Retry {
            attempts_left: MAX_ATTEMPTS - self.attempts,
        })
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    #[must_use]
    pub fn answered(&self) -> bool {
        self.attempts > 0
    }

    #[must_use]
    pub fn correct(&self) -> bool {
        self.correct
    }

    #[must_use]
    pub fn exhausted(&self) -> bool {
        self.exhausted
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.correct || self.exhausted
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        scoring::attempt_points(self.attempts, self.correct)
    }
}

//
// ─── RESULT ────────────────────────────────────────────────────────────────────
//

/// Final tally of a finished quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    video_id: VideoId,
    trail_id: Option<TrailId>,
    score: u32,
    total_points: u32,
    correct_first_try: u32,
    correct_second_try: u32,
    exhausted: u32,
    exercises_passed: u32,
    total_items: u32,
    completed_at: DateTime<Utc>,
}

/// Counters gathered while grading a quiz.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuizTally {
    pub score: u32,
    pub total_points: u32,
    pub correct_first_try: u32,
    pub correct_second_try: u32,
    pub exhausted: u32,
    pub exercises_passed: u32,
    pub total_items: u32,
}

impl QuizResult {
    /// Build a result, checking that the score fits the total.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::ScoreOverflow` if `tally.score > tally.total_points`.
    pub fn new(
        video_id: VideoId,
        trail_id: Option<TrailId>,
        tally: QuizTally,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, QuizError> {
        if tally.score > tally.total_points {
            return Err(QuizError::ScoreOverflow {
                score: tally.score,
                total: tally.total_points,
            });
        }
        Ok(Self {
            video_id,
            trail_id,
            score: tally.score,
            total_points: tally.total_points,
            correct_first_try: tally.correct_first_try,
            correct_second_try: tally.correct_second_try,
            exhausted: tally.exhausted,
            exercises_passed: tally.exercises_passed,
            total_items: tally.total_items,
            completed_at,
        })
    }

    #[must_use]
    pub fn video_id(&self) -> &VideoId {
        &self.video_id
    }

    #[must_use]
    pub fn trail_id(&self) -> Option<&TrailId> {
        self.trail_id.as_ref()
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_points(&self) -> u32 {
        self.total_points
    }

    #[must_use]
    pub fn correct_first_try(&self) -> u32 {
        self.correct_first_try
    }

    #[must_use]
    pub fn correct_second_try(&self) -> u32 {
        self.correct_second_try
    }

    #[must_use]
    pub fn exhausted(&self) -> u32 {
        self.exhausted
    }

    #[must_use]
    pub fn exercises_passed(&self) -> u32 {
        self.exercises_passed
    }

    /// Multiple choice questions answered correctly on any attempt.
    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_first_try + self.correct_second_try
    }

    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.total_items
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn percentage(&self) -> f64 {
        scoring::percentage(self.score, self.total_points)
    }

    #[must_use]
    pub fn tally(&self) -> QuizTally {
        QuizTally {
            score: self.score,
            total_points: self.total_points,
            correct_first_try: self.correct_first_try,
            correct_second_try: self.correct_second_try,
            exhausted: self.exhausted,
            exercises_passed: self.exercises_passed,
            total_items: self.total_items,
        }
    }
}
