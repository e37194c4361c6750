use std::collections::HashSet;

use chrono::{DateTime, Utc};
use trail_core::model::{
    AttemptOutcome, CodingExercise, QuestionAttempt, QuestionId, QuizError, QuizQuestion,
    QuizResult, QuizTally, TrailId, VideoId,
};
use trail_core::scoring::{self, POINTS_PER_EXERCISE};

/// The item under the cursor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuizItem<'a> {
    Question {
        question: &'a QuizQuestion,
        attempt: &'a QuestionAttempt,
    },
    Exercise {
        exercise: &'a CodingExercise,
        answer: &'a str,
    },
}

/// A final quiz in progress: multiple choice questions first, then coding
/// exercises, walked with a single cursor.
#[derive(Debug, Clone)]
pub struct FinalQuizSession {
    video_id: VideoId,
    trail_id: Option<TrailId>,
    questions: Vec<QuizQuestion>,
    attempts: Vec<QuestionAttempt>,
    exercises: Vec<CodingExercise>,
    code_answers: Vec<String>,
    cursor: usize,
    finished: bool,
}

impl FinalQuizSession {
    /// # Errors
    ///
    /// Returns `QuizError::Empty` without any items and
    /// `QuizError::DuplicateItem` when two items share an id.
    pub fn new(
        video_id: VideoId,
        trail_id: Option<TrailId>,
        questions: Vec<QuizQuestion>,
        exercises: Vec<CodingExercise>,
    ) -> Result<Self, QuizError> {
        if questions.is_empty() && exercises.is_empty() {
            return Err(QuizError::Empty);
        }

        let mut seen: HashSet<&QuestionId> = HashSet::new();
        for id in questions
            .iter()
            .map(QuizQuestion::id)
            .chain(exercises.iter().map(|ex| &ex.id))
        {
            if !seen.insert(id) {
                return Err(QuizError::DuplicateItem(id.clone()));
            }
        }

        let attempts = vec![QuestionAttempt::default(); questions.len()];
        let code_answers = exercises
            .iter()
            .map(|ex| ex.starter_code.clone().unwrap_or_default())
            .collect();

        Ok(Self {
            video_id,
            trail_id,
            questions,
            attempts,
            exercises,
            code_answers,
            cursor: 0,
            finished: false,
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

    /// Total number of questions and exercises.
    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len() + self.exercises.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Zero-based index of the current item.
    #[must_use]
    pub fn position(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.cursor + 1 >= self.len()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    #[must_use]
    pub fn current(&self) -> Option<QuizItem<'_>> {
        if let Some(question) = self.questions.get(self.cursor) {
            return Some(QuizItem::Question {
                question,
                attempt: &self.attempts[self.cursor],
            });
        }
        let index = self.cursor - self.questions.len();
        self.exercises.get(index).map(|exercise| QuizItem::Exercise {
            exercise,
            answer: &self.code_answers[index],
        })
    }

    fn current_id(&self) -> Option<&QuestionId> {
        match self.current()? {
            QuizItem::Question { question, .. } => Some(question.id()),
            QuizItem::Exercise { exercise, .. } => Some(&exercise.id),
        }
    }

    /// Answer the current multiple choice question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Finished` after [`FinalQuizSession::finish`],
    /// `QuizError::NotAQuestion` on a coding exercise, and
    /// `QuizError::QuestionClosed` once the question is resolved.
    pub fn answer_current(&mut self, selected: usize) -> Result<AttemptOutcome, QuizError> {
        if self.finished {
            return Err(QuizError::Finished);
        }
        match self.questions.get(self.cursor) {
            Some(question) => self.attempts[self.cursor].record(question, selected),
            None => Err(self.not_a_question()),
        }
    }

    fn not_a_question(&self) -> QuizError {
        match self.current_id() {
            Some(id) => QuizError::NotAQuestion(id.clone()),
            None => QuizError::Finished,
        }
    }

    /// Replace the answer of the current coding exercise.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Finished` after finishing and
    /// `QuizError::NotAnExercise` on a multiple choice question.
    pub fn set_code_answer(&mut self, code: impl Into<String>) -> Result<(), QuizError> {
        if self.finished {
            return Err(QuizError::Finished);
        }
        if let Some(question) = self.questions.get(self.cursor) {
            return Err(QuizError::NotAnExercise(question.id().clone()));
        }
        let index = self.cursor - self.questions.len();
        let slot = self.code_answers.get_mut(index).ok_or(QuizError::Finished)?;
        *slot = code.into();
        Ok(())
    }

    /// Questions must be correct or exhausted; exercises never block.
    #[must_use]
    pub fn can_proceed(&self) -> bool {
        match self.current() {
            Some(QuizItem::Question { attempt, .. }) => attempt.is_resolved(),
            Some(QuizItem::Exercise { .. }) => true,
            None => false,
        }
    }

    /// Move to the next item. Returns `false` when already on the last one.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Unresolved` while the current question is open and
    /// `QuizError::Finished` after finishing.
    pub fn advance(&mut self) -> Result<bool, QuizError> {
        if self.finished {
            return Err(QuizError::Finished);
        }
        if !self.can_proceed() {
            return Err(QuizError::Unresolved);
        }
        if self.is_last() {
            return Ok(false);
        }
        self.cursor += 1;
        Ok(true)
    }

    /// Counters as they stand now.
    #[must_use]
    pub fn tally(&self) -> QuizTally {
        let mut tally = QuizTally {
            total_points: scoring::total_points(self.questions.len(), self.exercises.len()),
            total_items: u32::try_from(self.len()).unwrap_or(u32::MAX),
            ..QuizTally::default()
        };

        for attempt in &self.attempts {
            tally.score = tally.score.saturating_add(attempt.points());
            if attempt.correct() {
                match attempt.attempts() {
                    1 => tally.correct_first_try += 1,
                    _ => tally.correct_second_try += 1,
                }
            } else if attempt.exhausted() {
                tally.exhausted += 1;
            }
        }
        for (exercise, answer) in self.exercises.iter().zip(&self.code_answers) {
            if exercise.passes(answer) {
                tally.exercises_passed += 1;
                tally.score = tally.score.saturating_add(POINTS_PER_EXERCISE);
            }
        }
        tally
    }

    /// Grade the quiz and close it.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Finished` when called twice and
    /// `QuizError::Unresolved` while any question is still open.
    pub fn finish(&mut self, completed_at: DateTime<Utc>) -> Result<QuizResult, QuizError> {
        if self.finished {
            return Err(QuizError::Finished);
        }
        if self.attempts.iter().any(|a| !a.is_resolved()) {
            return Err(QuizError::Unresolved);
        }
        let result = QuizResult::new(
            self.video_id.clone(),
            self.trail_id.clone(),
            self.tally(),
            completed_at,
        )?;
        self.finished = true;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trail_core::time::fixed_now;

    fn question(id: &str, correct: usize) -> QuizQuestion {
        QuizQuestion::new(
            QuestionId::new(id).unwrap(),
            "Pick one",
            vec!["a".into(), "b".into(), "c".into()],
            correct,
            "",
        )
        .unwrap()
    }

    fn exercise(id: &str, expected: &str) -> CodingExercise {
        CodingExercise {
            id: QuestionId::new(id).unwrap(),
            title: "Hello".into(),
            description: "Print hello".into(),
            starter_code: Some("fn main() {}".into()),
            expected_output: Some(expected.into()),
        }
    }

    fn session() -> FinalQuizSession {
        FinalQuizSession::new(
            VideoId::new("v1").unwrap(),
            None,
            vec![question("q1", 0), question("q2", 1)],
            vec![exercise("ex1", "Hello")],
        )
        .unwrap()
    }

    #[test]
    fn rejects_empty_and_duplicate_ids() {
        let video = VideoId::new("v1").unwrap();
        assert_eq!(
            FinalQuizSession::new(video.clone(), None, vec![], vec![]).unwrap_err(),
            QuizError::Empty
        );
        let err = FinalQuizSession::new(
            video,
            None,
            vec![question("q1", 0)],
            vec![exercise("q1", "x")],
        )
        .unwrap_err();
        assert!(matches!(err, QuizError::DuplicateItem(_)));
    }

    #[test]
    fn cannot_advance_past_an_open_question() {
        let mut quiz = session();
        assert!(!quiz.can_proceed());
        assert_eq!(quiz.advance().unwrap_err(), QuizError::Unresolved);

        quiz.answer_current(2).unwrap();
        assert!(!quiz.can_proceed());
        quiz.answer_current(1).unwrap();
        assert!(quiz.can_proceed());
        assert!(quiz.advance().unwrap());
        assert_eq!(quiz.position(), 1);
    }

    #[test]
    fn items_reject_the_wrong_kind_of_answer() {
        let mut quiz = session();
        assert!(matches!(
            quiz.set_code_answer("x"),
            Err(QuizError::NotAnExercise(_))
        ));
        quiz.answer_current(0).unwrap();
        quiz.advance().unwrap();
        quiz.answer_current(1).unwrap();
        quiz.advance().unwrap();
        assert!(matches!(
            quiz.answer_current(0),
            Err(QuizError::NotAQuestion(_))
        ));
        assert!(quiz.can_proceed());
        assert!(!quiz.advance().unwrap());
    }

    #[test]
    fn finish_scores_questions_and_exercises() {
        let mut quiz = session();
        quiz.answer_current(0).unwrap();
        quiz.advance().unwrap();
        quiz.answer_current(0).unwrap();
        quiz.answer_current(1).unwrap();
        quiz.advance().unwrap();
        quiz.set_code_answer("println!(\"hello world\")").unwrap();

        let result = quiz.finish(fixed_now()).unwrap();
        assert_eq!(result.score(), 20 + 10 + 50);
        assert_eq!(result.total_points(), 90);
        assert_eq!(result.correct_first_try(), 1);
        assert_eq!(result.correct_second_try(), 1);
        assert_eq!(result.correct_answers(), 2);
        assert_eq!(result.exercises_passed(), 1);
        assert_eq!(result.total_items(), 3);

        assert_eq!(quiz.finish(fixed_now()).unwrap_err(), QuizError::Finished);
    }

    #[test]
    fn finish_requires_every_question_resolved() {
        let mut quiz = session();
        quiz.answer_current(0).unwrap();
        assert_eq!(quiz.finish(fixed_now()).unwrap_err(), QuizError::Unresolved);
    }

    #[test]
    fn exhausted_questions_count_separately() {
        let mut quiz = FinalQuizSession::new(
            VideoId::new("v1").unwrap(),
            None,
            vec![question("q1", 0)],
            vec![],
        )
        .unwrap();
        quiz.answer_current(1).unwrap();
        quiz.answer_current(2).unwrap();
        let result = quiz.finish(fixed_now()).unwrap();
        assert_eq!(result.score(), 0);
        assert_eq!(result.exhausted(), 1);
        assert!(result.percentage().abs() < f64::EPSILON);
    }
}
