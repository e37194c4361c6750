use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::CheckpointId;

/// Half-width of the playback window, in seconds, around a checkpoint timestamp.
pub const TRIGGER_WINDOW_SECONDS: f64 = 1.5;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum CheckpointError {
    #[error("checkpoint {id} has no answer options")]
    NoOptions { id: CheckpointId },

    #[error("checkpoint {id} marks option {index} correct but only has {len} options")]
    CorrectAnswerOutOfRange {
        id: CheckpointId,
        index: usize,
        len: usize,
    },

    #[error("checkpoint {id} has an invalid timestamp: {value}")]
    InvalidTimestamp { id: CheckpointId, value: f64 },

    #[error("checkpoint {id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        id: CheckpointId,
        from: CheckpointPhase,
        to: CheckpointPhase,
    },
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A timestamp-triggered multiple choice question.
///
/// Instances are immutable once validated; construct through [`CheckpointQuestion::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointQuestion {
    id: CheckpointId,
    question: String,
    options: Vec<String>,
    correct_answer: usize,
    timestamp_seconds: f64,
    explanation: Option<String>,
}

impl CheckpointQuestion {
    /// Validate and build a checkpoint question.
    ///
    /// # Errors
    ///
    /// Returns `CheckpointError::NoOptions` when `options` is empty,
    /// `CheckpointError::CorrectAnswerOutOfRange` when `correct_answer` is not a valid index,
    /// and `CheckpointError::InvalidTimestamp` for negative or non-finite timestamps.
    pub fn new(
        id: CheckpointId,
        question: impl Into<String>,
        options: Vec<String>,
        correct_answer: usize,
        timestamp_seconds: f64,
        explanation: Option<String>,
    ) -> Result<Self, CheckpointError> {
        if options.is_empty() {
            return Err(CheckpointError::NoOptions { id });
        }
        if correct_answer >= options.len() {
            return Err(CheckpointError::CorrectAnswerOutOfRange {
                id,
                index: correct_answer,
                len: options.len(),
            });
        }
        if !timestamp_seconds.is_finite() || timestamp_seconds < 0.0 {
            return Err(CheckpointError::InvalidTimestamp {
                id,
                value: timestamp_seconds,
            });
        }

        let explanation = explanation.filter(|text| !text.trim().is_empty());

        Ok(Self {
            id,
            question: question.into(),
            options,
            correct_answer,
            timestamp_seconds,
            explanation,
        })
    }

    #[must_use]
    pub fn id(&self) -> &CheckpointId {
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
    pub fn timestamp_seconds(&self) -> f64 {
        self.timestamp_seconds
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    /// Whether `selected` is the correct option index.
    #[must_use]
    pub fn is_correct(&self, selected: usize) -> bool {
        selected == self.correct_answer
    }

    /// Whether playback position `seconds` falls strictly inside the trigger window.
    #[must_use]
    pub fn in_trigger_window(&self, seconds: f64) -> bool {
        (seconds - self.timestamp_seconds).abs() < TRIGGER_WINDOW_SECONDS
    }
}

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// Lifecycle of a single checkpoint within one viewing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointPhase {
    Pending,
    Active,
    Answered,
    Skipped,
}

impl CheckpointPhase {
    /// `Answered` and `Skipped` are final for the session.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, CheckpointPhase::Answered | CheckpointPhase::Skipped)
    }

    /// Validate a transition for checkpoint `id`.
    ///
    /// # Errors
    ///
    /// Returns `CheckpointError::InvalidTransition` unless the move is
    /// `Pending -> Active` or `Active -> Answered | Skipped`.
    pub fn transition(
        self,
        id: &CheckpointId,
        to: CheckpointPhase,
    ) -> Result<CheckpointPhase, CheckpointError> {
        match (self, to) {
            (CheckpointPhase::Pending, CheckpointPhase::Active)
            | (CheckpointPhase::Active, CheckpointPhase::Answered | CheckpointPhase::Skipped) => {
                Ok(to)
            }
            _ => Err(CheckpointError::InvalidTransition {
                id: id.clone(),
                from: self,
                to,
            }),
        }
    }
}

//
// ─── SCORE STATE ───────────────────────────────────────────────────────────────
//

/// Aggregate counters for one viewing session.
///
/// `score_impact` is a signed percentage delta owned by the backend; it is only
/// ever overwritten with a value the backend reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointScoreState {
    pub answered: u32,
    pub skipped: u32,
    pub correct: u32,
    pub score_impact: f64,
}

impl CheckpointScoreState {
    pub fn record_answer(&mut self, is_correct: bool) {
        self.answered = self.answered.saturating_add(1);
        if is_correct {
            self.correct = self.correct.saturating_add(1);
        }
    }

    pub fn record_skip(&mut self) {
        self.skipped = self.skipped.saturating_add(1);
    }

    /// Adopt a backend-reported impact, if any.
    pub fn apply_impact(&mut self, impact: Option<f64>) {
        if let Some(value) = impact.filter(|v| v.is_finite()) {
            self.score_impact = value;
        }
    }

    /// Number of checkpoints resolved either way.
    #[must_use]
    pub fn resolved(&self) -> u32 {
        self.answered.saturating_add(self.skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cp(ts: f64) -> CheckpointQuestion {
        CheckpointQuestion::new(
            CheckpointId::new("c1").unwrap(),
            "What is a trait?",
            vec!["A type".into(), "A shared behaviour".into()],
            1,
            ts,
            Some("Traits define shared behaviour.".into()),
        )
        .unwrap()
    }

    #[test]
    fn rejects_out_of_range_correct_answer() {
        let err = CheckpointQuestion::new(
            CheckpointId::new("c1").unwrap(),
            "Q",
            vec!["only".into()],
            1,
            5.0,
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CheckpointError::CorrectAnswerOutOfRange { index: 1, len: 1, .. }
        ));
    }

    #[test]
    fn rejects_empty_options_and_bad_timestamps() {
        let id = CheckpointId::new("c1").unwrap();
        assert!(matches!(
            CheckpointQuestion::new(id.clone(), "Q", vec![], 0, 5.0, None),
            Err(CheckpointError::NoOptions { .. })
        ));
        assert!(matches!(
            CheckpointQuestion::new(id.clone(), "Q", vec!["a".into()], 0, -1.0, None),
            Err(CheckpointError::InvalidTimestamp { .. })
        ));
        assert!(matches!(
            CheckpointQuestion::new(id, "Q", vec!["a".into()], 0, f64::NAN, None),
            Err(CheckpointError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn blank_explanation_is_dropped() {
        let q = CheckpointQuestion::new(
            CheckpointId::new("c1").unwrap(),
            "Q",
            vec!["a".into()],
            0,
            1.0,
            Some("   ".into()),
        )
        .unwrap();
        assert_eq!(q.explanation(), None);
    }

    #[test]
    fn trigger_window_is_strict() {
        let q = cp(10.0);
        assert!(q.in_trigger_window(8.6));
        assert!(q.in_trigger_window(11.4));
        assert!(!q.in_trigger_window(8.5));
        assert!(!q.in_trigger_window(11.5));
    }

    #[test]
    fn phase_transitions_are_one_way() {
        let id = CheckpointId::new("c1").unwrap();
        let active = CheckpointPhase::Pending
            .transition(&id, CheckpointPhase::Active)
            .unwrap();
        let answered = active.transition(&id, CheckpointPhase::Answered).unwrap();
        assert!(answered.is_terminal());
        assert!(answered.transition(&id, CheckpointPhase::Active).is_err());
        assert!(CheckpointPhase::Pending
            .transition(&id, CheckpointPhase::Skipped)
            .is_err());
    }

    #[test]
    fn score_state_only_takes_reported_impact() {
        let mut score = CheckpointScoreState::default();
        score.record_answer(true);
        score.apply_impact(Some(5.0));
        score.record_skip();
        score.apply_impact(None);

        assert_eq!(score.answered, 1);
        assert_eq!(score.correct, 1);
        assert_eq!(score.skipped, 1);
        assert_eq!(score.resolved(), 2);
        assert!((score.score_impact - 5.0).abs() < f64::EPSILON);
    }
}
