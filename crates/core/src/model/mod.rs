mod checkpoint;
mod ids;
mod outcome;
mod quiz;

pub use checkpoint::{
    CheckpointError, CheckpointPhase, CheckpointQuestion, CheckpointScoreState,
    TRIGGER_WINDOW_SECONDS,
};
pub use ids::{CheckpointId, IdError, QuestionId, StudentId, TrailId, VideoId};
pub use outcome::{CheckpointOutcome, OutcomeKind};
pub use quiz::{
    AttemptOutcome, CodingExercise, QuestionAttempt, QuizError, QuizQuestion, QuizResult,
    QuizTally,
};
