use std::sync::Arc;

use storage::repository::{QuizResultRepository, QuizResultRow};
use tracing::info;
use trail_core::Clock;
use trail_core::model::{QuizResult, VideoId};
use trail_core::progress::{LevelChange, StudentProgress};

use super::session::FinalQuizSession;
use crate::error::QuizFlowError;
use crate::gamification::GamificationService;

/// A graded, stored quiz.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizCompletion {
    pub result: QuizResult,
    pub result_id: i64,
    pub level_change: LevelChange,
}

/// Finalises quiz sessions: grade, persist locally, award XP, and report
/// to gamification.
#[derive(Clone)]
pub struct QuizFlowService {
    clock: Clock,
    results: Arc<dyn QuizResultRepository>,
    gamification: Option<GamificationService>,
}

impl QuizFlowService {
    #[must_use]
    pub fn new(clock: Clock, results: Arc<dyn QuizResultRepository>) -> Self {
        Self {
            clock,
            results,
            gamification: None,
        }
    }

    #[must_use]
    pub fn with_gamification(mut self, gamification: GamificationService) -> Self {
        self.gamification = Some(gamification);
        self
    }

    /// Grade `session`, store the result and award its score as XP.
    ///
    /// # Errors
    ///
    /// Returns `QuizFlowError::Quiz` if the session cannot be finished and
    /// `QuizFlowError::Storage` if the result cannot be stored. XP is only
    /// awarded once the result is stored.
    pub async fn complete(
        &self,
        session: &mut FinalQuizSession,
        progress: &mut StudentProgress,
    ) -> Result<QuizCompletion, QuizFlowError> {
        let result = session.finish(self.clock.now())?;
        let result_id = self.results.append_result(&result).await?;
        let level_change = progress.award(result.score());

        info!(
            video = %result.video_id(),
            score = result.score(),
            total = result.total_points(),
            level = level_change.new_level,
            "quiz completed"
        );

        if let Some(gamification) = &self.gamification {
            gamification
                .update_after_quiz(result.total_items(), result.score(), result.correct_answers())
                .await;
        }

        Ok(QuizCompletion {
            result,
            result_id,
            level_change,
        })
    }

    /// Most recent stored results for a video, newest first.
    ///
    /// # Errors
    ///
    /// Returns `QuizFlowError::Storage` on read failures.
    pub async fn recent_results(
        &self,
        video_id: &VideoId,
        limit: u32,
    ) -> Result<Vec<QuizResultRow>, QuizFlowError> {
        Ok(self.results.list_results(video_id, limit).await?)
    }
}
