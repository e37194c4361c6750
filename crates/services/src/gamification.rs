use std::sync::Arc;

use tracing::warn;
use trail_core::model::StudentId;

use crate::api::GamificationApi;
use crate::api::dto::{GamificationOverview, QuizStatsUpdate};

/// Streaks, missions and XP bookkeeping for one signed-in student.
///
/// Every call is best-effort: backend failures are logged and never reach
/// the caller, so gameplay is not blocked by a flaky dashboard service.
#[derive(Clone)]
pub struct GamificationService {
    api: Arc<dyn GamificationApi>,
    student: StudentId,
}

impl GamificationService {
    #[must_use]
    pub fn new(api: Arc<dyn GamificationApi>, student: StudentId) -> Self {
        Self { api, student }
    }

    #[must_use]
    pub fn student(&self) -> &StudentId {
        &self.student
    }

    /// Current dashboard, or placeholder data when the backend is unavailable.
    pub async fn overview(&self) -> GamificationOverview {
        match self.api.overview(&self.student).await {
            Ok(overview) => overview,
            Err(err) => {
                warn!(student = %self.student, error = %err, "gamification overview unavailable, using fallback");
                GamificationOverview::fallback()
            }
        }
    }

    /// Report a finished quiz. `xp_earned` is the quiz score.
    pub async fn update_after_quiz(&self, questions_answered: u32, xp_earned: u32, correct_answers: u32) {
        let update = QuizStatsUpdate {
            student_id: self.student.to_string(),
            questions_answered,
            xp_earned,
            correct_answers,
        };
        if let Err(err) = self.api.update_stats(&update).await {
            warn!(student = %self.student, error = %err, "failed to update quiz stats");
        }
    }

    pub async fn add_watch_time(&self, seconds: u64) {
        if seconds == 0 {
            return;
        }
        if let Err(err) = self.api.add_watch_time(&self.student, seconds).await {
            warn!(student = %self.student, seconds, error = %err, "failed to add watch time");
        }
    }

    pub async fn complete_code_challenge(&self) {
        if let Err(err) = self.api.complete_code_challenge(&self.student).await {
            warn!(student = %self.student, error = %err, "failed to record code challenge");
        }
    }

    pub async fn reset_streak(&self) {
        if let Err(err) = self.api.reset_streak(&self.student).await {
            warn!(student = %self.student, error = %err, "failed to reset streak");
        }
    }
}
