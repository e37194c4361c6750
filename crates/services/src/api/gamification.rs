use async_trait::async_trait;
use serde::Serialize;
use trail_core::model::StudentId;

use super::client::{ApiClient, NO_QUERY};
use super::dto::{GamificationOverview, QuizStatsUpdate};
use crate::error::ApiError;

/// Backend routes for streaks, missions and achievements.
#[async_trait]
pub trait GamificationApi: Send + Sync {
    /// # Errors
    ///
    /// Returns `ApiError` on request failure.
    async fn overview(&self, student: &StudentId) -> Result<GamificationOverview, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` on request failure.
    async fn update_stats(&self, update: &QuizStatsUpdate) -> Result<(), ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` on request failure.
    async fn add_watch_time(&self, student: &StudentId, seconds: u64) -> Result<(), ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` on request failure.
    async fn complete_code_challenge(&self, student: &StudentId) -> Result<(), ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` on request failure.
    async fn reset_streak(&self, student: &StudentId) -> Result<(), ApiError>;
}

#[derive(Clone, Debug)]
pub struct HttpGamificationApi {
    api: ApiClient,
}

impl HttpGamificationApi {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

const BASE: &str = "/gamification/gamification";

#[derive(Serialize)]
struct StudentQuery<'a> {
    student_id: &'a str,
}

#[derive(Serialize)]
struct WatchTimeQuery<'a> {
    student_id: &'a str,
    seconds: u64,
}

#[async_trait]
impl GamificationApi for HttpGamificationApi {
    async fn overview(&self, student: &StudentId) -> Result<GamificationOverview, ApiError> {
        let path = format!("{BASE}/{student}");
        self.api.get_json(&path, NO_QUERY).await
    }

    async fn update_stats(&self, update: &QuizStatsUpdate) -> Result<(), ApiError> {
        let _: serde_json::Value = self.api.post_json(&format!("{BASE}/update"), update).await?;
        Ok(())
    }

    async fn add_watch_time(&self, student: &StudentId, seconds: u64) -> Result<(), ApiError> {
        let query = WatchTimeQuery {
            student_id: student.as_str(),
            seconds,
        };
        self.api
            .post_query(&format!("{BASE}/add-watch-time"), &query)
            .await
    }

    async fn complete_code_challenge(&self, student: &StudentId) -> Result<(), ApiError> {
        let query = StudentQuery {
            student_id: student.as_str(),
        };
        self.api
            .post_query(&format!("{BASE}/complete-code-challenge"), &query)
            .await
    }

    async fn reset_streak(&self, student: &StudentId) -> Result<(), ApiError> {
        let query = StudentQuery {
            student_id: student.as_str(),
        };
        self.api
            .post_query(&format!("{BASE}/reset-streak"), &query)
            .await
    }
}
