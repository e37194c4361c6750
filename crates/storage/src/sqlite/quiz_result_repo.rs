use trail_core::model::{QuizResult, TrailId, VideoId};

use super::{
    SqliteRepository,
    mapping::{map_quiz_result, map_quiz_result_row},
};
use crate::repository::{QuizResultRepository, QuizResultRow, StorageError};

#[async_trait::async_trait]
impl QuizResultRepository for SqliteRepository {
    async fn append_result(&self, result: &QuizResult) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO quiz_results (
                    video_id, trail_id, score, total_points,
                    correct_first_try, correct_second_try, exhausted,
                    exercises_passed, total_items, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(result.video_id().as_str())
        .bind(result.trail_id().map(TrailId::as_str))
        .bind(i64::from(result.score()))
        .bind(i64::from(result.total_points()))
        .bind(i64::from(result.correct_first_try()))
        .bind(i64::from(result.correct_second_try()))
        .bind(i64::from(result.exhausted()))
        .bind(i64::from(result.exercises_passed()))
        .bind(i64::from(result.total_items()))
        .bind(result.completed_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }

    async fn get_result(&self, id: i64) -> Result<QuizResult, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    video_id, trail_id, score, total_points,
                    correct_first_try, correct_second_try, exhausted,
                    exercises_passed, total_items, completed_at
                FROM quiz_results
                WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_quiz_result(&row)
    }

    async fn list_results(
        &self,
        video_id: &VideoId,
        limit: u32,
    ) -> Result<Vec<QuizResultRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, video_id, trail_id, score, total_points,
                    correct_first_try, correct_second_try, exhausted,
                    exercises_passed, total_items, completed_at
                FROM quiz_results
                WHERE video_id = ?1
                ORDER BY completed_at DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(video_id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_quiz_result_row(&row)?);
        }
        Ok(out)
    }
}
