use trail_core::model::{CheckpointOutcome, TrailId, VideoId};

use super::{
    SqliteRepository,
    mapping::{kind_columns, map_outcome_row},
};
use crate::repository::{OutcomeJournal, OutcomeRow, StorageError};

#[async_trait::async_trait]
impl OutcomeJournal for SqliteRepository {
    async fn append_outcome(&self, outcome: &CheckpointOutcome) -> Result<i64, StorageError> {
        let (kind, selected, is_correct) = kind_columns(outcome.kind)?;

        let res = sqlx::query(
            r"
                INSERT INTO checkpoint_outcomes (
                    checkpoint_id, video_id, trail_id, kind,
                    selected_answer, is_correct, recorded_at, synced, score_impact
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(outcome.checkpoint_id.as_str())
        .bind(outcome.video_id.as_str())
        .bind(outcome.trail_id.as_ref().map(TrailId::as_str))
        .bind(kind)
        .bind(selected)
        .bind(is_correct)
        .bind(outcome.recorded_at)
        .bind(i64::from(outcome.synced))
        .bind(outcome.score_impact)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }

    async fn outcomes_for_video(
        &self,
        video_id: &VideoId,
        trail_id: Option<&TrailId>,
    ) -> Result<Vec<OutcomeRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, checkpoint_id, video_id, trail_id, kind,
                    selected_answer, is_correct, recorded_at, synced, score_impact
                FROM checkpoint_outcomes
                WHERE video_id = ?1 AND trail_id IS ?2
                ORDER BY recorded_at ASC, id ASC
            ",
        )
        .bind(video_id.as_str())
        .bind(trail_id.map(TrailId::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_outcome_row(&row)?);
        }
        Ok(out)
    }

    async fn unsynced_outcomes(&self, limit: u32) -> Result<Vec<OutcomeRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, checkpoint_id, video_id, trail_id, kind,
                    selected_answer, is_correct, recorded_at, synced, score_impact
                FROM checkpoint_outcomes
                WHERE synced = 0
                ORDER BY recorded_at ASC, id ASC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_outcome_row(&row)?);
        }
        Ok(out)
    }
}
