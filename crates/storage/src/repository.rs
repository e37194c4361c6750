use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use trail_core::model::{CheckpointOutcome, QuizResult, TrailId, VideoId};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A journal entry together with its storage id.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeRow {
    pub id: i64,
    pub outcome: CheckpointOutcome,
}

/// A stored quiz result together with its storage id.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizResultRow {
    pub id: i64,
    pub result: QuizResult,
}

/// Append-only local journal of resolved checkpoints.
#[async_trait]
pub trait OutcomeJournal: Send + Sync {
    /// Append an outcome and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the outcome cannot be stored.
    async fn append_outcome(&self, outcome: &CheckpointOutcome) -> Result<i64, StorageError>;

    /// Outcomes for a video (optionally within a trail), oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failures.
    async fn outcomes_for_video(
        &self,
        video_id: &VideoId,
        trail_id: Option<&TrailId>,
    ) -> Result<Vec<OutcomeRow>, StorageError>;

    /// Outcomes the backend never acknowledged, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failures.
    async fn unsynced_outcomes(&self, limit: u32) -> Result<Vec<OutcomeRow>, StorageError>;
}

#[async_trait]
pub trait QuizResultRepository: Send + Sync {
    /// Persist a finished quiz and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be stored.
    async fn append_result(&self, result: &QuizResult) -> Result<i64, StorageError>;

    /// Fetch a quiz result by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_result(&self, id: i64) -> Result<QuizResult, StorageError>;

    /// Most recent results for a video, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failures.
    async fn list_results(
        &self,
        video_id: &VideoId,
        limit: u32,
    ) -> Result<Vec<QuizResultRow>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    outcomes: Arc<Mutex<BTreeMap<i64, CheckpointOutcome>>>,
    results: Arc<Mutex<BTreeMap<i64, QuizResult>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn next_id<T>(map: &BTreeMap<i64, T>) -> i64 {
    map.keys().next_back().map_or(1, |last| last + 1)
}

#[async_trait]
impl OutcomeJournal for InMemoryRepository {
    async fn append_outcome(&self, outcome: &CheckpointOutcome) -> Result<i64, StorageError> {
        let mut guard = self
            .outcomes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let id = next_id(&guard);
        guard.insert(id, outcome.clone());
        Ok(id)
    }

    async fn outcomes_for_video(
        &self,
        video_id: &VideoId,
        trail_id: Option<&TrailId>,
    ) -> Result<Vec<OutcomeRow>, StorageError> {
        let guard = self
            .outcomes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut rows: Vec<OutcomeRow> = guard
            .iter()
            .filter(|(_, o)| &o.video_id == video_id && o.trail_id.as_ref() == trail_id)
            .map(|(id, o)| OutcomeRow {
                id: *id,
                outcome: o.clone(),
            })
            .collect();
        rows.sort_by_key(|row| (row.outcome.recorded_at, row.id));
        Ok(rows)
    }

    async fn unsynced_outcomes(&self, limit: u32) -> Result<Vec<OutcomeRow>, StorageError> {
        let guard = self
            .outcomes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let mut rows: Vec<OutcomeRow> = guard
            .iter()
            .filter(|(_, o)| !o.synced)
            .map(|(id, o)| OutcomeRow {
                id: *id,
                outcome: o.clone(),
            })
            .collect();
        rows.sort_by_key(|row| (row.outcome.recorded_at, row.id));
        rows.truncate(limit);
        Ok(rows)
    }
}

#[async_trait]
impl QuizResultRepository for InMemoryRepository {
    async fn append_result(&self, result: &QuizResult) -> Result<i64, StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let id = next_id(&guard);
        guard.insert(id, result.clone());
        Ok(id)
    }

    async fn get_result(&self, id: i64) -> Result<QuizResult, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_results(
        &self,
        video_id: &VideoId,
        limit: u32,
    ) -> Result<Vec<QuizResultRow>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let mut rows: Vec<QuizResultRow> = guard
            .iter()
            .filter(|(_, r)| r.video_id() == video_id)
            .map(|(id, r)| QuizResultRow {
                id: *id,
                result: r.clone(),
            })
            .collect();
        rows.sort_by(|a, b| {
            b.result
                .completed_at()
                .cmp(&a.result.completed_at())
                .then(b.id.cmp(&a.id))
        });
        rows.truncate(limit);
        Ok(rows)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub outcomes: Arc<dyn OutcomeJournal>,
    pub quiz_results: Arc<dyn QuizResultRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let outcomes: Arc<dyn OutcomeJournal> = Arc::new(repo.clone());
        let quiz_results: Arc<dyn QuizResultRepository> = Arc::new(repo);
        Self {
            outcomes,
            quiz_results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use trail_core::model::{CheckpointId, OutcomeKind, QuizTally};
    use trail_core::time::fixed_now;

    fn outcome(cp: &str, video: &str, kind: OutcomeKind, offset: i64) -> CheckpointOutcome {
        CheckpointOutcome::new(
            CheckpointId::new(cp).unwrap(),
            VideoId::new(video).unwrap(),
            None,
            kind,
            fixed_now() + Duration::seconds(offset),
        )
    }

    #[tokio::test]
    async fn journal_filters_by_video_and_sync_state() {
        let repo = InMemoryRepository::new();
        repo.append_outcome(&outcome("c2", "v1", OutcomeKind::Skipped, 20))
            .await
            .unwrap();
        repo.append_outcome(
            &outcome(
                "c1",
                "v1",
                OutcomeKind::Answered {
                    selected: 0,
                    correct: true,
                },
                10,
            )
            .acknowledged(Some(5.0)),
        )
        .await
        .unwrap();
        repo.append_outcome(&outcome("c9", "v2", OutcomeKind::Skipped, 5))
            .await
            .unwrap();

        let video = VideoId::new("v1").unwrap();
        let rows = repo.outcomes_for_video(&video, None).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].outcome.checkpoint_id.as_str(), "c1");

        let unsynced = repo.unsynced_outcomes(10).await.unwrap();
        assert_eq!(unsynced.len(), 2);
        assert_eq!(unsynced[0].outcome.checkpoint_id.as_str(), "c9");

        let trail = TrailId::new("t1").unwrap();
        assert!(repo
            .outcomes_for_video(&video, Some(&trail))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn quiz_results_round_trip_newest_first() {
        let repo = InMemoryRepository::new();
        let video = VideoId::new("v1").unwrap();
        let tally = QuizTally {
            score: 30,
            total_points: 40,
            correct_first_try: 1,
            correct_second_try: 1,
            total_items: 2,
            ..QuizTally::default()
        };
        let first = QuizResult::new(video.clone(), None, tally, fixed_now()).unwrap();
        let second = QuizResult::new(
            video.clone(),
            None,
            tally,
            fixed_now() + Duration::minutes(5),
        )
        .unwrap();

        let first_id = repo.append_result(&first).await.unwrap();
        let second_id = repo.append_result(&second).await.unwrap();

        assert_eq!(repo.get_result(first_id).await.unwrap(), first);
        let rows = repo.list_results(&video, 10).await.unwrap();
        assert_eq!(rows[0].id, second_id);
        assert!(matches!(
            repo.get_result(99).await,
            Err(StorageError::NotFound)
        ));
    }
}
