//! `SQLite` persistence for the local checkpoint outcome journal and the
//! final quiz result history.

use std::sync::Arc;
use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{OutcomeJournal, QuizResultRepository, Storage};

mod mapping;
mod migrate;
mod outcome_repo;
mod quiz_result_repo;

/// One pool serving both `checkpoint_outcomes` and `quiz_results`.
///
/// Outcomes are appended concurrently from submission tasks; connections run
/// in WAL mode with a 5 s busy timeout.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Connect to `SQLite` using the given URL.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established or if
    /// the connection pragmas fail during setup.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Bring the outcome journal and quiz result tables up to the latest
    /// schema version.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Build a `Storage` whose journal and quiz results share one `SQLite`
    /// pool.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        let outcomes: Arc<dyn OutcomeJournal> = Arc::new(repo.clone());
        let quiz_results: Arc<dyn QuizResultRepository> = Arc::new(repo);
        Ok(Self {
            outcomes,
            quiz_results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteRepository>();
    }

    #[tokio::test]
    async fn migrate_creates_journal_and_quiz_tables() {
        let repo = SqliteRepository::connect("sqlite:file:memdb_schema?mode=memory&cache=shared")
            .await
            .unwrap();
        repo.migrate().await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('checkpoint_outcomes', 'quiz_results') ORDER BY name",
        )
        .fetch_all(repo.pool())
        .await
        .unwrap();
        assert_eq!(tables, vec!["checkpoint_outcomes", "quiz_results"]);
    }
}
