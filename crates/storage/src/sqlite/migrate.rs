use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the consolidated schema migration.
///
/// Creates the checkpoint outcome journal, quiz results, and their indexes.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS checkpoint_outcomes (
                    id INTEGER PRIMARY KEY,
                    checkpoint_id TEXT NOT NULL,
                    video_id TEXT NOT NULL,
                    trail_id TEXT,
                    kind TEXT NOT NULL CHECK (kind IN ('answered', 'skipped')),
                    selected_answer INTEGER CHECK (selected_answer >= 0),
                    is_correct INTEGER NOT NULL CHECK (is_correct IN (0, 1)),
                    recorded_at TEXT NOT NULL,
                    synced INTEGER NOT NULL CHECK (synced IN (0, 1)),
                    score_impact REAL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS quiz_results (
                    id INTEGER PRIMARY KEY,
                    video_id TEXT NOT NULL,
                    trail_id TEXT,
                    score INTEGER NOT NULL CHECK (score >= 0),
                    total_points INTEGER NOT NULL CHECK (total_points >= score),
                    correct_first_try INTEGER NOT NULL CHECK (correct_first_try >= 0),
                    correct_second_try INTEGER NOT NULL CHECK (correct_second_try >= 0),
                    exhausted INTEGER NOT NULL CHECK (exhausted >= 0),
                    exercises_passed INTEGER NOT NULL CHECK (exercises_passed >= 0),
                    total_items INTEGER NOT NULL CHECK (total_items >= 0),
                    completed_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_outcomes_video_recorded
                    ON checkpoint_outcomes (video_id, trail_id, recorded_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_outcomes_unsynced
                    ON checkpoint_outcomes (synced, recorded_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_quiz_results_video_completed
                    ON quiz_results (video_id, completed_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
