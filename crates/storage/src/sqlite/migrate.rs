use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned migrations for the quiz schema.
///
/// Version 1 creates the three tables (questions, attempts, sessions) and
/// their secondary indexes.
#[allow(clippy::too_many_lines)]
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

    if is_applied(pool, 1).await? {
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS questions (
                id INTEGER PRIMARY KEY,
                subject TEXT NOT NULL,
                difficulty TEXT NOT NULL CHECK (difficulty IN ('easy', 'medium', 'hard')),
                prompt TEXT NOT NULL,
                options TEXT NOT NULL,
                correct_option TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    // No foreign keys: attempts are written before their session row exists,
    // and questions may be deleted while their history is kept.
    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS attempts (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                question_id INTEGER NOT NULL,
                selected_option TEXT,
                is_correct INTEGER NOT NULL CHECK (is_correct IN (0, 1)),
                difficulty TEXT NOT NULL CHECK (difficulty IN ('easy', 'medium', 'hard')),
                answered_at TEXT NOT NULL,
                ability_after REAL NOT NULL CHECK (ability_after BETWEEN 1.0 AND 3.0)
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                subject TEXT NOT NULL,
                started_at TEXT NOT NULL,
                ended_at TEXT,
                ability REAL NOT NULL CHECK (ability BETWEEN 1.0 AND 3.0),
                streak INTEGER NOT NULL CHECK (streak >= 0),
                threshold INTEGER NOT NULL CHECK (threshold BETWEEN 2 AND 3),
                score INTEGER NOT NULL CHECK (score >= 0),
                total_questions INTEGER NOT NULL CHECK (total_questions >= score)
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    for ddl in [
        "CREATE INDEX IF NOT EXISTS idx_questions_subject ON questions(subject, id);",
        "CREATE INDEX IF NOT EXISTS idx_questions_difficulty ON questions(difficulty);",
        "CREATE INDEX IF NOT EXISTS idx_attempts_session ON attempts(session_id, answered_at);",
        "CREATE INDEX IF NOT EXISTS idx_sessions_started_at ON sessions(started_at);",
    ] {
        sqlx::query(ddl).execute(&mut *tx).await?;
    }

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

    Ok(())
}
