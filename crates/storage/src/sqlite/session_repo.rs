use quiz_core::model::{QuizSession, SessionId};

use super::{
    SqliteRepository,
    mapping::{conn, map_session_row, ser},
};
use crate::repository::{
    AttemptRepository, SessionRecord, SessionRepository, StorageError,
};

impl SqliteRepository {
    async fn hydrate(&self, record: SessionRecord) -> Result<QuizSession, StorageError> {
        let attempts = self.attempts_for_session(record.id).await?;
        record.into_session(attempts).map_err(ser)
    }
}

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn save_session(&self, session: &QuizSession) -> Result<(), StorageError> {
        let record = SessionRecord::from_session(session);
        sqlx::query(
            r"
            INSERT INTO sessions (
                id, subject, started_at, ended_at, ability, streak, threshold,
                score, total_questions
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                ended_at = excluded.ended_at,
                ability = excluded.ability,
                streak = excluded.streak,
                threshold = excluded.threshold,
                score = excluded.score,
                total_questions = excluded.total_questions
            ",
        )
        .bind(record.id.to_string())
        .bind(&record.subject)
        .bind(record.started_at)
        .bind(record.ended_at)
        .bind(record.ability)
        .bind(i64::from(record.streak))
        .bind(i64::from(record.threshold))
        .bind(i64::from(record.score))
        .bind(i64::from(record.total_questions))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<QuizSession, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, subject, started_at, ended_at, ability, streak, threshold,
                   score, total_questions
            FROM sessions
            WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        self.hydrate(map_session_row(&row)?).await
    }

    async fn list_sessions(&self, limit: u32) -> Result<Vec<QuizSession>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, subject, started_at, ended_at, ability, streak, threshold,
                   score, total_questions
            FROM sessions
            ORDER BY started_at DESC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(self.hydrate(map_session_row(row)?).await?);
        }
        Ok(out)
    }
}
