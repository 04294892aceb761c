use quiz_core::model::{Attempt, SessionId};

use super::{
    SqliteRepository,
    mapping::{conn, map_attempt_row, question_id_to_i64},
};
use crate::repository::{AttemptRepository, StorageError};

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn save_attempt(&self, attempt: &Attempt) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO attempts (
                id, session_id, question_id, selected_option, is_correct,
                difficulty, answered_at, ability_after
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                selected_option = excluded.selected_option,
                is_correct = excluded.is_correct,
                answered_at = excluded.answered_at,
                ability_after = excluded.ability_after
            ",
        )
        .bind(attempt.id().to_string())
        .bind(attempt.session_id().to_string())
        .bind(question_id_to_i64(attempt.question_id())?)
        .bind(attempt.selected().map(|k| k.as_str().to_owned()))
        .bind(i64::from(attempt.is_correct()))
        .bind(attempt.difficulty().as_str())
        .bind(attempt.answered_at())
        .bind(attempt.ability_after().value())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn all_attempts(&self) -> Result<Vec<Attempt>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, session_id, question_id, selected_option, is_correct,
                   difficulty, answered_at, ability_after
            FROM attempts
            ORDER BY answered_at ASC, rowid ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_attempt_row).collect()
    }

    async fn attempts_for_session(&self, id: SessionId) -> Result<Vec<Attempt>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, session_id, question_id, selected_option, is_correct,
                   difficulty, answered_at, ability_after
            FROM attempts
            WHERE session_id = ?1
            ORDER BY answered_at ASC, rowid ASC
            ",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_attempt_row).collect()
    }
}
