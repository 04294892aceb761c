use quiz_core::model::{Question, QuestionId};
use sqlx::Row;

use super::{
    SqliteRepository,
    mapping::{conn, map_question_row, options_to_json, question_id_to_i64, ser},
};
use crate::repository::{QuestionRepository, StorageError};

const QUESTION_COLUMNS: &str = "id, subject, difficulty, prompt, options, correct_option";

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO questions (id, subject, difficulty, prompt, options, correct_option)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                subject = excluded.subject,
                difficulty = excluded.difficulty,
                prompt = excluded.prompt,
                options = excluded.options,
                correct_option = excluded.correct_option
            ",
        )
        .bind(question_id_to_i64(question.id())?)
        .bind(question.subject())
        .bind(question.difficulty().as_str())
        .bind(question.prompt())
        .bind(options_to_json(question)?)
        .bind(question.correct().as_str())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn questions_by_subject(&self, subject: &str) -> Result<Vec<Question>, StorageError> {
        let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE subject = ?1 ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .bind(subject)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_question_row).collect()
    }

    async fn all_questions(&self) -> Result<Vec<Question>, StorageError> {
        let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_question_row).collect()
    }

    async fn count_questions(&self) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM questions")
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;
        let n: i64 = row.try_get("n").map_err(ser)?;
        u64::try_from(n).map_err(ser)
    }

    async fn subjects(&self) -> Result<Vec<String>, StorageError> {
        let rows = sqlx::query("SELECT DISTINCT subject FROM questions ORDER BY subject ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("subject").map_err(ser))
            .collect()
    }

    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM questions WHERE id = ?1")
            .bind(question_id_to_i64(id)?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
