use std::collections::BTreeMap;

use quiz_core::model::{
    Ability, Attempt, AttemptId, Difficulty, OptionKey, Question, QuestionDraft, QuestionId,
    SessionId,
};
use sqlx::Row;

use crate::repository::{SessionRecord, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn question_id_to_i64(id: QuestionId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("question_id overflow".into()))
}

fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    u64::try_from(v)
        .map(QuestionId::new)
        .map_err(|_| StorageError::Serialization("question_id sign overflow".into()))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn parse_difficulty(s: &str) -> Result<Difficulty, StorageError> {
    s.parse::<Difficulty>().map_err(ser)
}

/// Options are stored as a JSON object keyed by option label.
pub(crate) fn options_to_json(question: &Question) -> Result<String, StorageError> {
    serde_json::to_string(question.options()).map_err(ser)
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let id = question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let options_json: String = row.try_get("options").map_err(ser)?;
    let options: BTreeMap<String, String> = serde_json::from_str(&options_json).map_err(ser)?;
    let difficulty: String = row.try_get("difficulty").map_err(ser)?;

    QuestionDraft {
        subject: row.try_get("subject").map_err(ser)?,
        difficulty: parse_difficulty(&difficulty)?,
        prompt: row.try_get("prompt").map_err(ser)?,
        options,
        correct: row.try_get("correct_option").map_err(ser)?,
    }
    .validate(id)
    .map_err(ser)
}

pub(crate) fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<Attempt, StorageError> {
    let id: AttemptId = row.try_get::<String, _>("id").map_err(ser)?.parse().map_err(ser)?;
    let session_id: SessionId = row
        .try_get::<String, _>("session_id")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let selected = row
        .try_get::<Option<String>, _>("selected_option")
        .map_err(ser)?
        .map(OptionKey::new)
        .transpose()
        .map_err(ser)?;
    let is_correct: i64 = row.try_get("is_correct").map_err(ser)?;
    let difficulty: String = row.try_get("difficulty").map_err(ser)?;

    Ok(Attempt::from_persisted(
        id,
        session_id,
        question_id_from_i64(row.try_get::<i64, _>("question_id").map_err(ser)?)?,
        selected,
        is_correct != 0,
        parse_difficulty(&difficulty)?,
        row.try_get("answered_at").map_err(ser)?,
        Ability::new(row.try_get::<f64, _>("ability_after").map_err(ser)?),
    ))
}

pub(crate) fn map_session_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<SessionRecord, StorageError> {
    Ok(SessionRecord {
        id: row
            .try_get::<String, _>("id")
            .map_err(ser)?
            .parse()
            .map_err(ser)?,
        subject: row.try_get("subject").map_err(ser)?,
        started_at: row.try_get("started_at").map_err(ser)?,
        ended_at: row.try_get("ended_at").map_err(ser)?,
        ability: row.try_get("ability").map_err(ser)?,
        streak: u32_from_i64("streak", row.try_get::<i64, _>("streak").map_err(ser)?)?,
        threshold: u32_from_i64("threshold", row.try_get::<i64, _>("threshold").map_err(ser)?)?,
        score: u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
        total_questions: u32_from_i64(
            "total_questions",
            row.try_get::<i64, _>("total_questions").map_err(ser)?,
        )?,
    })
}
