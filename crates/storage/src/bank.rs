//! Question bank import.
//!
//! A bank is a JSON array of questions, each carrying its own numeric id:
//! `{ "id": 1, "subject": "Math", "difficulty": "easy", "text": "...",
//!    "options": { "A": "...", "B": "..." }, "correctAnswer": "A" }`.

use quiz_core::model::{Question, QuestionDraft, QuestionError, QuestionId};
use serde::Deserialize;
use thiserror::Error;

use crate::repository::{QuestionRepository, StorageError};

/// Bank bundled with the crate, used when no bank file is given.
pub const SAMPLE_BANK: &str = include_str!("../data/sample_bank.json");

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BankError {
    #[error("malformed question bank: {0}")]
    Json(#[from] serde_json::Error),

    #[error("question {id}: {source}")]
    Invalid {
        id: u64,
        #[source]
        source: QuestionError,
    },

    #[error("question id {0} appears more than once")]
    DuplicateId(u64),
}

#[derive(Debug, Deserialize)]
struct BankEntry {
    id: u64,
    #[serde(flatten)]
    draft: QuestionDraft,
}

/// Parse and validate a JSON question bank.
///
/// # Errors
///
/// Returns `BankError` if the JSON is malformed, an entry fails validation,
/// or two entries share an id.
pub fn parse_bank(json: &str) -> Result<Vec<Question>, BankError> {
    let entries: Vec<BankEntry> = serde_json::from_str(json)?;
    let mut seen = std::collections::HashSet::with_capacity(entries.len());
    let mut questions = Vec::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(entry.id) {
            return Err(BankError::DuplicateId(entry.id));
        }
        let question = entry
            .draft
            .validate(QuestionId::new(entry.id))
            .map_err(|source| BankError::Invalid {
                id: entry.id,
                source,
            })?;
        questions.push(question);
    }
    Ok(questions)
}

/// A store needs seeding when it is empty or holds fewer questions than the bank.
#[must_use]
pub fn needs_reseed(stored: u64, bank_len: usize) -> bool {
    stored == 0 || stored < bank_len as u64
}

/// Result of [`seed_questions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Seeded { upserted: usize },
    UpToDate { stored: u64 },
}

/// Upsert every bank question when the store is behind the bank.
///
/// # Errors
///
/// Returns `StorageError` if counting or writing fails.
pub async fn seed_questions(
    repo: &dyn QuestionRepository,
    bank: &[Question],
) -> Result<SeedOutcome, StorageError> {
    let stored = repo.count_questions().await?;
    if !needs_reseed(stored, bank.len()) {
        tracing::debug!(stored, bank = bank.len(), "question store up to date");
        return Ok(SeedOutcome::UpToDate { stored });
    }

    for question in bank {
        repo.upsert_question(question).await?;
    }
    tracing::info!(upserted = bank.len(), "question store seeded");
    Ok(SeedOutcome::Seeded {
        upserted: bank.len(),
    })
}

/// Delete the question with the highest id, if any.
///
/// # Errors
///
/// Returns `StorageError` if reading or deleting fails.
pub async fn remove_last_question(
    repo: &dyn QuestionRepository,
) -> Result<Option<QuestionId>, StorageError> {
    let Some(last) = repo.all_questions().await?.iter().map(Question::id).max() else {
        return Ok(None);
    };
    repo.delete_question(last).await?;
    Ok(Some(last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;
    use quiz_core::model::Difficulty;

    #[test]
    fn sample_bank_covers_every_band() {
        let bank = parse_bank(SAMPLE_BANK).unwrap();
        assert!(!bank.is_empty());
        for subject in ["Math", "Science", "History"] {
            for difficulty in Difficulty::ORDER {
                assert!(
                    bank.iter()
                        .any(|q| q.subject() == subject && q.difficulty() == difficulty),
                    "{subject} has no {difficulty} question"
                );
            }
        }
    }

    #[test]
    fn bank_accepts_camel_case_field_names() {
        let json = r#"[{ "id": 7, "subject": "Math", "difficulty": "hard",
            "text": "2 + 2?", "options": { "A": "4", "B": "5" }, "correctAnswer": "a" }]"#;
        let bank = parse_bank(json).unwrap();
        assert_eq!(bank[0].id(), QuestionId::new(7));
        assert_eq!(bank[0].prompt(), "2 + 2?");
        assert_eq!(bank[0].correct().as_str(), "A");
    }

    #[test]
    fn duplicate_and_invalid_entries_are_rejected() {
        let dup = r#"[
            { "id": 1, "subject": "M", "difficulty": "easy", "prompt": "p", "options": { "A": "x", "B": "y" }, "correct": "A" },
            { "id": 1, "subject": "M", "difficulty": "easy", "prompt": "q", "options": { "A": "x", "B": "y" }, "correct": "A" }
        ]"#;
        assert!(matches!(parse_bank(dup), Err(BankError::DuplicateId(1))));

        let bad = r#"[{ "id": 2, "subject": "M", "difficulty": "easy", "prompt": "p",
            "options": { "A": "x", "B": "y" }, "correct": "Z" }]"#;
        assert!(matches!(
            parse_bank(bad),
            Err(BankError::Invalid { id: 2, .. })
        ));
    }

    #[test]
    fn reseed_rule() {
        assert!(needs_reseed(0, 0));
        assert!(needs_reseed(0, 5));
        assert!(needs_reseed(4, 5));
        assert!(!needs_reseed(5, 5));
        assert!(!needs_reseed(9, 5));
    }

    #[tokio::test]
    async fn seeding_is_skipped_once_the_store_caught_up() {
        let repo = InMemoryRepository::new();
        let bank = parse_bank(SAMPLE_BANK).unwrap();

        let first = seed_questions(&repo, &bank).await.unwrap();
        assert_eq!(first, SeedOutcome::Seeded { upserted: bank.len() });

        let second = seed_questions(&repo, &bank).await.unwrap();
        assert_eq!(
            second,
            SeedOutcome::UpToDate {
                stored: bank.len() as u64
            }
        );
    }

    #[tokio::test]
    async fn removing_the_last_question_drops_the_highest_id() {
        let repo = InMemoryRepository::new();
        assert_eq!(remove_last_question(&repo).await.unwrap(), None);

        let bank = parse_bank(SAMPLE_BANK).unwrap();
        seed_questions(&repo, &bank).await.unwrap();
        let max = bank.iter().map(Question::id).max().unwrap();

        assert_eq!(remove_last_question(&repo).await.unwrap(), Some(max));
        assert_eq!(repo.count_questions().await.unwrap(), bank.len() as u64 - 1);
        assert!(needs_reseed(repo.count_questions().await.unwrap(), bank.len()));
    }
}
