use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    Ability, Attempt, Question, QuestionId, QuizSession, SessionError, SessionId,
};
use quiz_core::progression::Progress;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

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

/// Persisted shape for a session row.
///
/// Attempts live in their own table and are joined back on load, so the
/// record carries only the scalar columns.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: SessionId,
    pub subject: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub ability: f64,
    pub streak: u32,
    pub threshold: u32,
    pub score: u32,
    pub total_questions: u32,
}

impl SessionRecord {
    #[must_use]
    pub fn from_session(session: &QuizSession) -> Self {
        let progress = session.progress();
        Self {
            id: session.id(),
            subject: session.subject().to_owned(),
            started_at: session.started_at(),
            ended_at: session.ended_at(),
            ability: progress.ability().value(),
            streak: progress.streak(),
            threshold: progress.threshold(),
            score: session.score(),
            total_questions: session.total_questions(),
        }
    }

    /// Convert the record back into a domain `QuizSession`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the attempts do not fit the stored counters.
    pub fn into_session(self, attempts: Vec<Attempt>) -> Result<QuizSession, SessionError> {
        let progress =
            Progress::from_persisted(Ability::new(self.ability), self.streak, self.threshold);
        QuizSession::from_persisted(
            self.id,
            self.subject,
            self.started_at,
            self.ended_at,
            progress,
            self.score,
            self.total_questions,
            attempts,
        )
    }
}

/// Question catalog.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Persist or replace a question by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// All questions for a subject, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures. An unknown subject yields an empty list.
    async fn questions_by_subject(&self, subject: &str) -> Result<Vec<Question>, StorageError>;

    /// Every stored question, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn all_questions(&self) -> Result<Vec<Question>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn count_questions(&self) -> Result<u64, StorageError>;

    /// Distinct subjects in alphabetical order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn subjects(&self) -> Result<Vec<String>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the question does not exist.
    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError>;
}

/// Attempt log.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Persist an attempt, replacing any row with the same id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn save_attempt(&self, attempt: &Attempt) -> Result<(), StorageError>;

    /// Every attempt from every session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn all_attempts(&self) -> Result<Vec<Attempt>, StorageError>;

    /// Attempts of one session in the order they were answered.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn attempts_for_session(&self, id: SessionId) -> Result<Vec<Attempt>, StorageError>;
}

/// Finished (or abandoned) sessions.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist or replace the session row. Attempts are stored separately.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be stored.
    async fn save_session(&self, session: &QuizSession) -> Result<(), StorageError>;

    /// Load a session together with its stored attempts.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_session(&self, id: SessionId) -> Result<QuizSession, StorageError>;

    /// Most recently started sessions first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_sessions(&self, limit: u32) -> Result<Vec<QuizSession>, StorageError>;
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<HashMap<QuestionId, Question>>>,
    attempts: Arc<Mutex<Vec<Attempt>>>,
    sessions: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn session_attempts(&self, id: SessionId) -> Result<Vec<Attempt>, StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .filter(|a| a.session_id() == id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = self.questions.lock().map_err(poisoned)?;
        guard.insert(question.id(), question.clone());
        Ok(())
    }

    async fn questions_by_subject(&self, subject: &str) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        let mut found: Vec<Question> = guard
            .values()
            .filter(|q| q.subject() == subject)
            .cloned()
            .collect();
        found.sort_by_key(Question::id);
        Ok(found)
    }

    async fn all_questions(&self) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        let mut found: Vec<Question> = guard.values().cloned().collect();
        found.sort_by_key(Question::id);
        Ok(found)
    }

    async fn count_questions(&self) -> Result<u64, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        Ok(guard.len() as u64)
    }

    async fn subjects(&self) -> Result<Vec<String>, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        let subjects: BTreeSet<String> = guard.values().map(|q| q.subject().to_owned()).collect();
        Ok(subjects.into_iter().collect())
    }

    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError> {
        let mut guard = self.questions.lock().map_err(poisoned)?;
        guard.remove(&id).map(|_| ()).ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn save_attempt(&self, attempt: &Attempt) -> Result<(), StorageError> {
        let mut guard = self.attempts.lock().map_err(poisoned)?;
        match guard.iter_mut().find(|a| a.id() == attempt.id()) {
            Some(existing) => *existing = attempt.clone(),
            None => guard.push(attempt.clone()),
        }
        Ok(())
    }

    async fn all_attempts(&self) -> Result<Vec<Attempt>, StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        Ok(guard.clone())
    }

    async fn attempts_for_session(&self, id: SessionId) -> Result<Vec<Attempt>, StorageError> {
        self.session_attempts(id)
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn save_session(&self, session: &QuizSession) -> Result<(), StorageError> {
        let mut guard = self.sessions.lock().map_err(poisoned)?;
        guard.insert(session.id(), SessionRecord::from_session(session));
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<QuizSession, StorageError> {
        let record = {
            let guard = self.sessions.lock().map_err(poisoned)?;
            guard.get(&id).cloned().ok_or(StorageError::NotFound)?
        };
        let attempts = self.session_attempts(id)?;
        record
            .into_session(attempts)
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn list_sessions(&self, limit: u32) -> Result<Vec<QuizSession>, StorageError> {
        let mut records: Vec<SessionRecord> = {
            let guard = self.sessions.lock().map_err(poisoned)?;
            guard.values().cloned().collect()
        };
        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        records.truncate(usize::try_from(limit).unwrap_or(usize::MAX));

        let mut out = Vec::with_capacity(records.len());
        for record in records {
            let attempts = self.session_attempts(record.id)?;
            out.push(
                record
                    .into_session(attempts)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?,
            );
        }
        Ok(out)
    }
}

/// Aggregates the three repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub sessions: Arc<dyn SessionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    /// Use one repository value for all three tables.
    #[must_use]
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: QuestionRepository + AttemptRepository + SessionRepository + Clone + 'static,
    {
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo.clone());
        let sessions: Arc<dyn SessionRepository> = Arc::new(repo);
        Self {
            questions,
            attempts,
            sessions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AttemptId, Difficulty, OptionKey, QuestionDraft};
    use quiz_core::progression::ThresholdProgression;
    use quiz_core::time::fixed_now;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::BTreeMap;

    fn question(id: u64, subject: &str) -> Question {
        QuestionDraft {
            subject: subject.into(),
            difficulty: Difficulty::Easy,
            prompt: format!("Q{id}"),
            options: BTreeMap::from([("A".into(), "x".into()), ("B".into(), "y".into())]),
            correct: "A".into(),
        }
        .validate(QuestionId::new(id))
        .unwrap()
    }

    #[tokio::test]
    async fn questions_are_grouped_by_subject_in_id_order() {
        let repo = InMemoryRepository::new();
        for (id, subject) in [(3, "Math"), (1, "Math"), (2, "History")] {
            repo.upsert_question(&question(id, subject)).await.unwrap();
        }

        let math = repo.questions_by_subject("Math").await.unwrap();
        let ids: Vec<u64> = math.iter().map(|q| q.id().value()).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(repo.questions_by_subject("Art").await.unwrap().is_empty());
        assert_eq!(repo.subjects().await.unwrap(), vec!["History", "Math"]);
        assert_eq!(repo.count_questions().await.unwrap(), 3);

        repo.delete_question(QuestionId::new(3)).await.unwrap();
        assert!(matches!(
            repo.delete_question(QuestionId::new(3)).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn session_round_trips_with_its_attempts() {
        let repo = InMemoryRepository::new();
        let mut rng = StdRng::seed_from_u64(3);
        let mut session = QuizSession::start(
            SessionId::generate(),
            "Math",
            fixed_now(),
            Progress::initial(&mut rng),
        );
        session.present(question(1, "Math")).unwrap();
        let attempt = session
            .record_attempt(
                AttemptId::generate(),
                Some(OptionKey::new("A").unwrap()),
                fixed_now(),
                &ThresholdProgression,
                &mut rng,
            )
            .unwrap()
            .clone();
        repo.save_attempt(&attempt).await.unwrap();
        session.finish(fixed_now()).unwrap();
        repo.save_session(&session).await.unwrap();

        let loaded = repo.get_session(session.id()).await.unwrap();
        assert_eq!(loaded.attempts(), session.attempts());
        assert_eq!(loaded.score(), 1);
        assert_eq!(loaded.progress(), session.progress());
        assert_eq!(loaded.ended_at(), Some(fixed_now()));

        assert_eq!(repo.list_sessions(10).await.unwrap().len(), 1);
        assert!(matches!(
            repo.get_session(SessionId::generate()).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn saving_an_attempt_twice_keeps_one_row() {
        let repo = InMemoryRepository::new();
        let attempt = Attempt::from_persisted(
            AttemptId::generate(),
            SessionId::generate(),
            QuestionId::new(1),
            None,
            false,
            Difficulty::Easy,
            fixed_now(),
            Ability::initial(),
        );
        repo.save_attempt(&attempt).await.unwrap();
        repo.save_attempt(&attempt).await.unwrap();
        assert_eq!(repo.all_attempts().await.unwrap().len(), 1);
    }
}
