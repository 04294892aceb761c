use chrono::{DateTime, Utc};
use rand::RngCore;
use std::collections::HashSet;
use thiserror::Error;

use crate::model::{Ability, Attempt, AttemptId, OptionKey, Question, QuestionId, SessionId};
use crate::progression::{Progress, Progression};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no question is awaiting an answer")]
    NoCurrentQuestion,

    #[error("question {0} was already asked in this session")]
    DuplicateQuestion(QuestionId),

    #[error("session already finished")]
    AlreadyFinished,

    #[error("ended_at is before started_at")]
    InvalidTimeRange,

    #[error("attempt belongs to another session")]
    ForeignAttempt,

    #[error("advancement threshold {0} is outside 2..=3")]
    InvalidThreshold(u32),

    #[error("stored counters (total {total}, score {score}) do not match {attempts} attempts")]
    CountMismatch {
        total: u32,
        score: u32,
        attempts: usize,
    },
}

/// One adaptive quiz run for a single subject.
///
/// Owns its attempts, the progression state, and the transient slot holding
/// the question currently on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSession {
    id: SessionId,
    subject: String,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    progress: Progress,
    score: u32,
    total_questions: u32,
    attempts: Vec<Attempt>,
    current_question: Option<Question>,
}

impl QuizSession {
    #[must_use]
    pub fn start(
        id: SessionId,
        subject: impl Into<String>,
        started_at: DateTime<Utc>,
        progress: Progress,
    ) -> Self {
        Self {
            id,
            subject: subject.into(),
            started_at,
            ended_at: None,
            progress,
            score: 0,
            total_questions: 0,
            attempts: Vec::new(),
            current_question: None,
        }
    }

    /// Rehydrate a stored session together with its attempts.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTimeRange` if the end precedes the start,
    /// `SessionError::InvalidThreshold` if the stored threshold is not 2 or 3,
    /// `SessionError::ForeignAttempt` if an attempt names another session,
    /// `SessionError::DuplicateQuestion` if a question repeats, and
    /// `SessionError::CountMismatch` if the counters exceed the attempts.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: SessionId,
        subject: String,
        started_at: DateTime<Utc>,
        ended_at: Option<DateTime<Utc>>,
        progress: Progress,
        score: u32,
        total_questions: u32,
        attempts: Vec<Attempt>,
    ) -> Result<Self, SessionError> {
        if ended_at.is_some_and(|end| end < started_at) {
            return Err(SessionError::InvalidTimeRange);
        }
        if !Progress::THRESHOLD_RANGE.contains(&progress.threshold()) {
            return Err(SessionError::InvalidThreshold(progress.threshold()));
        }

        let mut seen = HashSet::with_capacity(attempts.len());
        for attempt in &attempts {
            if attempt.session_id() != id {
                return Err(SessionError::ForeignAttempt);
            }
            if !seen.insert(attempt.question_id()) {
                return Err(SessionError::DuplicateQuestion(attempt.question_id()));
            }
        }

        // Attempts are written fire-and-forget, so storage may hold fewer than
        // the counters claim, never more.
        let correct = attempts.iter().filter(|a| a.is_correct()).count();
        let fits = |n: u32, have: usize| usize::try_from(n).is_ok_and(|n| n >= have);
        if score > total_questions || !fits(total_questions, attempts.len()) || !fits(score, correct)
        {
            return Err(SessionError::CountMismatch {
                total: total_questions,
                score,
                attempts: attempts.len(),
            });
        }

        Ok(Self {
            id,
            subject,
            started_at,
            ended_at,
            progress,
            score,
            total_questions,
            attempts,
            current_question: None,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.ended_at.is_some()
    }

    #[must_use]
    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    #[must_use]
    pub fn ability(&self) -> Ability {
        self.progress.ability()
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.current_question.as_ref()
    }

    /// Identifiers already used in this session (the hard exclusion set).
    #[must_use]
    pub fn answered_ids(&self) -> HashSet<QuestionId> {
        self.attempts.iter().map(Attempt::question_id).collect()
    }

    /// Put a question on screen.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyFinished` once the session has ended and
    /// `SessionError::DuplicateQuestion` if the question was already attempted.
    pub fn present(&mut self, question: Question) -> Result<&Question, SessionError> {
        if self.is_finished() {
            return Err(SessionError::AlreadyFinished);
        }
        if self
            .attempts
            .iter()
            .any(|a| a.question_id() == question.id())
        {
            return Err(SessionError::DuplicateQuestion(question.id()));
        }
        Ok(self.current_question.insert(question))
    }

    /// Score the current question, update progression, and append the attempt.
    ///
    /// Clears the current-question slot.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyFinished` once the session has ended and
    /// `SessionError::NoCurrentQuestion` if nothing is awaiting an answer.
    pub fn record_attempt(
        &mut self,
        attempt_id: AttemptId,
        selected: Option<OptionKey>,
        answered_at: DateTime<Utc>,
        progression: &dyn Progression,
        rng: &mut dyn RngCore,
    ) -> Result<&Attempt, SessionError> {
        if self.is_finished() {
            return Err(SessionError::AlreadyFinished);
        }
        let question = self
            .current_question
            .take()
            .ok_or(SessionError::NoCurrentQuestion)?;

        let is_correct = question.is_correct(selected.as_ref());
        self.total_questions = self.total_questions.saturating_add(1);
        if is_correct {
            self.score = self.score.saturating_add(1);
        }
        progression.apply(&mut self.progress, is_correct, rng);

        let attempt = Attempt::from_persisted(
            attempt_id,
            self.id,
            question.id(),
            selected,
            is_correct,
            question.difficulty(),
            answered_at,
            self.progress.ability(),
        );
        self.attempts.push(attempt);
        Ok(&self.attempts[self.attempts.len() - 1])
    }

    /// Stamp the end time. Any question still on screen is dropped unanswered.
    ///
    /// An `ended_at` earlier than the start (a clock stepping backwards) is
    /// clamped to the start.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyFinished` if already stamped.
    pub fn finish(&mut self, ended_at: DateTime<Utc>) -> Result<(), SessionError> {
        if self.is_finished() {
            return Err(SessionError::AlreadyFinished);
        }
        self.current_question = None;
        self.ended_at = Some(ended_at.max(self.started_at));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Difficulty, QuestionDraft};
    use crate::progression::ThresholdProgression;
    use crate::time::fixed_now;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::BTreeMap;

    fn question(id: u64, difficulty: Difficulty) -> Question {
        QuestionDraft {
            subject: "Math".into(),
            difficulty,
            prompt: format!("Q{id}"),
            options: BTreeMap::from([("A".into(), "yes".into()), ("B".into(), "no".into())]),
            correct: "A".into(),
        }
        .validate(QuestionId::new(id))
        .unwrap()
    }

    fn key(k: &str) -> Option<OptionKey> {
        Some(OptionKey::new(k).unwrap())
    }

    fn session(threshold: u32) -> QuizSession {
        QuizSession::start(
            SessionId::generate(),
            "Math",
            fixed_now(),
            Progress::from_persisted(Ability::initial(), 0, threshold),
        )
    }

    #[test]
    fn attempt_records_ability_after_progression() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut s = session(2);

        for id in 1..=2 {
            s.present(question(id, Difficulty::Easy)).unwrap();
            s.record_attempt(
                AttemptId::generate(),
                key("A"),
                fixed_now(),
                &ThresholdProgression,
                &mut rng,
            )
            .unwrap();
        }

        assert_eq!(s.attempts()[0].ability_after().value(), 1.0);
        assert_eq!(s.attempts()[1].ability_after().value(), 1.5);
        assert_eq!(s.score(), 2);
        assert_eq!(s.total_questions(), 2);
        assert!(s.current_question().is_none());
    }

    #[test]
    fn skipped_answer_counts_but_scores_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut s = session(3);
        s.present(question(1, Difficulty::Easy)).unwrap();
        s.record_attempt(AttemptId::generate(), key("A"), fixed_now(), &ThresholdProgression, &mut rng)
            .unwrap();
        s.present(question(2, Difficulty::Easy)).unwrap();
        let attempt = s
            .record_attempt(AttemptId::generate(), None, fixed_now(), &ThresholdProgression, &mut rng)
            .unwrap();

        assert!(attempt.is_skipped());
        assert!(!attempt.is_correct());
        assert_eq!(s.progress().streak(), 0);
        assert_eq!(s.ability().value(), 1.0);
        assert_eq!(s.total_questions(), 2);
        assert_eq!(s.score(), 1);
    }

    #[test]
    fn answering_without_question_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut s = session(3);
        let err = s
            .record_attempt(AttemptId::generate(), key("A"), fixed_now(), &ThresholdProgression, &mut rng)
            .unwrap_err();
        assert_eq!(err, SessionError::NoCurrentQuestion);
        assert_eq!(s.total_questions(), 0);
    }

    #[test]
    fn same_question_cannot_be_presented_twice() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut s = session(3);
        s.present(question(9, Difficulty::Hard)).unwrap();
        s.record_attempt(AttemptId::generate(), None, fixed_now(), &ThresholdProgression, &mut rng)
            .unwrap();
        let err = s.present(question(9, Difficulty::Hard)).unwrap_err();
        assert_eq!(err, SessionError::DuplicateQuestion(QuestionId::new(9)));
        assert_eq!(s.answered_ids().len(), 1);
    }

    #[test]
    fn finish_is_stamped_once() {
        let mut s = session(2);
        s.present(question(1, Difficulty::Easy)).unwrap();
        s.finish(fixed_now()).unwrap();
        assert!(s.is_finished());
        assert!(s.current_question().is_none());
        assert_eq!(s.finish(fixed_now()), Err(SessionError::AlreadyFinished));
    }

    #[test]
    fn finish_before_start_is_clamped_to_start() {
        let mut s = session(2);
        s.finish(fixed_now() - chrono::Duration::seconds(1)).unwrap();
        assert_eq!(s.ended_at(), Some(s.started_at()));
    }

    #[test]
    fn persisted_counters_must_cover_attempts() {
        let id = SessionId::generate();
        let attempt = Attempt::from_persisted(
            AttemptId::generate(),
            id,
            QuestionId::new(1),
            key("A"),
            true,
            Difficulty::Easy,
            fixed_now(),
            Ability::initial(),
        );
        let progress = Progress::from_persisted(Ability::initial(), 1, 2);

        let ok = QuizSession::from_persisted(
            id,
            "Math".into(),
            fixed_now(),
            Some(fixed_now()),
            progress,
            1,
            2,
            vec![attempt.clone()],
        );
        assert!(ok.is_ok());

        let err = QuizSession::from_persisted(
            id,
            "Math".into(),
            fixed_now(),
            None,
            progress,
            0,
            0,
            vec![attempt],
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::CountMismatch { .. }));
    }

    #[test]
    fn persisted_threshold_must_be_two_or_three() {
        let err = QuizSession::from_persisted(
            SessionId::generate(),
            "Math".into(),
            fixed_now(),
            None,
            Progress::from_persisted(Ability::initial(), 0, 0),
            0,
            0,
            Vec::new(),
        )
        .unwrap_err();
        assert_eq!(err, SessionError::InvalidThreshold(0));
    }
}
