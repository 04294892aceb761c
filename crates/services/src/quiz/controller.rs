use std::collections::HashSet;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::task::JoinHandle;

use quiz_core::model::{
    Attempt, AttemptId, OptionKey, Question, QuestionId, QuizSession, SessionId,
};
use quiz_core::progression::Progression;
use quiz_core::selector::{Exclusions, QuestionSelector};
use storage::repository::{AttemptRepository, QuestionRepository, SessionRepository, Storage};

use super::config::QuizConfig;
use super::observer::{NoopObserver, QuizObserver};
use super::snapshot::SessionSnapshot;
use crate::Clock;
use crate::error::QuizError;

//
// ─── STATE ────────────────────────────────────────────────────────────────────
//

/// Lifecycle of the controller. `Finished` may be restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Active,
    Finished,
}

/// What the learner sees after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    /// A question is awaiting an answer.
    Question(Question),
    /// The session ended and was persisted.
    Finished(SessionSnapshot),
}

/// Result of answering the current question.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOutcome {
    pub attempt: Attempt,
    pub correct_option: OptionKey,
    pub next: Turn,
}

struct ActiveQuiz {
    session: QuizSession,
    pool: Vec<Question>,
    exclusions: Exclusions,
}

//
// ─── CONTROLLER ───────────────────────────────────────────────────────────────
//

/// Runs one adaptive quiz at a time against the storage collaborators.
///
/// All mutating operations take `&mut self`, so an answer cannot interleave
/// with the pause before the next question. Attempt saves run as detached
/// tasks and outlive the controller.
pub struct QuizController {
    config: QuizConfig,
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
    attempts: Arc<dyn AttemptRepository>,
    sessions: Arc<dyn SessionRepository>,
    observer: Arc<dyn QuizObserver>,
    selector: Box<dyn QuestionSelector>,
    progression: Box<dyn Progression>,
    rng: StdRng,
    phase: Phase,
    active: Option<ActiveQuiz>,
    pending_writes: Vec<JoinHandle<()>>,
}

impl QuizController {
    #[must_use]
    pub fn new(storage: &Storage, config: QuizConfig) -> Self {
        let rng = match config.seed() {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            selector: config.policy().selector(),
            progression: config.policy().progression(),
            config,
            clock: Clock::default(),
            questions: Arc::clone(&storage.questions),
            attempts: Arc::clone(&storage.attempts),
            sessions: Arc::clone(&storage.sessions),
            observer: Arc::new(NoopObserver),
            rng,
            phase: Phase::Idle,
            active: None,
            pending_writes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn QuizObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[must_use]
    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.active
            .as_ref()
            .and_then(|a| a.session.current_question())
    }

    /// Snapshot of the running session, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        self.active
            .as_ref()
            .map(|a| SessionSnapshot::from_session(&a.session))
    }

    /// Begin a session for `subject` and show its first question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidState` while another session is running,
    /// `QuizError::NotFound` when the subject has no questions, and
    /// `QuizError::Storage` when the catalog or past attempts cannot be read.
    pub async fn start(&mut self, subject: &str) -> Result<Turn, QuizError> {
        if self.phase == Phase::Active {
            return Err(QuizError::InvalidState("a quiz is already running"));
        }

        let pool = self.questions.questions_by_subject(subject).await?;
        if pool.is_empty() {
            return Err(QuizError::NotFound {
                subject: subject.to_owned(),
            });
        }
        let past: HashSet<QuestionId> = self
            .attempts
            .all_attempts()
            .await?
            .iter()
            .map(Attempt::question_id)
            .collect();

        let progress = self.progression.initial(&mut self.rng);
        let session =
            QuizSession::start(SessionId::generate(), subject, self.clock.now(), progress);
        tracing::info!(
            session = %session.id(),
            subject,
            pool = pool.len(),
            seen_before = past.len(),
            policy = %self.config.policy(),
            "quiz started"
        );

        self.active = Some(ActiveQuiz {
            session,
            pool,
            exclusions: Exclusions::new(past),
        });
        self.phase = Phase::Active;

        let turn = self.advance().await?;
        if let Some(snapshot) = self.snapshot() {
            self.observer.on_analytics_changed(&snapshot);
        }
        Ok(turn)
    }

    /// Show the next question, or finish when the cap is reached or the pool
    /// is exhausted.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidState` without an active session or while a
    /// question is still awaiting an answer. Finishing may surface
    /// `QuizError::Storage`.
    pub async fn advance(&mut self) -> Result<Turn, QuizError> {
        let Some(active) = self.active.as_mut() else {
            return Err(QuizError::InvalidState("no active quiz"));
        };
        if active.session.current_question().is_some() {
            return Err(QuizError::InvalidState("a question is awaiting an answer"));
        }
        if active.session.total_questions() >= self.config.max_questions() {
            return self.finish_into_turn().await;
        }

        let picked = self
            .selector
            .select(
                &active.pool,
                &active.exclusions,
                active.session.progress(),
                &mut self.rng,
            )
            .map(|s| {
                tracing::debug!(
                    question = %s.question.id(),
                    difficulty = %s.question.difficulty(),
                    matched = ?s.matched,
                    repeated = s.repeated,
                    "question selected"
                );
                s.question.clone()
            });
        let Some(question) = picked else {
            tracing::debug!("question pool exhausted");
            return self.finish_into_turn().await;
        };

        let position = active.session.total_questions().saturating_add(1);
        let shown = active.session.present(question)?.clone();
        self.observer
            .on_question_ready(&shown, position, self.config.max_questions());
        Ok(Turn::Question(shown))
    }

    /// Score the current question, then pause and advance.
    ///
    /// `None` skips the question. The attempt is saved in the background; a
    /// failed save is logged and does not interrupt the quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidState`, with nothing changed, when no
    /// question is awaiting an answer or `selected` is not one of its options.
    /// Errors from the following [`advance`](Self::advance) are propagated.
    pub async fn answer(
        &mut self,
        selected: Option<OptionKey>,
    ) -> Result<AnswerOutcome, QuizError> {
        let Some(active) = self.active.as_mut() else {
            return Err(QuizError::InvalidState("no active quiz"));
        };
        let Some(question) = active.session.current_question() else {
            return Err(QuizError::InvalidState("no question is awaiting an answer"));
        };
        if let Some(key) = &selected {
            if !question.options().contains_key(key) {
                return Err(QuizError::InvalidState("selected option is not offered"));
            }
        }
        let correct_option = question.correct().clone();

        let attempt = active
            .session
            .record_attempt(
                AttemptId::generate(),
                selected,
                self.clock.now(),
                self.progression.as_ref(),
                &mut self.rng,
            )?
            .clone();
        active.exclusions.session.insert(attempt.question_id());
        let snapshot = SessionSnapshot::from_session(&active.session);

        tracing::debug!(
            question = %attempt.question_id(),
            correct = attempt.is_correct(),
            skipped = attempt.is_skipped(),
            ability = %attempt.ability_after(),
            "answer recorded"
        );
        self.persist_attempt(attempt.clone());

        self.observer
            .on_answer_resolved(attempt.selected(), &correct_option);
        self.observer.on_analytics_changed(&snapshot);

        let delay = self.config.answer_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let next = self.advance().await?;
        Ok(AnswerOutcome {
            attempt,
            correct_option,
            next,
        })
    }

    /// End the running session and persist it.
    ///
    /// A silent finish tells the observer to return to subject selection
    /// instead of showing results. Returns `Ok(None)` when nothing is running.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Storage` if the session row cannot be saved. The
    /// session is discarded either way.
    pub async fn finish(&mut self, silent: bool) -> Result<Option<SessionSnapshot>, QuizError> {
        if self.phase != Phase::Active {
            return Ok(None);
        }
        let Some(mut active) = self.active.take() else {
            self.phase = Phase::Finished;
            return Ok(None);
        };
        self.phase = Phase::Finished;

        if let Err(err) = active.session.finish(self.clock.now()) {
            tracing::error!(
                session = %active.session.id(),
                error = %err,
                "failed to finish session"
            );
            return Err(err.into());
        }
        let snapshot = SessionSnapshot::from_session(&active.session);

        if let Err(err) = self.sessions.save_session(&active.session).await {
            tracing::error!(
                session = %snapshot.session_id,
                error = %err,
                "failed to save session"
            );
            return Err(err.into());
        }
        tracing::info!(
            session = %snapshot.session_id,
            score = snapshot.score,
            total = snapshot.total_questions,
            ability = %snapshot.ability,
            "quiz finished"
        );

        if silent {
            self.observer.on_session_dismissed();
        } else {
            self.observer.on_session_finished(&snapshot);
        }
        Ok(Some(snapshot))
    }

    /// Wait for every background attempt save to complete.
    ///
    /// Optional: saves that are not awaited still run to completion on the
    /// runtime.
    pub async fn wait_for_pending_writes(&mut self) {
        for handle in std::mem::take(&mut self.pending_writes) {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "attempt save task did not complete");
            }
        }
    }

    async fn finish_into_turn(&mut self) -> Result<Turn, QuizError> {
        match self.finish(false).await? {
            Some(snapshot) => Ok(Turn::Finished(snapshot)),
            None => Err(QuizError::InvalidState("no active quiz")),
        }
    }

    fn persist_attempt(&mut self, attempt: Attempt) {
        self.pending_writes.retain(|handle| !handle.is_finished());

        let attempts = Arc::clone(&self.attempts);
        let handle = tokio::spawn(async move {
            if let Err(err) = attempts.save_attempt(&attempt).await {
                tracing::warn!(
                    attempt = %attempt.id(),
                    question = %attempt.question_id(),
                    error = %err,
                    "failed to save attempt"
                );
            }
        });
        self.pending_writes.push(handle);
    }
}
