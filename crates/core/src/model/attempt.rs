use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Ability, AttemptId, Difficulty, OptionKey, QuestionId, SessionId};

/// Record of one answered or skipped question.
///
/// Created exactly once per question shown in a session and never mutated.
/// `ability_after` reflects any progression triggered by this very attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attempt {
    id: AttemptId,
    session_id: SessionId,
    question_id: QuestionId,
    selected: Option<OptionKey>,
    is_correct: bool,
    difficulty: Difficulty,
    answered_at: DateTime<Utc>,
    ability_after: Ability,
}

impl Attempt {
    /// Rehydrate an attempt from persisted storage.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_persisted(
        id: AttemptId,
        session_id: SessionId,
        question_id: QuestionId,
        selected: Option<OptionKey>,
        is_correct: bool,
        difficulty: Difficulty,
        answered_at: DateTime<Utc>,
        ability_after: Ability,
    ) -> Self {
        Self {
            id,
            session_id,
            question_id,
            selected,
            is_correct,
            difficulty,
            answered_at,
            ability_after,
        }
    }

    #[must_use]
    pub fn id(&self) -> AttemptId {
        self.id
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.question_id
    }

    /// `None` means the question was skipped.
    #[must_use]
    pub fn selected(&self) -> Option<&OptionKey> {
        self.selected.as_ref()
    }

    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.selected.is_none()
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.is_correct
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn answered_at(&self) -> DateTime<Utc> {
        self.answered_at
    }

    #[must_use]
    pub fn ability_after(&self) -> Ability {
        self.ability_after
    }
}
