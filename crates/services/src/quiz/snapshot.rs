use chrono::{DateTime, Utc};
use serde::Serialize;

use quiz_core::model::{Ability, Difficulty, QuestionId, QuizSession, SessionId};

/// One answered question in the difficulty trail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrailPoint {
    pub question_id: QuestionId,
    pub difficulty: Difficulty,
    pub correct: bool,
    pub skipped: bool,
    pub ability_after: Ability,
}

/// Read-only view of a session for hosts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub subject: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub score: u32,
    pub total_questions: u32,
    /// Rounded percentage of correct answers; 0 before the first answer.
    pub accuracy_percent: u32,
    pub ability: Ability,
    pub streak: u32,
    pub trail: Vec<TrailPoint>,
}

impl SessionSnapshot {
    #[must_use]
    pub fn from_session(session: &QuizSession) -> Self {
        let trail = session
            .attempts()
            .iter()
            .map(|a| TrailPoint {
                question_id: a.question_id(),
                difficulty: a.difficulty(),
                correct: a.is_correct(),
                skipped: a.is_skipped(),
                ability_after: a.ability_after(),
            })
            .collect();

        Self {
            session_id: session.id(),
            subject: session.subject().to_owned(),
            started_at: session.started_at(),
            ended_at: session.ended_at(),
            score: session.score(),
            total_questions: session.total_questions(),
            accuracy_percent: accuracy_percent(session.score(), session.total_questions()),
            ability: session.ability(),
            streak: session.progress().streak(),
            trail,
        }
    }
}

/// Percentage rounded half up.
fn accuracy_percent(score: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let (score, total) = (u64::from(score), u64::from(total));
    let pct = (score * 200 + total) / (2 * total);
    u32::try_from(pct).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_rounds_like_a_percentage_display() {
        assert_eq!(accuracy_percent(0, 0), 0);
        assert_eq!(accuracy_percent(0, 3), 0);
        assert_eq!(accuracy_percent(1, 3), 33);
        assert_eq!(accuracy_percent(2, 3), 67);
        assert_eq!(accuracy_percent(1, 8), 13);
        assert_eq!(accuracy_percent(10, 10), 100);
    }
}
