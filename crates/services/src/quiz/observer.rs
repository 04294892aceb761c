use quiz_core::model::{OptionKey, Question};

use super::snapshot::SessionSnapshot;

/// Receives quiz events for display.
///
/// Every method has an empty default so hosts implement only what they render.
pub trait QuizObserver: Send + Sync {
    /// A question is on screen. `position` is 1-based; `total` is the session cap.
    fn on_question_ready(&self, _question: &Question, _position: u32, _total: u32) {}

    /// The answer was scored. `selected` is `None` for a skip.
    fn on_answer_resolved(&self, _selected: Option<&OptionKey>, _correct: &OptionKey) {}

    fn on_analytics_changed(&self, _snapshot: &SessionSnapshot) {}

    /// The session ended and the results should be shown.
    fn on_session_finished(&self, _snapshot: &SessionSnapshot) {}

    /// The session ended quietly; the host should return to subject selection.
    fn on_session_dismissed(&self) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl QuizObserver for NoopObserver {}
