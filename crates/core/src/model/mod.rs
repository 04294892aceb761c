mod ability;
mod attempt;
mod difficulty;
mod ids;
mod question;
mod session;

pub use ids::{AttemptId, ParseIdError, QuestionId, SessionId};

pub use ability::Ability;
pub use attempt::Attempt;
pub use difficulty::{Difficulty, DifficultyError};
pub use question::{OptionKey, Question, QuestionDraft, QuestionError};
pub use session::{QuizSession, SessionError};
