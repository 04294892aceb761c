#![forbid(unsafe_code)]

pub mod error;
pub mod quiz;

pub use quiz_core::Clock;

pub use error::QuizError;
pub use quiz::{
    AdaptivePolicy, AnswerOutcome, NoopObserver, ParsePolicyError, Phase, QuizConfig,
    QuizController, QuizObserver, SessionSnapshot, TrailPoint, Turn, recent_sessions,
};
