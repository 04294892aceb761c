mod config;
mod controller;
mod history;
mod observer;
mod snapshot;

pub use config::{AdaptivePolicy, ParsePolicyError, QuizConfig};
pub use controller::{AnswerOutcome, Phase, QuizController, Turn};
pub use history::recent_sessions;
pub use observer::{NoopObserver, QuizObserver};
pub use snapshot::{SessionSnapshot, TrailPoint};
