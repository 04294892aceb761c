//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::SessionError;
use storage::repository::StorageError;

/// Errors emitted by the quiz controller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("no questions available for subject \"{subject}\"")]
    NotFound { subject: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl QuizError {
    /// Whether a host should show this error to the learner.
    ///
    /// `InvalidState` is a guard against stray input and is only logged.
    #[must_use]
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, QuizError::InvalidState(_))
    }
}
