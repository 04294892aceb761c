use storage::repository::SessionRepository;

use super::snapshot::SessionSnapshot;
use crate::error::QuizError;

/// Snapshots of the most recently started sessions, newest first.
///
/// # Errors
///
/// Returns `QuizError::Storage` when the session list cannot be read.
pub async fn recent_sessions(
    sessions: &dyn SessionRepository,
    limit: u32,
) -> Result<Vec<SessionSnapshot>, QuizError> {
    let loaded = sessions.list_sessions(limit).await?;
    Ok(loaded.iter().map(SessionSnapshot::from_session).collect())
}
