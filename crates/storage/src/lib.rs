#![forbid(unsafe_code)]

pub mod bank;
pub mod repository;
pub mod sqlite;

pub use repository::{
    AttemptRepository, InMemoryRepository, QuestionRepository, SessionRecord, SessionRepository,
    Storage, StorageError,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
