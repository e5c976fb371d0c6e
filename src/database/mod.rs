use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::auth::{NewUser, Role, User, UserChanges};
use crate::models::task::{ChecklistItem, NewTask, Task, TaskChanges, TaskFilter, TaskStatus};

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Replacement checklist together with the status derived from it.
#[derive(Debug, Clone)]
pub struct ChecklistWrite {
    pub items: Vec<ChecklistItem>,
    pub status: TaskStatus,
    /// Only write when the stored version matches.
    pub expected_version: Option<i64>,
}

/// Storage for users and tasks.
///
/// Handlers program against this trait. `PgRepository` talks to PostgreSQL,
/// `MemoryRepository` keeps everything in process for tests and local runs.
/// Every successful task write bumps `Task::version`.
#[async_trait]
pub trait Repository: Send + Sync {
    // -- Users --
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<User, RepoError>;
    async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, RepoError>;
    async fn find_users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError>;

    // -- Tasks --
    async fn insert_task(&self, task: NewTask) -> Result<Task, RepoError>;
    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, RepoError>;
    /// Newest first.
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, RepoError>;
    async fn update_task(&self, id: Uuid, changes: TaskChanges) -> Result<Task, RepoError>;
    async fn replace_checklist(&self, id: Uuid, write: ChecklistWrite) -> Result<Task, RepoError>;
    async fn delete_task(&self, id: Uuid) -> Result<(), RepoError>;

    async fn health_check(&self) -> Result<(), RepoError>;
    async fn stats(&self) -> Result<DatabaseStats, RepoError>;
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct DatabaseStats {
    pub users: i64,
    pub tasks: i64,
}

impl DatabaseStats {
    pub fn log_stats(&self) {
        log::info!("📈 Database Statistics:");
        log::info!("   👥 Users: {}", self.users);
        log::info!("   📋 Tasks: {}", self.tasks);
    }
}

pub(crate) fn stale_version(expected: i64, actual: i64) -> RepoError {
    RepoError::Conflict(format!(
        "Task was modified concurrently (expected version {expected}, found {actual})"
    ))
}
