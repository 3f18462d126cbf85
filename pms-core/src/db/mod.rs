//! Persistence stores for the HTTP backend.
//!
//! Two interchangeable implementations sit behind [`Store`]: a flat JSON file
//! ([`JsonFileStore`]) and SQLite ([`Database`]). Both cascade project
//! deletes to tasks and list projects and tasks newest first.

mod json_file;
mod schema;
mod sqlite;

pub use json_file::JsonFileStore;
pub use schema::SCHEMA;
pub use sqlite::Database;

use thiserror::Error;

use crate::models::{EntityId, Project, ProjectDraft, Task, TaskDraft, User, UserDraft};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait Store: Send + Sync {
    /// Newest first.
    fn list_projects(&self) -> StoreResult<Vec<Project>>;
    fn get_project(&self, id: EntityId) -> StoreResult<Project>;
    fn create_project(&self, draft: &ProjectDraft) -> StoreResult<Project>;
    /// Full replace of every field.
    fn update_project(&self, id: EntityId, draft: &ProjectDraft) -> StoreResult<Project>;
    /// Removes the project and its tasks.
    fn delete_project(&self, id: EntityId) -> StoreResult<()>;

    /// Ordered by id.
    fn list_users(&self) -> StoreResult<Vec<User>>;
    fn get_user(&self, id: EntityId) -> StoreResult<User>;
    fn create_user(&self, draft: &UserDraft) -> StoreResult<User>;
    fn update_user(&self, id: EntityId, draft: &UserDraft) -> StoreResult<User>;
    /// Removes the user and unassigns their tasks.
    fn delete_user(&self, id: EntityId) -> StoreResult<()>;

    /// Newest first, enriched with project name and assignee details.
    fn list_tasks(&self, project_id: Option<EntityId>) -> StoreResult<Vec<Task>>;
    fn create_task(&self, draft: &TaskDraft) -> StoreResult<Task>;
}

/// Fill the display-only task fields from the owning collections.
pub fn enrich_tasks(tasks: Vec<Task>, projects: &[Project], users: &[User]) -> Vec<Task> {
    tasks
        .into_iter()
        .map(|mut task| {
            let user = task
                .assigned_to_user_id
                .and_then(|id| users.iter().find(|u| u.id == id));
            task.assigned_user_name = user.map(|u| u.name.clone());
            task.assigned_user_avatar = user.and_then(|u| u.avatar_url.clone());
            task.project_name = task
                .project_id
                .and_then(|id| projects.iter().find(|p| p.id == id))
                .map(|p| p.name.clone());
            task
        })
        .collect()
}
