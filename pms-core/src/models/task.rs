use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::lenient;
use super::{EntityId, Priority};

pub const DEFAULT_TASK_STATUS: &str = "Pending";

fn default_task_status() -> String {
    DEFAULT_TASK_STATUS.to_string()
}

fn status_or_pending<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(default_task_status))
}

/// A unit of work, weakly linked to a project and an assignee.
///
/// The `assigned_user_*` and `project_name` fields are denormalized by the
/// backend for display and are never sent back on writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: EntityId,
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub project_id: Option<EntityId>,
    #[serde(default, alias = "user_id", deserialize_with = "lenient::opt_id")]
    pub assigned_to_user_id: Option<EntityId>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_task_status", deserialize_with = "status_or_pending")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub priority: Priority,
    #[serde(default, with = "lenient::date")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_user_avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
}

impl Task {
    /// Drop the display-only enrichment before persisting.
    pub fn without_enrichment(mut self) -> Self {
        self.assigned_user_name = None;
        self.assigned_user_avatar = None;
        self.project_name = None;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub project_id: Option<EntityId>,
    #[serde(default, alias = "user_id", deserialize_with = "lenient::opt_id")]
    pub assigned_to_user_id: Option<EntityId>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_task_status", deserialize_with = "status_or_pending")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub priority: Priority,
    #[serde(default, with = "lenient::date")]
    pub due_date: Option<DateTime<Utc>>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            project_id: None,
            assigned_to_user_id: None,
            title: title.into(),
            description: None,
            status: default_task_status(),
            priority: Priority::default(),
            due_date: None,
        }
    }

    pub fn for_project(mut self, project_id: EntityId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn assigned_to(mut self, user_id: EntityId) -> Self {
        self.assigned_to_user_id = Some(user_id);
        self
    }

    pub fn into_task(self, id: EntityId) -> Task {
        Task {
            id,
            project_id: self.project_id,
            assigned_to_user_id: self.assigned_to_user_id,
            title: self.title,
            description: self.description,
            status: self.status,
            priority: self.priority,
            due_date: self.due_date,
            assigned_user_name: None,
            assigned_user_avatar: None,
            project_name: None,
        }
    }
}
