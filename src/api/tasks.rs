use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use pms_core::models::{Task, TaskDraft};
use serde::Deserialize;

use super::{parse_body, parse_id, ApiError, ApiResult, ApiState};

#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    pub project_id: Option<String>,
}

pub async fn list(
    State(state): State<ApiState>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let project_id = match query.project_id.as_deref().filter(|p| !p.trim().is_empty()) {
        Some(raw) => Some(parse_id(raw, "Project")?),
        None => None,
    };
    Ok(Json(state.store.list_tasks(project_id)?))
}

pub async fn create(
    State(state): State<ApiState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let draft: TaskDraft = parse_body(&body)?;
    if draft.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Task title is required".into()));
    }
    let task = state.store.create_task(&draft)?;
    tracing::info!(task_id = %task.id, project_id = ?task.project_id, "Created task");
    Ok((StatusCode::CREATED, Json(task)))
}
