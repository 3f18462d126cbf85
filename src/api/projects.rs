use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pms_core::models::{Ack, EntityId, Project, ProjectDraft};

use super::{
    from_value, id_from_request, parse_body, parse_id, parse_value, ApiError, ApiResult, ApiState,
    IdQuery,
};

const ENTITY: &str = "Project";

fn validated(mut draft: ProjectDraft) -> ApiResult<ProjectDraft> {
    if draft.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Project name is required".into()));
    }
    if draft.description.is_none() {
        draft.description = Some(String::new());
    }
    Ok(draft)
}

/// `GET /projects` lists; `GET /projects?id=` reads one.
pub async fn list_or_get(
    State(state): State<ApiState>,
    Query(query): Query<IdQuery>,
) -> ApiResult<Response> {
    match query.id.as_deref() {
        Some(raw) => {
            let project = state.store.get_project(parse_id(raw, ENTITY)?)?;
            Ok(Json(project).into_response())
        }
        None => Ok(Json(state.store.list_projects()?).into_response()),
    }
}

pub async fn get_one(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.store.get_project(parse_id(&id, ENTITY)?)?))
}

pub async fn create(
    State(state): State<ApiState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let draft = validated(parse_body(&body)?)?;
    let project = state.store.create_project(&draft)?;
    Ok((StatusCode::CREATED, Json(project)))
}

fn update(state: &ApiState, id: EntityId, value: serde_json::Value) -> ApiResult<Json<Project>> {
    let draft = validated(from_value(value)?)?;
    let project = state.store.update_project(id, &draft)?;
    tracing::info!(project_id = %id, status = project.status.as_str(), "Updated project");
    Ok(Json(project))
}

/// `PUT /projects` with the id in the body.
pub async fn update_by_body(
    State(state): State<ApiState>,
    Query(query): Query<IdQuery>,
    body: Bytes,
) -> ApiResult<Json<Project>> {
    let value = parse_value(&body)?;
    let id = id_from_request(query.id.as_deref(), &value, ENTITY)?;
    update(&state, id, value)
}

pub async fn update_by_path(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Project>> {
    let id = parse_id(&id, ENTITY)?;
    update(&state, id, parse_value(&body)?)
}

fn remove(state: &ApiState, id: EntityId) -> ApiResult<Json<Ack>> {
    state.store.delete_project(id)?;
    Ok(Json(Ack::ok("Project deleted successfully")))
}

/// `DELETE /projects` with the id in the body or `?id=`.
pub async fn delete_by_body(
    State(state): State<ApiState>,
    Query(query): Query<IdQuery>,
    body: Bytes,
) -> ApiResult<Json<Ack>> {
    let value = parse_value(&body)?;
    let id = id_from_request(query.id.as_deref(), &value, ENTITY)?;
    remove(&state, id)
}

pub async fn delete_by_path(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Ack>> {
    remove(&state, parse_id(&id, ENTITY)?)
}
