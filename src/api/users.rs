use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pms_core::models::{Ack, EntityId, User, UserDraft};

use super::{
    from_value, id_from_request, parse_body, parse_id, parse_value, ApiError, ApiResult, ApiState,
    IdQuery,
};

const ENTITY: &str = "User";

/// Generated avatar for users created without one.
pub fn default_avatar_url(name: &str) -> String {
    format!(
        "https://ui-avatars.com/api/?name={}",
        urlencoding::encode(name)
    )
}

fn validated(mut draft: UserDraft) -> ApiResult<UserDraft> {
    if draft.name.trim().is_empty() {
        return Err(ApiError::BadRequest("User name is required".into()));
    }
    if draft.avatar_url.as_deref().map_or(true, |a| a.trim().is_empty()) {
        draft.avatar_url = Some(default_avatar_url(&draft.name));
    }
    Ok(draft)
}

pub async fn list_or_get(
    State(state): State<ApiState>,
    Query(query): Query<IdQuery>,
) -> ApiResult<Response> {
    match query.id.as_deref() {
        Some(raw) => {
            let user = state.store.get_user(parse_id(raw, ENTITY)?)?;
            Ok(Json(user).into_response())
        }
        None => Ok(Json(state.store.list_users()?).into_response()),
    }
}

pub async fn get_one(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult<Json<User>> {
    Ok(Json(state.store.get_user(parse_id(&id, ENTITY)?)?))
}

pub async fn create(
    State(state): State<ApiState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<User>)> {
    let draft = validated(parse_body(&body)?)?;
    let user = state.store.create_user(&draft)?;
    tracing::info!(user_id = %user.id, role = user.role.as_str(), "Created user");
    Ok((StatusCode::CREATED, Json(user)))
}

fn update(state: &ApiState, id: EntityId, value: serde_json::Value) -> ApiResult<Json<User>> {
    let draft = validated(from_value(value)?)?;
    Ok(Json(state.store.update_user(id, &draft)?))
}

pub async fn update_by_body(
    State(state): State<ApiState>,
    Query(query): Query<IdQuery>,
    body: Bytes,
) -> ApiResult<Json<User>> {
    let value = parse_value(&body)?;
    let id = id_from_request(query.id.as_deref(), &value, ENTITY)?;
    update(&state, id, value)
}

pub async fn update_by_path(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<User>> {
    let id = parse_id(&id, ENTITY)?;
    update(&state, id, parse_value(&body)?)
}

fn remove(state: &ApiState, id: EntityId) -> ApiResult<Json<Ack>> {
    state.store.delete_user(id)?;
    Ok(Json(Ack::ok("User deleted successfully")))
}

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avatar_url_encodes_the_name() {
        assert_eq!(
            default_avatar_url("Ana María"),
            "https://ui-avatars.com/api/?name=Ana%20Mar%C3%ADa"
        );
    }
}
