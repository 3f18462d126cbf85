//! HTTP persistence backend.
//!
//! Serves projects, users, tasks and media uploads under `/api`. Single
//! record routes accept the id either in the path (`/api/projects/{id}`) or in
//! the body / query string (`/api/projects` and the `.php` aliases), so both
//! endpoint profiles work against the same server.

mod error;
mod projects;
mod tasks;
mod upload;
mod users;

pub use error::{ApiError, ApiResult};
pub use upload::MAX_UPLOAD_BYTES;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, MethodRouter};
use axum::Router;
use pms_core::models::EntityId;
use pms_core::{Database, JsonFileStore, Store, StoreError};
use serde::de::DeserializeOwned;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Which persistence store backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StoreKind {
    /// `database.json` flat file.
    Json,
    /// `pms.db` SQLite database.
    Sqlite,
}

pub fn open_store(kind: StoreKind, data_dir: &Path) -> Result<Arc<dyn Store>, StoreError> {
    std::fs::create_dir_all(data_dir)?;
    let store: Arc<dyn Store> = match kind {
        StoreKind::Json => Arc::new(JsonFileStore::open(data_dir.join("database.json"))?),
        StoreKind::Sqlite => {
            let db = Database::open(data_dir.join("pms.db"))?;
            db.migrate()?;
            Arc::new(db)
        }
    };
    Ok(store)
}

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn Store>,
    pub uploads_dir: PathBuf,
}

fn project_routes() -> MethodRouter<ApiState> {
    get(projects::list_or_get)
        .post(projects::create)
        .put(projects::update_by_body)
        .delete(projects::delete_by_body)
}

fn user_routes() -> MethodRouter<ApiState> {
    get(users::list_or_get)
        .post(users::create)
        .put(users::update_by_body)
        .delete(users::delete_by_body)
}

fn task_routes() -> MethodRouter<ApiState> {
    get(tasks::list).post(tasks::create)
}

fn upload_routes() -> MethodRouter<ApiState> {
    post(upload::upload)
        .delete(upload::delete_by_query)
        .layer(DefaultBodyLimit::max(upload::BODY_LIMIT))
}

pub fn create_router(store: Arc<dyn Store>, uploads_dir: PathBuf) -> Router {
    let state = ApiState {
        store,
        uploads_dir: uploads_dir.clone(),
    };

    let api = Router::new()
        .route("/projects", project_routes())
        .route("/projects.php", project_routes())
        .route(
            "/projects/{id}",
            get(projects::get_one)
                .put(projects::update_by_path)
                .delete(projects::delete_by_path),
        )
        .route("/users", user_routes())
        .route("/users.php", user_routes())
        .route(
            "/users/{id}",
            get(users::get_one)
                .put(users::update_by_path)
                .delete(users::delete_by_path),
        )
        .route("/tasks", task_routes())
        .route("/tasks.php", task_routes())
        .route("/upload", upload_routes())
        .route("/upload.php", upload_routes())
        .route("/upload/{filename}", delete(upload::delete_by_path));

    Router::new()
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Decode a JSON body; an empty body reads as `{}`.
fn parse_value(body: &Bytes) -> ApiResult<serde_json::Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::json!({}));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {e}")))
}

fn from_value<T: DeserializeOwned>(value: serde_json::Value) -> ApiResult<T> {
    serde_json::from_value(value).map_err(|e| ApiError::BadRequest(format!("Invalid record: {e}")))
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    from_value(parse_value(body)?)
}

/// Ids from the path or query; anything unparseable is treated as unknown.
fn parse_id(raw: &str, entity: &'static str) -> ApiResult<EntityId> {
    raw.parse()
        .map_err(|_| ApiError::NotFound(format!("{entity} not found")))
}

/// Id from the query string or the JSON body, in that order.
fn id_from_request(
    query: Option<&str>,
    body: &serde_json::Value,
    entity: &'static str,
) -> ApiResult<EntityId> {
    match query.filter(|q| !q.trim().is_empty()) {
        Some(raw) => parse_id(raw, entity),
        None => pms_core::models::id_from_body(body)
            .ok_or_else(|| ApiError::BadRequest(format!("{entity} ID required"))),
    }
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}
