//! End-to-end: the sync controller against a live backend on a random port.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::routing::{delete, get};
use axum::{Json, Router};

use pms::api::{self, StoreKind};
use pms::client::{ApiClient, EndpointProfile};
use pms::SyncController;
use pms_core::models::{EntityId, MediaFile, ProjectDraft, TaskDraft, UserDraft, UserRole};
use pms_core::state::{Action, DraftEdit, Effect, ErrorKind};
use pms_core::AppState;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Backend {
    url: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
    _dir: Option<TempDir>,
}

impl Backend {
    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.handle.await;
    }
}

async fn serve_router(app: Router, dir: Option<TempDir>) -> Backend {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address: SocketAddr = listener.local_addr().expect("local addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    Backend {
        url: format!("http://{address}"),
        shutdown: Some(shutdown_tx),
        handle,
        _dir: dir,
    }
}

async fn spawn_backend(kind: StoreKind) -> Backend {
    let dir = TempDir::new().expect("tempdir");
    let store = api::open_store(kind, dir.path()).expect("open store");
    let app = api::create_router(store, dir.path().join("uploads"));
    serve_router(app, Some(dir)).await
}

/// A backend answering deletes with `{"message": ..}` only, as the Node
/// server does.
async fn spawn_message_only_backend() -> Backend {
    type Projects = Arc<Mutex<Vec<Value>>>;

    async fn list(State(projects): State<Projects>) -> Json<Value> {
        Json(Value::Array(projects.lock().unwrap().clone()))
    }

    async fn remove(State(projects): State<Projects>, Path(id): Path<i64>) -> Json<Value> {
        projects.lock().unwrap().retain(|p| p["id"] != json!(id));
        Json(json!({ "message": "Project deleted" }))
    }

    let projects: Projects = Arc::new(Mutex::new(vec![
        json!({"id": 1, "name": "Atlas", "status": "In Development"}),
        json!({"id": 2, "name": "Orbit", "status": "Planning"}),
    ]));
    let app = Router::new()
        .route("/api/projects", get(list))
        .route("/api/projects/{id}", delete(remove))
        .route(
            "/api/users",
            get(|| async { Json(json!([{"id": 1, "name": "Root", "role": "Admin"}])) }),
        )
        .route("/api/tasks", get(|| async { Json(json!([])) }))
        .with_state(projects);
    serve_router(app, None).await
}

fn controller(backend: &Backend, profile: EndpointProfile) -> SyncController {
    SyncController::new(ApiClient::new(&backend.url, profile, None).expect("client"))
}

/// Seed an admin and log them in.
async fn admin_session(sync: &SyncController) -> AppState {
    sync.client()
        .create_user(&UserDraft::new("Root", UserRole::Admin))
        .await
        .expect("seed admin");
    let mut state = AppState::new(None);
    let effects = state.start();
    assert!(matches!(effects.as_slice(), [Effect::Sync { .. }]));
    sync.dispatch(&mut state, Action::Refresh).await;
    let admin = state.users[0].id;
    let persisted = sync.dispatch(&mut state, Action::Login(admin)).await;
    assert_eq!(persisted, vec![Effect::PersistSession(Some(admin))]);
    state
}

#[tokio::test]
async fn load_all_resolves_saved_session() {
    let backend = spawn_backend(StoreKind::Json).await;
    let sync = controller(&backend, EndpointProfile::nodejs());
    let user = sync
        .client()
        .create_user(&UserDraft::new("Ana", UserRole::Team))
        .await
        .unwrap();

    let mut state = AppState::new(Some(user.id));
    assert!(!state.loaded);
    sync.dispatch(&mut state, Action::Refresh).await;

    assert!(state.loaded);
    assert_eq!(state.current_user.as_ref().map(|u| u.id), Some(user.id));
    assert!(!state.can_manage());
    backend.stop().await;
}

#[tokio::test]
async fn create_then_delete_cascades_tasks() {
    let backend = spawn_backend(StoreKind::Sqlite).await;
    let sync = controller(&backend, EndpointProfile::nodejs());
    let mut state = admin_session(&sync).await;

    sync.dispatch(
        &mut state,
        Action::CreateProject {
            draft: ProjectDraft::new("Atlas"),
            media: None,
        },
    )
    .await;
    assert_eq!(state.projects.len(), 1);
    let project_id = state.projects[0].id;

    sync.dispatch(
        &mut state,
        Action::CreateTask(TaskDraft::new("Wire up").for_project(project_id)),
    )
    .await;
    assert_eq!(state.tasks.len(), 1);

    sync.dispatch(&mut state, Action::OpenProject(project_id)).await;
    sync.dispatch(&mut state, Action::RequestDelete).await;
    assert_eq!(state.pending_delete, Some(project_id));
    sync.dispatch(&mut state, Action::ConfirmDelete).await;

    assert!(state.notice.is_none());
    assert!(state.projects.is_empty());
    assert!(state.tasks.is_empty());
    assert!(state.current_entity.is_none());
    assert!(!state.is_submitting());
    backend.stop().await;
}

#[tokio::test]
async fn rejected_upload_leaves_projects_unchanged() {
    let backend = spawn_backend(StoreKind::Json).await;
    let sync = controller(&backend, EndpointProfile::nodejs());
    let mut state = admin_session(&sync).await;

    sync.dispatch(
        &mut state,
        Action::CreateProject {
            draft: ProjectDraft::new("Orbit"),
            media: Some(MediaFile::new("notes.txt", "text/plain", b"hi".to_vec())),
        },
    )
    .await;

    let notice = state.notice.clone().expect("notice");
    assert_eq!(notice.kind, ErrorKind::Upload);
    assert!(state.projects.is_empty());
    assert!(sync.client().list_projects().await.unwrap().is_empty());
    backend.stop().await;
}

#[tokio::test]
async fn staged_image_is_uploaded_with_the_edit() {
    let backend = spawn_backend(StoreKind::Json).await;
    let sync = controller(&backend, EndpointProfile::nodejs());
    let mut state = admin_session(&sync).await;
    sync.dispatch(
        &mut state,
        Action::CreateProject {
            draft: ProjectDraft::new("Orbit"),
            media: None,
        },
    )
    .await;
    let id = state.projects[0].id;

    sync.dispatch(&mut state, Action::OpenProject(id)).await;
    sync.dispatch(&mut state, Action::BeginEdit).await;
    sync.dispatch(
        &mut state,
        Action::EditDraft(DraftEdit::StageMedia(MediaFile::new(
            "cover.png",
            "image/png",
            vec![137, 80, 78, 71],
        ))),
    )
    .await;
    sync.dispatch(&mut state, Action::EditDraft(DraftEdit::Progress(60))).await;
    sync.dispatch(&mut state, Action::SaveEdit).await;

    assert!(state.notice.is_none());
    assert!(!state.edit_mode);
    let project = &state.projects[0];
    assert_eq!(project.progress, 60);
    let media = project.media_url.as_deref().expect("media url");
    assert!(media.starts_with("/uploads/"));
    assert_eq!(state.current_entity.as_ref(), Some(project));
    backend.stop().await;
}

#[tokio::test]
async fn failed_update_keeps_local_state() {
    let backend = spawn_backend(StoreKind::Sqlite).await;
    let sync = controller(&backend, EndpointProfile::nodejs());
    let mut state = admin_session(&sync).await;
    sync.dispatch(
        &mut state,
        Action::CreateProject {
            draft: ProjectDraft::new("Vanishing"),
            media: None,
        },
    )
    .await;
    let id = state.projects[0].id;
    let before = state.projects.clone();

    // Removed behind the client's back.
    sync.client().delete_project(id).await.unwrap();

    sync.dispatch(&mut state, Action::OpenProject(id)).await;
    sync.dispatch(&mut state, Action::BeginEdit).await;
    sync.dispatch(
        &mut state,
        Action::EditDraft(DraftEdit::Name("Renamed".into())),
    )
    .await;
    sync.dispatch(&mut state, Action::SaveEdit).await;

    let notice = state.notice.clone().expect("notice");
    assert_eq!(notice.kind, ErrorKind::NotFound);
    assert_eq!(notice.message, "Project not found");
    assert_eq!(state.projects, before);
    assert!(state.edit_mode);
    backend.stop().await;
}

#[tokio::test]
async fn php_profile_round_trips_against_the_same_backend() {
    let backend = spawn_backend(StoreKind::Json).await;
    let sync = controller(&backend, EndpointProfile::php());
    let mut state = admin_session(&sync).await;

    sync.dispatch(
        &mut state,
        Action::CreateUser(UserDraft::new("Temp", UserRole::Team)),
    )
    .await;
    assert_eq!(state.users.len(), 2);
    let temp = state.users.iter().find(|u| u.name == "Temp").unwrap().id;

    let mut draft = UserDraft::new("Temp", UserRole::Team);
    draft.title = "Designer".into();
    sync.dispatch(&mut state, Action::UpdateUser { id: temp, draft }).await;
    let updated = state.users.iter().find(|u| u.id == temp).unwrap();
    assert_eq!(updated.title, "Designer");

    sync.dispatch(&mut state, Action::DeleteUser(temp)).await;
    assert_eq!(state.users.len(), 1);
    assert!(state.notice.is_none());
    backend.stop().await;
}

#[tokio::test]
async fn deleting_the_signed_in_user_clears_the_session() {
    let backend = spawn_backend(StoreKind::Json).await;
    let sync = controller(&backend, EndpointProfile::nodejs());
    let mut state = admin_session(&sync).await;
    let me = state.current_user.as_ref().unwrap().id;

    let effects = sync.dispatch(&mut state, Action::DeleteUser(me)).await;

    assert!(state.current_user.is_none());
    assert!(effects.contains(&Effect::PersistSession(None)));
    backend.stop().await;
}

#[tokio::test]
async fn message_only_delete_reply_still_reconciles() {
    let backend = spawn_message_only_backend().await;
    let sync = controller(&backend, EndpointProfile::nodejs());
    let mut state = AppState::new(Some(EntityId::new(1)));
    sync.dispatch(&mut state, Action::Refresh).await;
    assert!(state.can_manage());
    assert_eq!(state.projects.len(), 2);

    sync.dispatch(&mut state, Action::OpenProject(EntityId::new(1))).await;
    sync.dispatch(&mut state, Action::RequestDelete).await;
    sync.dispatch(&mut state, Action::ConfirmDelete).await;

    assert!(state.notice.is_none(), "unexpected notice: {:?}", state.notice);
    assert_eq!(state.projects.len(), 1);
    assert_eq!(state.projects[0].name, "Orbit");
    assert!(state.current_entity.is_none());
    backend.stop().await;
}

#[tokio::test]
async fn single_reads_work_with_both_id_placements() {
    let backend = spawn_backend(StoreKind::Sqlite).await;
    for profile in [EndpointProfile::nodejs(), EndpointProfile::php()] {
        let client = ApiClient::new(&backend.url, profile, None).unwrap();
        let project = client.create_project(&ProjectDraft::new("Atlas")).await.unwrap();
        let user = client
            .create_user(&UserDraft::new("Ana", UserRole::Team))
            .await
            .unwrap();

        assert_eq!(client.get_project(project.id).await.unwrap(), project);
        assert_eq!(client.get_user(user.id).await.unwrap(), user);

        let missing = client.get_project(EntityId::new(999)).await.unwrap_err();
        assert_eq!(missing.status(), Some(404));
    }
    backend.stop().await;
}
