//! Sync controller: runs [`SyncRequest`]s against the backend and turns the
//! result into a [`SyncOutcome`] for the state store.
//!
//! Order per mutation: upload (if a file was staged), write, refetch. Any
//! failing step aborts the rest and nothing is reconciled. There are no
//! retries.

use pms_core::models::{EntityId, MediaFile, ProjectDraft};
use pms_core::state::{
    Action, AppState, Effect, ErrorKind, Notice, Reconciliation, RequestToken, SyncOutcome,
    SyncRequest,
};
use thiserror::Error;

use crate::client::{ApiClient, NetworkError};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("media upload failed: {0}")]
    Upload(#[source] NetworkError),
    #[error("request failed: {0}")]
    Request(#[source] NetworkError),
    #[error("refresh failed: {0}")]
    Refetch(#[source] NetworkError),
}

impl SyncError {
    pub fn network(&self) -> &NetworkError {
        match self {
            Self::Upload(e) | Self::Request(e) | Self::Refetch(e) => e,
        }
    }

    pub fn to_notice(&self) -> Notice {
        let kind = match self {
            Self::Upload(_) => ErrorKind::Upload,
            Self::Request(e) => e.kind(),
            Self::Refetch(_) => ErrorKind::Upstream,
        };
        Notice::new(kind, self.network().message())
    }
}

/// Which collections a mutation invalidates.
#[derive(Debug, Clone, Copy, Default)]
struct Refetch {
    projects: bool,
    users: bool,
    tasks: bool,
}

pub struct SyncController {
    client: ApiClient,
}

impl SyncController {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn perform(&self, token: RequestToken, request: SyncRequest) -> SyncOutcome {
        let operation = request.describe();
        let result = self.execute(request).await.map_err(|e| {
            tracing::warn!(operation, error = %e, "Sync failed");
            e.to_notice()
        });
        SyncOutcome { token, result }
    }

    /// Dispatch an action and run any resulting sync work to completion,
    /// applying outcomes in order. Returns the effects left for the caller
    /// (session persistence).
    pub async fn dispatch(&self, state: &mut AppState, action: Action) -> Vec<Effect> {
        let mut pending = state.dispatch(action);
        let mut remaining = Vec::new();
        while !pending.is_empty() {
            let mut next = Vec::new();
            for effect in pending {
                match effect {
                    Effect::Sync { token, request } => {
                        let outcome = self.perform(token, request).await;
                        next.extend(state.apply_sync(outcome));
                    }
                    other => remaining.push(other),
                }
            }
            pending = next;
        }
        remaining
    }

    pub async fn execute(&self, request: SyncRequest) -> Result<Reconciliation, SyncError> {
        match request {
            SyncRequest::LoadAll => {
                let (projects, users, tasks) = tokio::try_join!(
                    self.client.list_projects(),
                    self.client.list_users(),
                    self.client.list_tasks(None),
                )
                .map_err(SyncError::Request)?;
                Ok(Reconciliation {
                    projects: Some(projects),
                    users: Some(users),
                    tasks: Some(tasks),
                })
            }
            SyncRequest::CreateProject { draft, media } => {
                let draft = self.attach_media(draft, media.as_ref()).await?;
                let project = self
                    .client
                    .create_project(&draft)
                    .await
                    .map_err(SyncError::Request)?;
                tracing::info!(project_id = %project.id, "Project created");
                self.refetch(Refetch {
                    projects: true,
                    ..Default::default()
                })
                .await
            }
            SyncRequest::UpdateProject {
                id,
                draft,
                media,
                previous_media,
            } => {
                let draft = self.attach_media(draft, media.as_ref()).await?;
                let saved = self
                    .client
                    .update_project(id, &draft)
                    .await
                    .map_err(SyncError::Request)?;
                if previous_media.is_some() && previous_media != saved.media_url {
                    self.discard_media(previous_media.as_deref()).await;
                }
                self.refetch(Refetch {
                    projects: true,
                    tasks: true,
                    ..Default::default()
                })
                .await
            }
            SyncRequest::DeleteProject { id, media_url } => {
                self.client
                    .delete_project(id)
                    .await
                    .map_err(SyncError::Request)?;
                tracing::info!(project_id = %id, "Project deleted");
                self.discard_media(media_url.as_deref()).await;
                self.refetch(Refetch {
                    projects: true,
                    tasks: true,
                    ..Default::default()
                })
                .await
            }
            SyncRequest::CreateUser(draft) => {
                self.client
                    .create_user(&draft)
                    .await
                    .map_err(SyncError::Request)?;
                self.refetch(Refetch {
                    users: true,
                    ..Default::default()
                })
                .await
            }
            SyncRequest::UpdateUser { id, draft } => {
                self.client
                    .update_user(id, &draft)
                    .await
                    .map_err(SyncError::Request)?;
                self.refetch(Refetch {
                    users: true,
                    tasks: true,
                    ..Default::default()
                })
                .await
            }
            SyncRequest::DeleteUser(id) => {
                self.delete_user(id).await?;
                self.refetch(Refetch {
                    users: true,
                    tasks: true,
                    ..Default::default()
                })
                .await
            }
            SyncRequest::CreateTask(draft) => {
                self.client
                    .create_task(&draft)
                    .await
                    .map_err(SyncError::Request)?;
                self.refetch(Refetch {
                    tasks: true,
                    ..Default::default()
                })
                .await
            }
        }
    }

    async fn delete_user(&self, id: EntityId) -> Result<(), SyncError> {
        self.client
            .delete_user(id)
            .await
            .map_err(SyncError::Request)?;
        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }

    /// Upload the staged file, if any, and point the draft at it.
    async fn attach_media(
        &self,
        mut draft: ProjectDraft,
        media: Option<&MediaFile>,
    ) -> Result<ProjectDraft, SyncError> {
        if let Some(file) = media {
            let uploaded = self
                .client
                .upload_media(file)
                .await
                .map_err(SyncError::Upload)?;
            draft.media_url = Some(uploaded.url);
        }
        Ok(draft)
    }

    /// Best-effort removal of an upload that is no longer referenced.
    async fn discard_media(&self, reference: Option<&str>) {
        let Some(reference) = reference.filter(|r| self.client.owns_upload(r)) else {
            return;
        };
        if let Err(e) = self.client.delete_media(reference).await {
            tracing::warn!(reference, error = %e, "Could not delete unreferenced media");
        }
    }

    async fn refetch(&self, what: Refetch) -> Result<Reconciliation, SyncError> {
        let mut reconciliation = Reconciliation::default();
        if what.projects {
            reconciliation.projects = Some(
                self.client
                    .list_projects()
                    .await
                    .map_err(SyncError::Refetch)?,
            );
        }
        if what.users {
            reconciliation.users =
                Some(self.client.list_users().await.map_err(SyncError::Refetch)?);
        }
        if what.tasks {
            reconciliation.tasks = Some(
                self.client
                    .list_tasks(None)
                    .await
                    .map_err(SyncError::Refetch)?,
            );
        }
        Ok(reconciliation)
    }
}
