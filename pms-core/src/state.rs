//! Application state store.
//!
//! All mutation goes through [`AppState::dispatch`] (user actions) and
//! [`AppState::apply_sync`] (completed network work). Neither performs I/O:
//! they return [`Effect`]s for the caller to execute. Network results carry
//! the [`RequestToken`] they were issued with, and a result whose token has
//! been superseded by a newer request of the same kind is discarded.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::derive::{FilterId, SortField, SortSpec};
use crate::models::{
    EntityId, MediaFile, Priority, Project, ProjectDraft, ProjectStatus, Task, TaskDraft, User,
    UserDraft,
};

/// Failure classes surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Upstream,
    Upload,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Upstream => "upstream",
            Self::Upload => "upload",
        }
    }
}

/// A blocking notification shown until dismissed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: ErrorKind,
    pub message: String,
}

impl Notice {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SectionId {
    #[default]
    Dashboard,
    Ideas,
    Team,
    MyTasks,
}

impl SectionId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dashboard => "projects",
            Self::Ideas => "ideas",
            Self::Team => "team",
            Self::MyTasks => "mytasks",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "projects" => Some(Self::Dashboard),
            "ideas" => Some(Self::Ideas),
            "team" => Some(Self::Team),
            "mytasks" => Some(Self::MyTasks),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Ideas => "Future Concepts",
            Self::Team => "Team",
            Self::MyTasks => "My Tasks",
        }
    }

    pub fn all() -> [SectionId; 4] {
        [Self::Dashboard, Self::Ideas, Self::Team, Self::MyTasks]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Grid => Self::List,
            Self::List => Self::Grid,
        }
    }
}

/// Requests of the same kind supersede each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Load,
    Project,
    User,
    Task,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken {
    pub kind: RequestKind,
    pub generation: u64,
}

#[derive(Debug, Default)]
struct RequestLedger {
    issued: u64,
    latest: HashMap<RequestKind, u64>,
}

impl RequestLedger {
    fn issue(&mut self, kind: RequestKind) -> RequestToken {
        self.issued += 1;
        self.latest.insert(kind, self.issued);
        RequestToken {
            kind,
            generation: self.issued,
        }
    }

    fn is_current(&self, token: RequestToken) -> bool {
        self.latest.get(&token.kind) == Some(&token.generation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Idle,
    Submitting(RequestToken),
}

/// Work for the sync controller. Each variant is one user-level operation.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncRequest {
    LoadAll,
    CreateProject {
        draft: ProjectDraft,
        media: Option<MediaFile>,
    },
    UpdateProject {
        id: EntityId,
        draft: ProjectDraft,
        media: Option<MediaFile>,
        /// Media reference before the edit, deleted if the save replaces it.
        previous_media: Option<String>,
    },
    DeleteProject {
        id: EntityId,
        media_url: Option<String>,
    },
    CreateUser(UserDraft),
    UpdateUser {
        id: EntityId,
        draft: UserDraft,
    },
    DeleteUser(EntityId),
    CreateTask(TaskDraft),
}

impl SyncRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::LoadAll => RequestKind::Load,
            Self::CreateProject { .. } | Self::UpdateProject { .. } | Self::DeleteProject { .. } => {
                RequestKind::Project
            }
            Self::CreateUser(_) | Self::UpdateUser { .. } | Self::DeleteUser(_) => {
                RequestKind::User
            }
            Self::CreateTask(_) => RequestKind::Task,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::LoadAll => "load",
            Self::CreateProject { .. } => "create project",
            Self::UpdateProject { .. } => "update project",
            Self::DeleteProject { .. } => "delete project",
            Self::CreateUser(_) => "create user",
            Self::UpdateUser { .. } => "update user",
            Self::DeleteUser(_) => "delete user",
            Self::CreateTask(_) => "create task",
        }
    }
}

/// Freshly fetched collections; `None` leaves that collection untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub projects: Option<Vec<Project>>,
    pub users: Option<Vec<User>>,
    pub tasks: Option<Vec<Task>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    pub token: RequestToken,
    pub result: Result<Reconciliation, Notice>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Sync {
        token: RequestToken,
        request: SyncRequest,
    },
    /// Persist (or with `None`, clear) the durable session pointer.
    PersistSession(Option<EntityId>),
}

/// A single field change to the edit draft.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftEdit {
    Name(String),
    Description(Option<String>),
    Status(ProjectStatus),
    CycleStatus,
    Priority(Priority),
    CyclePriority,
    Progress(i64),
    TechStack(Vec<String>),
    StartDate(Option<DateTime<Utc>>),
    Deadline(Option<DateTime<Utc>>),
    EstimatedDuration(Option<String>),
    StageMedia(MediaFile),
    ClearMedia,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Login(EntityId),
    Logout,
    ShowSection(SectionId),
    SetFilter(FilterId),
    SortBy(SortField),
    ToggleViewMode,
    SetSearch(String),
    OpenProject(EntityId),
    CloseProject,
    BeginEdit,
    EditDraft(DraftEdit),
    CancelEdit,
    SaveEdit,
    CreateProject {
        draft: ProjectDraft,
        media: Option<MediaFile>,
    },
    RequestDelete,
    ConfirmDelete,
    CancelDelete,
    CreateUser(UserDraft),
    UpdateUser {
        id: EntityId,
        draft: UserDraft,
    },
    DeleteUser(EntityId),
    CreateTask(TaskDraft),
    Refresh,
    DismissNotice,
}

#[derive(Debug, Default)]
pub struct AppState {
    pub projects: Vec<Project>,
    pub users: Vec<User>,
    pub tasks: Vec<Task>,
    pub current_user: Option<User>,
    pub active_section: SectionId,
    pub current_filter: FilterId,
    pub sort: Option<SortSpec>,
    pub view_mode: ViewMode,
    pub current_entity: Option<Project>,
    pub edit_mode: bool,
    pub edit_draft: Option<ProjectDraft>,
    pub staged_media: Option<MediaFile>,
    pub search_query: String,
    pub pending_delete: Option<EntityId>,
    pub notice: Option<Notice>,
    pub sync: SyncPhase,
    /// Set after the first successful load.
    pub loaded: bool,
    saved_session: Option<EntityId>,
    requests: RequestLedger,
}

impl AppState {
    /// `saved_session` is the persisted user id, resolved once users load.
    pub fn new(saved_session: Option<EntityId>) -> Self {
        Self {
            saved_session,
            ..Default::default()
        }
    }

    /// Effects to run at startup.
    pub fn start(&mut self) -> Vec<Effect> {
        self.dispatch(Action::Refresh)
    }

    pub fn can_manage(&self) -> bool {
        self.current_user
            .as_ref()
            .is_some_and(|u| u.role.is_admin())
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.sync, SyncPhase::Submitting(_))
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.requests.is_current(token)
    }

    pub fn dispatch(&mut self, action: Action) -> Vec<Effect> {
        tracing::debug!(?action, "dispatch");
        match action {
            Action::Login(id) => match self.users.iter().find(|u| u.id == id) {
                Some(user) => {
                    tracing::info!(user_id = %id, "Logged in");
                    self.current_user = Some(user.clone());
                    self.saved_session = Some(id);
                    vec![Effect::PersistSession(Some(id))]
                }
                None => self.fail(ErrorKind::NotFound, "User not found"),
            },
            Action::Logout => {
                self.current_user = None;
                self.saved_session = None;
                self.close_project();
                vec![Effect::PersistSession(None)]
            }
            Action::ShowSection(section) => {
                self.active_section = section;
                self.close_project();
                Vec::new()
            }
            Action::SetFilter(filter) => {
                self.current_filter = filter;
                Vec::new()
            }
            Action::SortBy(field) => {
                self.sort = Some(SortSpec::toggle(self.sort, field));
                Vec::new()
            }
            Action::ToggleViewMode => {
                self.view_mode = self.view_mode.toggled();
                Vec::new()
            }
            Action::SetSearch(query) => {
                self.search_query = query;
                Vec::new()
            }
            Action::OpenProject(id) => match self.projects.iter().find(|p| p.id == id) {
                Some(project) => {
                    let project = project.clone();
                    self.close_project();
                    self.current_entity = Some(project);
                    Vec::new()
                }
                None => self.fail(ErrorKind::NotFound, "Project not found"),
            },
            Action::CloseProject => {
                self.close_project();
                Vec::new()
            }
            Action::BeginEdit => {
                if !self.can_manage() {
                    return self.fail(ErrorKind::Validation, "Only admins can edit projects");
                }
                match &self.current_entity {
                    Some(project) => {
                        self.edit_draft = Some(project.to_draft());
                        self.staged_media = None;
                        self.edit_mode = true;
                        Vec::new()
                    }
                    None => self.fail(ErrorKind::Validation, "No project selected"),
                }
            }
            Action::EditDraft(edit) => {
                self.apply_edit(edit);
                Vec::new()
            }
            Action::CancelEdit => {
                self.exit_edit();
                Vec::new()
            }
            Action::SaveEdit => self.save_edit(),
            Action::CreateProject { draft, media } => {
                if draft.name.trim().is_empty() {
                    return self.fail(ErrorKind::Validation, "Project name is required");
                }
                self.submit(SyncRequest::CreateProject { draft, media })
            }
            Action::RequestDelete => {
                if !self.can_manage() {
                    return self.fail(ErrorKind::Validation, "Only admins can delete projects");
                }
                match &self.current_entity {
                    Some(project) => {
                        self.pending_delete = Some(project.id);
                        Vec::new()
                    }
                    None => self.fail(ErrorKind::Validation, "No project selected"),
                }
            }
            Action::ConfirmDelete => match self.pending_delete.take() {
                Some(id) => {
                    let media_url = self
                        .projects
                        .iter()
                        .find(|p| p.id == id)
                        .and_then(|p| p.media_url.clone());
                    self.submit(SyncRequest::DeleteProject { id, media_url })
                }
                None => Vec::new(),
            },
            Action::CancelDelete => {
                self.pending_delete = None;
                Vec::new()
            }
            Action::CreateUser(draft) => {
                if draft.name.trim().is_empty() {
                    return self.fail(ErrorKind::Validation, "User name is required");
                }
                self.submit(SyncRequest::CreateUser(draft))
            }
            Action::UpdateUser { id, draft } => self.submit(SyncRequest::UpdateUser { id, draft }),
            Action::DeleteUser(id) => self.submit(SyncRequest::DeleteUser(id)),
            Action::CreateTask(draft) => {
                if draft.title.trim().is_empty() {
                    return self.fail(ErrorKind::Validation, "Task title is required");
                }
                self.submit(SyncRequest::CreateTask(draft))
            }
            Action::Refresh => {
                let token = self.requests.issue(RequestKind::Load);
                vec![Effect::Sync {
                    token,
                    request: SyncRequest::LoadAll,
                }]
            }
            Action::DismissNotice => {
                self.notice = None;
                Vec::new()
            }
        }
    }

    /// Apply a completed request. Stale results are dropped; failures only
    /// raise a notice and never touch the collections.
    pub fn apply_sync(&mut self, outcome: SyncOutcome) -> Vec<Effect> {
        let SyncOutcome { token, result } = outcome;
        if !self.requests.is_current(token) {
            tracing::debug!(?token, "Discarding superseded result");
            return Vec::new();
        }
        if self.sync == SyncPhase::Submitting(token) {
            self.sync = SyncPhase::Idle;
        }

        let reconciliation = match result {
            Ok(reconciliation) => reconciliation,
            Err(notice) => {
                tracing::warn!(kind = notice.kind.as_str(), message = %notice.message, "Request failed");
                self.notice = Some(notice);
                return Vec::new();
            }
        };

        let mut effects = Vec::new();
        if let Some(projects) = reconciliation.projects {
            self.projects = projects;
            self.refresh_current_entity();
        }
        if let Some(tasks) = reconciliation.tasks {
            self.tasks = tasks;
        }
        if let Some(users) = reconciliation.users {
            self.users = users;
            effects.extend(self.resolve_session());
        }
        match token.kind {
            RequestKind::Load => self.loaded = true,
            RequestKind::Project => {
                self.exit_edit();
                self.pending_delete = None;
            }
            RequestKind::User | RequestKind::Task => {}
        }
        effects
    }

    fn submit(&mut self, request: SyncRequest) -> Vec<Effect> {
        let token = self.requests.issue(request.kind());
        tracing::info!(operation = request.describe(), generation = token.generation, "Submitting");
        self.sync = SyncPhase::Submitting(token);
        vec![Effect::Sync { token, request }]
    }

    fn fail(&mut self, kind: ErrorKind, message: &str) -> Vec<Effect> {
        self.notice = Some(Notice::new(kind, message));
        Vec::new()
    }

    fn save_edit(&mut self) -> Vec<Effect> {
        let request = match (&self.current_entity, &self.edit_draft) {
            (Some(project), Some(draft)) if !draft.name.trim().is_empty() => {
                Ok(SyncRequest::UpdateProject {
                    id: project.id,
                    draft: draft.clone(),
                    media: self.staged_media.clone(),
                    previous_media: project.media_url.clone(),
                })
            }
            (Some(_), Some(_)) => Err("Project name is required"),
            _ => Err("Nothing to save"),
        };
        match request {
            Ok(request) => self.submit(request),
            Err(message) => self.fail(ErrorKind::Validation, message),
        }
    }

    fn apply_edit(&mut self, edit: DraftEdit) {
        let Some(draft) = self.edit_draft.as_mut() else {
            return;
        };
        match edit {
            DraftEdit::Name(name) => draft.name = name,
            DraftEdit::Description(description) => draft.description = description,
            DraftEdit::Status(status) => draft.status = status,
            DraftEdit::CycleStatus => draft.status = draft.status.next(),
            DraftEdit::Priority(priority) => draft.priority = priority,
            DraftEdit::CyclePriority => draft.priority = draft.priority.next(),
            DraftEdit::Progress(progress) => draft.progress = progress,
            DraftEdit::TechStack(tags) => draft.tech_stack = tags,
            DraftEdit::StartDate(date) => draft.start_date = date,
            DraftEdit::Deadline(date) => draft.deadline = date,
            DraftEdit::EstimatedDuration(duration) => draft.estimated_duration = duration,
            DraftEdit::StageMedia(file) => self.staged_media = Some(file),
            DraftEdit::ClearMedia => {
                draft.media_url = None;
                self.staged_media = None;
            }
        }
    }

    fn exit_edit(&mut self) {
        self.edit_mode = false;
        self.edit_draft = None;
        self.staged_media = None;
    }

    fn close_project(&mut self) {
        self.exit_edit();
        self.current_entity = None;
        self.pending_delete = None;
    }

    fn refresh_current_entity(&mut self) {
        let Some(id) = self.current_entity.as_ref().map(|p| p.id) else {
            return;
        };
        match self.projects.iter().find(|p| p.id == id) {
            Some(project) => self.current_entity = Some(project.clone()),
            None => self.close_project(),
        }
    }

    /// Re-resolve the current user against a fresh users collection.
    fn resolve_session(&mut self) -> Vec<Effect> {
        let wanted = self
            .current_user
            .as_ref()
            .map(|u| u.id)
            .or(self.saved_session);
        let Some(id) = wanted else {
            return Vec::new();
        };
        match self.users.iter().find(|u| u.id == id) {
            Some(user) => {
                self.current_user = Some(user.clone());
                Vec::new()
            }
            None => {
                tracing::info!(user_id = %id, "Saved session no longer resolves");
                self.current_user = None;
                self.saved_session = None;
                vec![Effect::PersistSession(None)]
            }
        }
    }
}
