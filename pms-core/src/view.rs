//! View models: what each section shows for a given state.
//!
//! Front-ends draw these and nothing else, so everything a screen displays
//! is decided (and testable) here.

use crate::derive::{
    self, sort_indicator, FilterId, ProjectStats, SortField, SortIndicator,
};
use crate::models::{is_video_url, EntityId, Project, ProjectDraft, Task, TeamRequirement};
use crate::state::{AppState, Notice, SectionId, ViewMode};

#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel {
    pub screen: Screen,
    pub notice: Option<Notice>,
    pub submitting: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Loading,
    Login(Vec<LoginChoice>),
    Section(SectionView),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginChoice {
    pub id: EntityId,
    pub name: String,
    pub role: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionView {
    pub section: SectionId,
    pub title: &'static str,
    pub user_name: String,
    pub user_role: String,
    pub can_manage: bool,
    pub view_mode: ViewMode,
    pub body: SectionBody,
    pub detail: Option<DetailView>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionBody {
    Dashboard(DashboardView),
    Ideas(Vec<ProjectRow>),
    Team(Vec<MemberRow>),
    MyTasks(Vec<TaskRow>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub stats: ProjectStats,
    pub filters: Vec<FilterChip>,
    pub columns: Vec<ColumnHeader>,
    pub search: String,
    pub projects: Vec<ProjectRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterChip {
    pub filter: FilterId,
    pub label: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnHeader {
    pub field: SortField,
    pub label: &'static str,
    pub indicator: SortIndicator,
}

/// Card background, cycling by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardAccent {
    Rose,
    Mint,
    Sky,
    Sand,
}

impl CardAccent {
    pub fn for_index(index: usize) -> Self {
        match index % 4 {
            0 => Self::Rose,
            1 => Self::Mint,
            2 => Self::Sky,
            _ => Self::Sand,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaKind {
    Image(String),
    Video(String),
}

impl MediaKind {
    pub fn from_url(url: &str) -> Self {
        if is_video_url(url) {
            Self::Video(url.to_string())
        } else {
            Self::Image(url.to_string())
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Image(url) | Self::Video(url) => url,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRow {
    pub id: EntityId,
    pub name: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub progress: i64,
    /// Progress clamped to 0..=100 for drawing bars.
    pub display_progress: u16,
    pub start_date: Option<String>,
    pub deadline: Option<String>,
    pub tech_stack: Vec<String>,
    pub accent: CardAccent,
    pub media: Option<MediaKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskRow {
    pub id: EntityId,
    pub title: String,
    pub status: String,
    pub priority: String,
    pub due_date: Option<String>,
    pub project_name: Option<String>,
    pub assignee: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberRow {
    pub id: EntityId,
    pub name: String,
    pub role: String,
    pub title: String,
    pub avatar_url: Option<String>,
    pub assigned_tasks: usize,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailView {
    pub project: ProjectRow,
    pub estimated_duration: Option<String>,
    pub required_team: Vec<TeamRequirement>,
    pub tasks: Vec<TaskRow>,
    pub can_manage: bool,
    /// The draft being edited, when in edit mode.
    pub editing: Option<ProjectDraft>,
    pub staged_media: Option<String>,
    pub confirm_delete: bool,
}

fn format_date(date: Option<chrono::DateTime<chrono::Utc>>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

fn project_row(project: &Project, index: usize) -> ProjectRow {
    ProjectRow {
        id: project.id,
        name: project.name.clone(),
        description: project.description.clone().unwrap_or_default(),
        status: project.status.as_str().to_string(),
        priority: project.priority.as_str().to_string(),
        progress: project.progress,
        display_progress: project.progress.clamp(0, 100) as u16,
        start_date: format_date(project.start_date),
        deadline: format_date(project.deadline),
        tech_stack: project.tech_stack.clone(),
        accent: CardAccent::for_index(index),
        media: project.media_url.as_deref().map(MediaKind::from_url),
    }
}

fn project_rows(projects: &[&Project]) -> Vec<ProjectRow> {
    projects
        .iter()
        .enumerate()
        .map(|(i, p)| project_row(p, i))
        .collect()
}

fn task_row(state: &AppState, task: &Task) -> TaskRow {
    let project_name = task.project_name.clone().or_else(|| {
        task.project_id
            .and_then(|id| state.projects.iter().find(|p| p.id == id))
            .map(|p| p.name.clone())
    });
    let assignee = task.assigned_user_name.clone().or_else(|| {
        task.assigned_to_user_id
            .and_then(|id| state.users.iter().find(|u| u.id == id))
            .map(|u| u.name.clone())
    });
    TaskRow {
        id: task.id,
        title: task.title.clone(),
        status: task.status.clone(),
        priority: task.priority.as_str().to_string(),
        due_date: format_date(task.due_date),
        project_name,
        assignee,
    }
}

fn column_label(field: SortField) -> &'static str {
    match field {
        SortField::Name => "Name",
        SortField::Status => "Status",
        SortField::Priority => "Priority",
        SortField::StartDate => "Start",
        SortField::Deadline => "Deadline",
        SortField::Progress => "Progress",
    }
}

fn dashboard_view(state: &AppState) -> DashboardView {
    let list = derive::dashboard(
        &state.projects,
        &state.current_filter,
        state.sort,
        &state.search_query,
    );
    let filters = [
        FilterId::All,
        FilterId::Planning,
        FilterId::InProgress,
        FilterId::Delivered,
        FilterId::Upcoming,
    ]
    .into_iter()
    .map(|filter| FilterChip {
        label: filter.label().to_string(),
        active: filter == state.current_filter,
        filter,
    })
    .collect();
    let columns = SortField::all()
        .into_iter()
        .map(|field| ColumnHeader {
            field,
            label: column_label(field),
            indicator: sort_indicator(state.sort, field),
        })
        .collect();
    DashboardView {
        stats: derive::stats_summary(&state.projects),
        filters,
        columns,
        search: state.search_query.clone(),
        projects: project_rows(&list),
    }
}

fn detail_view(state: &AppState, project: &Project) -> DetailView {
    let tasks = derive::project_tasks(&state.tasks, project.id)
        .into_iter()
        .map(|t| task_row(state, t))
        .collect();
    DetailView {
        project: project_row(project, 0),
        estimated_duration: project.estimated_duration.clone(),
        required_team: project.required_team.clone(),
        tasks,
        can_manage: state.can_manage(),
        editing: state.edit_draft.clone().filter(|_| state.edit_mode),
        staged_media: state.staged_media.as_ref().map(|m| m.file_name.clone()),
        confirm_delete: state.pending_delete == Some(project.id),
    }
}

fn section_body(state: &AppState) -> SectionBody {
    match state.active_section {
        SectionId::Dashboard => SectionBody::Dashboard(dashboard_view(state)),
        SectionId::Ideas => SectionBody::Ideas(project_rows(&derive::ideas(&state.projects))),
        SectionId::Team => {
            let current = state.current_user.as_ref().map(|u| u.id);
            SectionBody::Team(
                derive::team(&state.users, &state.tasks)
                    .into_iter()
                    .map(|member| MemberRow {
                        id: member.user.id,
                        name: member.user.name.clone(),
                        role: member.user.role.as_str().to_string(),
                        title: member.user.title.clone(),
                        avatar_url: member.user.avatar_url.clone(),
                        assigned_tasks: member.assigned_tasks,
                        is_current: Some(member.user.id) == current,
                    })
                    .collect(),
            )
        }
        SectionId::MyTasks => {
            let tasks = match &state.current_user {
                Some(user) => derive::my_tasks(&state.tasks, user.id)
                    .into_iter()
                    .map(|t| task_row(state, t))
                    .collect(),
                None => Vec::new(),
            };
            SectionBody::MyTasks(tasks)
        }
    }
}

/// Compute the view for the current state.
pub fn render(state: &AppState) -> ViewModel {
    let screen = match &state.current_user {
        None if !state.loaded => Screen::Loading,
        None => Screen::Login(
            state
                .users
                .iter()
                .map(|u| LoginChoice {
                    id: u.id,
                    name: u.name.clone(),
                    role: u.role.as_str().to_string(),
                    title: u.title.clone(),
                })
                .collect(),
        ),
        Some(user) => Screen::Section(SectionView {
            section: state.active_section,
            title: state.active_section.title(),
            user_name: user.name.clone(),
            user_role: user.role.as_str().to_string(),
            can_manage: state.can_manage(),
            view_mode: state.view_mode,
            body: section_body(state),
            detail: state
                .current_entity
                .as_ref()
                .map(|project| detail_view(state, project)),
        }),
    };
    ViewModel {
        screen,
        notice: state.notice.clone(),
        submitting: state.is_submitting(),
    }
}
