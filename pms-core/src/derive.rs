//! Pure view derivations over the fetched collections.
//!
//! Nothing here mutates state or caches results; every section recomputes its
//! view from the collections on each render.

use std::cmp::Ordering;

use chrono::{NaiveDate, TimeZone, Utc};

use crate::models::{EntityId, Project, ProjectStatus, Task, User};

/// Dashboard filter selector.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FilterId {
    #[default]
    All,
    Planning,
    InProgress,
    Delivered,
    Upcoming,
    /// Anything else; matches no project.
    Unrecognized(String),
}

impl FilterId {
    pub fn as_str(&self) -> &str {
        match self {
            Self::All => "all",
            Self::Planning => "planning",
            Self::InProgress => "inprogress",
            Self::Delivered => "delivered",
            Self::Upcoming => "upcoming",
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "all" => Self::All,
            "planning" => Self::Planning,
            "inprogress" => Self::InProgress,
            "delivered" => Self::Delivered,
            "upcoming" => Self::Upcoming,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::All => "All",
            Self::Planning => "Planning",
            Self::InProgress => "In Progress",
            Self::Delivered => "Delivered",
            Self::Upcoming => "Upcoming",
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn matches(&self, status: &ProjectStatus) -> bool {
        match self {
            Self::All => status.is_core(),
            Self::Planning => *status == ProjectStatus::Planning,
            Self::InProgress => *status == ProjectStatus::InDevelopment,
            Self::Delivered => status.is_delivered(),
            Self::Upcoming => status.is_upcoming(),
            Self::Unrecognized(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    Name,
    Status,
    Priority,
    StartDate,
    Deadline,
    Progress,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Status => "status",
            Self::Priority => "priority",
            Self::StartDate => "start_date",
            Self::Deadline => "deadline",
            Self::Progress => "progress",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "name" => Some(Self::Name),
            "status" => Some(Self::Status),
            "priority" => Some(Self::Priority),
            "start_date" => Some(Self::StartDate),
            "deadline" => Some(Self::Deadline),
            "progress" => Some(Self::Progress),
            _ => None,
        }
    }

    pub fn all() -> [SortField; 6] {
        [
            Self::Name,
            Self::Status,
            Self::Priority,
            Self::StartDate,
            Self::Deadline,
            Self::Progress,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }

    /// Selecting the active field flips its direction; any other field starts
    /// ascending.
    pub fn toggle(current: Option<SortSpec>, field: SortField) -> SortSpec {
        match current {
            Some(spec) if spec.field == field => SortSpec {
                field,
                direction: spec.direction.flipped(),
            },
            _ => SortSpec::asc(field),
        }
    }
}

/// Header affordance for a sortable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortIndicator {
    Neutral,
    Ascending,
    Descending,
}

pub fn sort_indicator(current: Option<SortSpec>, field: SortField) -> SortIndicator {
    match current {
        Some(spec) if spec.field == field => match spec.direction {
            SortDirection::Asc => SortIndicator::Ascending,
            SortDirection::Desc => SortIndicator::Descending,
        },
        _ => SortIndicator::Neutral,
    }
}

pub fn filter_projects<'a>(projects: &'a [Project], filter: &FilterId) -> Vec<&'a Project> {
    projects
        .iter()
        .filter(|p| filter.matches(&p.status))
        .collect()
}

fn far_future_millis() -> i64 {
    NaiveDate::from_ymd_opt(2099, 12, 31)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive).timestamp_millis())
        .unwrap_or(i64::MAX)
}

/// In-development projects first, then by deadline with missing deadlines
/// last. Stable.
pub fn smart_sort(mut projects: Vec<&Project>) -> Vec<&Project> {
    let sentinel = far_future_millis();
    projects.sort_by_key(|p| {
        (
            !p.status.mentions_development(),
            p.deadline.map_or(sentinel, |d| d.timestamp_millis()),
        )
    });
    projects
}

fn compare_field(a: &Project, b: &Project, field: SortField) -> Ordering {
    let epoch = |d: Option<chrono::DateTime<Utc>>| d.map_or(0, |d| d.timestamp_millis());
    match field {
        SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortField::Status => a
            .status
            .as_str()
            .to_lowercase()
            .cmp(&b.status.as_str().to_lowercase()),
        SortField::Priority => a
            .priority
            .as_str()
            .to_lowercase()
            .cmp(&b.priority.as_str().to_lowercase()),
        SortField::StartDate => epoch(a.start_date).cmp(&epoch(b.start_date)),
        SortField::Deadline => epoch(a.deadline).cmp(&epoch(b.deadline)),
        SortField::Progress => a.progress.cmp(&b.progress),
    }
}

/// Stable sort by a single field. Missing dates and progress compare as zero.
pub fn sort_projects(projects: &mut [&Project], spec: SortSpec) {
    projects.sort_by(|a, b| match spec.direction {
        SortDirection::Asc => compare_field(a, b, spec.field),
        SortDirection::Desc => compare_field(b, a, spec.field),
    });
}

/// Case-insensitive match on name, description or any tech stack entry.
pub fn matches_search(project: &Project, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    project.name.to_lowercase().contains(&query)
        || project
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&query))
        || project
            .tech_stack
            .iter()
            .any(|t| t.to_lowercase().contains(&query))
}

pub fn search_projects<'a>(projects: Vec<&'a Project>, query: &str) -> Vec<&'a Project> {
    projects
        .into_iter()
        .filter(|p| matches_search(p, query))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectStats {
    /// Core projects only.
    pub total: usize,
    pub in_development: usize,
    pub delivered: usize,
    pub upcoming: usize,
}

pub fn stats_summary(projects: &[Project]) -> ProjectStats {
    projects
        .iter()
        .fold(ProjectStats::default(), |mut stats, p| {
            if p.status.is_core() {
                stats.total += 1;
            }
            if p.status == ProjectStatus::InDevelopment {
                stats.in_development += 1;
            }
            if p.status.is_delivered() {
                stats.delivered += 1;
            }
            if p.status.is_upcoming() {
                stats.upcoming += 1;
            }
            stats
        })
}

/// Dashboard list: filter, smart order, search, then the user's column sort.
pub fn dashboard<'a>(
    projects: &'a [Project],
    filter: &FilterId,
    sort: Option<SortSpec>,
    search: &str,
) -> Vec<&'a Project> {
    let mut list = search_projects(smart_sort(filter_projects(projects, filter)), search);
    if let Some(spec) = sort {
        sort_projects(&mut list, spec);
    }
    list
}

/// Future concepts: Idea and Upcoming projects in fetch order.
pub fn ideas(projects: &[Project]) -> Vec<&Project> {
    projects.iter().filter(|p| p.status.is_upcoming()).collect()
}

pub fn my_tasks(tasks: &[Task], user_id: EntityId) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| t.assigned_to_user_id == Some(user_id))
        .collect()
}

pub fn project_tasks(tasks: &[Task], project_id: EntityId) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| t.project_id == Some(project_id))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamMember<'a> {
    pub user: &'a User,
    pub assigned_tasks: usize,
}

pub fn team<'a>(users: &'a [User], tasks: &'a [Task]) -> Vec<TeamMember<'a>> {
    users
        .iter()
        .map(|user| TeamMember {
            user,
            assigned_tasks: my_tasks(tasks, user.id).len(),
        })
        .collect()
}
