use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::lenient;
use super::EntityId;
use crate::codec;

/// Lifecycle status of a project.
///
/// Parsing is case-sensitive. Text outside the known vocabulary is kept
/// verbatim in [`ProjectStatus::Unknown`] so it round-trips on save instead of
/// being silently re-bucketed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ProjectStatus {
    Idea,
    Upcoming,
    Planning,
    #[default]
    InDevelopment,
    Delivered,
    Done,
    Completed,
    Unknown(String),
}

impl ProjectStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Idea => "Idea",
            Self::Upcoming => "Upcoming",
            Self::Planning => "Planning",
            Self::InDevelopment => "In Development",
            Self::Delivered => "Delivered",
            Self::Done => "Done",
            Self::Completed => "Completed",
            Self::Unknown(raw) => raw,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Idea" => Self::Idea,
            "Upcoming" => Self::Upcoming,
            "Planning" => Self::Planning,
            "In Development" => Self::InDevelopment,
            "Delivered" => Self::Delivered,
            "Done" => Self::Done,
            "Completed" => Self::Completed,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The known vocabulary, in lifecycle order.
    pub fn known() -> [ProjectStatus; 7] {
        [
            Self::Idea,
            Self::Upcoming,
            Self::Planning,
            Self::InDevelopment,
            Self::Delivered,
            Self::Done,
            Self::Completed,
        ]
    }

    /// Next status in lifecycle order, wrapping around. Unknown text moves to
    /// the first known status.
    pub fn next(&self) -> ProjectStatus {
        let known = Self::known();
        match known.iter().position(|s| s == self) {
            Some(i) => known[(i + 1) % known.len()].clone(),
            None => known[0].clone(),
        }
    }

    /// Idea and Upcoming projects live in the "future concepts" view.
    pub fn is_upcoming(&self) -> bool {
        matches!(self, Self::Idea | Self::Upcoming)
    }

    /// Everything that is not an idea appears on the main dashboard.
    pub fn is_core(&self) -> bool {
        !self.is_upcoming()
    }

    /// Delivered, Done and Completed are the same bucket.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered | Self::Done | Self::Completed)
    }

    /// Case-insensitive "development" substring match on the status text.
    pub fn mentions_development(&self) -> bool {
        self.as_str().to_lowercase().contains("development")
    }
}

impl Serialize for ProjectStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProjectStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
    Other(String),
}

impl Priority {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
            Self::Other(raw) => raw,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Low" => Self::Low,
            "" | "Medium" => Self::Medium,
            "High" => Self::High,
            "Critical" => Self::Critical,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn next(&self) -> Priority {
        match self {
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High => Self::Critical,
            Self::Critical | Self::Other(_) => Self::Low,
        }
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// A staffing need: how many people of a given role the project requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawTeamRequirement")]
pub struct TeamRequirement {
    pub role: String,
    pub count: i64,
}

impl TeamRequirement {
    /// Counts below one are raised to one.
    pub fn new(role: impl Into<String>, count: i64) -> Self {
        Self {
            role: role.into(),
            count: count.max(1),
        }
    }
}

#[derive(Deserialize)]
struct RawTeamRequirement {
    #[serde(default)]
    role: String,
    #[serde(default, deserialize_with = "lenient::int_or_zero")]
    count: i64,
}

impl From<RawTeamRequirement> for TeamRequirement {
    fn from(raw: RawTeamRequirement) -> Self {
        Self::new(raw.role, raw.count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProjectRecord", into = "ProjectRecord")]
pub struct Project {
    pub id: EntityId,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    /// Expected in 0..=100; not clamped here.
    pub progress: i64,
    pub start_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub tech_stack: Vec<String>,
    pub estimated_duration: Option<String>,
    pub required_team: Vec<TeamRequirement>,
    pub media_url: Option<String>,
}

/// Project fields as submitted by a form; the store assigns identity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "ProjectRecord", into = "ProjectRecord")]
pub struct ProjectDraft {
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub progress: i64,
    pub start_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub tech_stack: Vec<String>,
    pub estimated_duration: Option<String>,
    pub required_team: Vec<TeamRequirement>,
    pub media_url: Option<String>,
}

impl ProjectDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: ProjectStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<DateTime<Utc>>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn into_project(self, id: EntityId) -> Project {
        Project {
            id,
            name: self.name,
            description: self.description,
            status: self.status,
            progress: self.progress,
            start_date: self.start_date,
            deadline: self.deadline,
            priority: self.priority,
            tech_stack: self.tech_stack,
            estimated_duration: self.estimated_duration,
            required_team: self.required_team,
            media_url: self.media_url,
        }
    }
}

impl Project {
    pub fn to_draft(&self) -> ProjectDraft {
        ProjectDraft {
            name: self.name.clone(),
            description: self.description.clone(),
            status: self.status.clone(),
            progress: self.progress,
            start_date: self.start_date,
            deadline: self.deadline,
            priority: self.priority.clone(),
            tech_stack: self.tech_stack.clone(),
            estimated_duration: self.estimated_duration.clone(),
            required_team: self.required_team.clone(),
            media_url: self.media_url.clone(),
        }
    }
}

/// Wire shape shared by every backend.
///
/// List fields travel both as arrays and as serialized text
/// (`tech_stack_json`, `required_team_json`); the array wins when present.
#[derive(Serialize, Deserialize)]
struct ProjectRecord {
    #[serde(default, deserialize_with = "lenient::opt_id", skip_serializing_if = "Option::is_none")]
    id: Option<EntityId>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    status: ProjectStatus,
    #[serde(default, deserialize_with = "lenient::int_or_zero")]
    progress: i64,
    #[serde(default, with = "lenient::date")]
    start_date: Option<DateTime<Utc>>,
    #[serde(default, with = "lenient::date")]
    deadline: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    priority: Priority,
    #[serde(default)]
    tech_stack: Option<Vec<String>>,
    #[serde(default)]
    tech_stack_json: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    estimated_duration: Option<String>,
    #[serde(default)]
    required_team: Option<Vec<TeamRequirement>>,
    #[serde(default)]
    required_team_json: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    media_url: Option<String>,
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.trim().is_empty()))
}

impl From<ProjectRecord> for ProjectDraft {
    fn from(record: ProjectRecord) -> Self {
        let tech_stack = match record.tech_stack {
            Some(list) => list,
            None => codec::decode_list(record.tech_stack_json.as_deref()),
        };
        let required_team = match record.required_team {
            Some(list) => list,
            None => codec::decode_list(record.required_team_json.as_deref()),
        };
        Self {
            name: record.name,
            description: record.description,
            status: record.status,
            progress: record.progress,
            start_date: record.start_date,
            deadline: record.deadline,
            priority: record.priority,
            tech_stack,
            estimated_duration: record.estimated_duration,
            required_team,
            media_url: record.media_url,
        }
    }
}

impl TryFrom<ProjectRecord> for Project {
    type Error = String;

    fn try_from(record: ProjectRecord) -> Result<Self, Self::Error> {
        let id = record.id.ok_or_else(|| "project record has no id".to_string())?;
        Ok(ProjectDraft::from(record).into_project(id))
    }
}

impl From<ProjectDraft> for ProjectRecord {
    fn from(draft: ProjectDraft) -> Self {
        ProjectRecord {
            id: None,
            tech_stack_json: Some(codec::encode_list(&draft.tech_stack)),
            required_team_json: Some(codec::encode_list(&draft.required_team)),
            name: draft.name,
            description: draft.description,
            status: draft.status,
            progress: draft.progress,
            start_date: draft.start_date,
            deadline: draft.deadline,
            priority: draft.priority,
            tech_stack: Some(draft.tech_stack),
            estimated_duration: draft.estimated_duration,
            required_team: Some(draft.required_team),
            media_url: draft.media_url,
        }
    }
}

impl From<Project> for ProjectRecord {
    fn from(project: Project) -> Self {
        let id = project.id;
        let mut record = ProjectRecord::from(project.to_draft());
        record.id = Some(id);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_parsing_is_case_sensitive() {
        assert_eq!(ProjectStatus::parse("Delivered"), ProjectStatus::Delivered);
        assert_eq!(
            ProjectStatus::parse("delivered"),
            ProjectStatus::Unknown("delivered".into())
        );
    }

    #[test]
    fn unknown_status_round_trips_verbatim() {
        let status: ProjectStatus = serde_json::from_value(json!("On Hold")).unwrap();
        assert_eq!(status.as_str(), "On Hold");
        assert_eq!(serde_json::to_value(&status).unwrap(), json!("On Hold"));
        assert!(status.is_core());
        assert!(!status.is_delivered());
    }

    #[test]
    fn status_cycle_wraps() {
        assert_eq!(ProjectStatus::Completed.next(), ProjectStatus::Idea);
        assert_eq!(ProjectStatus::Unknown("x".into()).next(), ProjectStatus::Idea);
    }

    #[test]
    fn minimal_record_gets_defaults() {
        let project: Project = serde_json::from_value(json!({"id": 1, "name": "Atlas"})).unwrap();
        assert_eq!(project.status, ProjectStatus::InDevelopment);
        assert_eq!(project.priority, Priority::Medium);
        assert_eq!(project.progress, 0);
        assert!(project.tech_stack.is_empty());
        assert!(project.required_team.is_empty());
        assert!(project.deadline.is_none());
    }

    #[test]
    fn relational_row_shape_is_accepted() {
        let project: Project = serde_json::from_value(json!({
            "id": "12",
            "name": "Ledger",
            "status": "Planning",
            "progress": "35",
            "priority": null,
            "deadline": "2025-06-30 00:00:00",
            "tech_stack_json": "[\"Rust\",\"Postgres\"]",
            "required_team_json": "[{\"role\":\"Backend\",\"count\":\"2\"}]",
            "media_url": ""
        }))
        .unwrap();
        assert_eq!(project.id, EntityId::new(12));
        assert_eq!(project.progress, 35);
        assert_eq!(project.priority, Priority::Medium);
        assert_eq!(project.tech_stack, vec!["Rust", "Postgres"]);
        assert_eq!(project.required_team, vec![TeamRequirement::new("Backend", 2)]);
        assert!(project.deadline.is_some());
        assert!(project.media_url.is_none());
    }

    #[test]
    fn array_field_wins_over_text_field() {
        let project: Project = serde_json::from_value(json!({
            "id": 1,
            "name": "A",
            "tech_stack": ["Go"],
            "tech_stack_json": "[\"Rust\"]"
        }))
        .unwrap();
        assert_eq!(project.tech_stack, vec!["Go"]);
    }

    #[test]
    fn serializes_both_list_forms() {
        let mut draft = ProjectDraft::new("A");
        draft.tech_stack = vec!["Rust".into()];
        let value = serde_json::to_value(draft.into_project(EntityId::new(4))).unwrap();
        assert_eq!(value["id"], json!(4));
        assert_eq!(value["tech_stack"], json!(["Rust"]));
        assert_eq!(value["tech_stack_json"], json!("[\"Rust\"]"));
        assert_eq!(value["status"], json!("In Development"));
    }

    #[test]
    fn project_without_id_is_rejected() {
        assert!(serde_json::from_value::<Project>(json!({"name": "x"})).is_err());
        assert!(serde_json::from_value::<ProjectDraft>(json!({"name": "x"})).is_ok());
    }

    #[test]
    fn team_count_is_at_least_one() {
        let team: TeamRequirement =
            serde_json::from_value(json!({"role": "QA", "count": 0})).unwrap();
        assert_eq!(team.count, 1);
    }
}
