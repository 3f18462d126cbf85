use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Store, StoreError, StoreResult, SCHEMA};
use crate::codec;
use crate::models::{
    parse_date, EntityId, Priority, Project, ProjectDraft, ProjectStatus, Task, TaskDraft, User,
    UserDraft, UserRole,
};

/// SQLite-backed store.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

fn date_text(date: Option<DateTime<Utc>>) -> Option<String> {
    date.map(|d| d.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn now_text() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn read_date(row: &Row, column: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    Ok(row
        .get::<_, Option<String>>(column)?
        .as_deref()
        .and_then(parse_date))
}

fn project_from_row(row: &Row) -> rusqlite::Result<Project> {
    let tech_stack: Option<String> = row.get("tech_stack_json")?;
    let required_team: Option<String> = row.get("required_team_json")?;
    let draft = ProjectDraft {
        name: row.get("name")?,
        description: row.get("description")?,
        status: ProjectStatus::parse(&row.get::<_, String>("status")?),
        progress: row.get("progress")?,
        start_date: read_date(row, "start_date")?,
        deadline: read_date(row, "deadline")?,
        priority: Priority::parse(&row.get::<_, String>("priority")?),
        tech_stack: codec::decode_list(tech_stack.as_deref()),
        estimated_duration: row.get("estimated_duration")?,
        required_team: codec::decode_list(required_team.as_deref()),
        media_url: row.get("media_url")?,
    };
    Ok(draft.into_project(EntityId::new(row.get("id")?)))
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: EntityId::new(row.get("id")?),
        name: row.get("name")?,
        role: UserRole::parse(&row.get::<_, String>("role")?),
        title: row.get("title")?,
        avatar_url: row.get("avatar_url")?,
    })
}

fn task_from_row(row: &Row) -> rusqlite::Result<Task> {
    let draft = TaskDraft {
        project_id: row.get::<_, Option<i64>>("project_id")?.map(EntityId::new),
        assigned_to_user_id: row
            .get::<_, Option<i64>>("assigned_to_user_id")?
            .map(EntityId::new),
        title: row.get("title")?,
        description: row.get("description")?,
        status: row.get("status")?,
        priority: Priority::parse(&row.get::<_, String>("priority")?),
        due_date: read_date(row, "due_date")?,
    };
    let mut task = draft.into_task(EntityId::new(row.get("id")?));
    task.assigned_user_name = row.get("assigned_user_name")?;
    task.assigned_user_avatar = row.get("assigned_user_avatar")?;
    task.project_name = row.get("project_name")?;
    Ok(task)
}

const TASK_SELECT: &str = "SELECT t.id, t.project_id, t.assigned_to_user_id, t.title,
        t.description, t.status, t.priority, t.due_date,
        u.name AS assigned_user_name, u.avatar_url AS assigned_user_avatar,
        p.name AS project_name
    FROM tasks t
    LEFT JOIN users u ON u.id = t.assigned_to_user_id
    LEFT JOIN projects p ON p.id = t.project_id";

impl Database {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        tracing::debug!(path = %path.display(), "Opening SQLite store");
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> StoreResult<()> {
        self.with_connection(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
    }

    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&conn)
    }

    fn ensure_exists(conn: &Connection, table: &str, entity: &'static str, id: EntityId) -> StoreResult<()> {
        let found: Option<i64> = conn
            .query_row(
                &format!("SELECT id FROM {table} WHERE id = ?1"),
                params![id.get()],
                |row| row.get(0),
            )
            .optional()?;
        found.map(|_| ()).ok_or(StoreError::NotFound(entity))
    }
}

impl Store for Database {
    fn list_projects(&self) -> StoreResult<Vec<Project>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM projects ORDER BY id DESC")?;
            let projects = stmt
                .query_map([], project_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(projects)
        })
    }

    fn get_project(&self, id: EntityId) -> StoreResult<Project> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT * FROM projects WHERE id = ?1",
                params![id.get()],
                project_from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound("Project"))
        })
    }

    fn create_project(&self, draft: &ProjectDraft) -> StoreResult<Project> {
        let id = self.with_connection(|conn| {
            let now = now_text();
            conn.execute(
                "INSERT INTO projects (name, description, status, progress, start_date, deadline,
                    priority, tech_stack_json, estimated_duration, required_team_json, media_url,
                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
                params![
                    draft.name,
                    draft.description,
                    draft.status.as_str(),
                    draft.progress,
                    date_text(draft.start_date),
                    date_text(draft.deadline),
                    draft.priority.as_str(),
                    codec::encode_list(&draft.tech_stack),
                    draft.estimated_duration,
                    codec::encode_list(&draft.required_team),
                    draft.media_url,
                    now,
                ],
            )?;
            Ok(EntityId::new(conn.last_insert_rowid()))
        })?;
        tracing::info!(project_id = %id, name = %draft.name, "Created project");
        self.get_project(id)
    }

    fn update_project(&self, id: EntityId, draft: &ProjectDraft) -> StoreResult<Project> {
        self.with_connection(|conn| {
            let changed = conn.execute(
                "UPDATE projects SET name = ?1, description = ?2, status = ?3, progress = ?4,
                    start_date = ?5, deadline = ?6, priority = ?7, tech_stack_json = ?8,
                    estimated_duration = ?9, required_team_json = ?10, media_url = ?11,
                    updated_at = ?12
                 WHERE id = ?13",
                params![
                    draft.name,
                    draft.description,
                    draft.status.as_str(),
                    draft.progress,
                    date_text(draft.start_date),
                    date_text(draft.deadline),
                    draft.priority.as_str(),
                    codec::encode_list(&draft.tech_stack),
                    draft.estimated_duration,
                    codec::encode_list(&draft.required_team),
                    draft.media_url,
                    now_text(),
                    id.get(),
                ],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound("Project"));
            }
            Ok(())
        })?;
        self.get_project(id)
    }

    fn delete_project(&self, id: EntityId) -> StoreResult<()> {
        self.with_connection(|conn| {
            let changed = conn.execute("DELETE FROM projects WHERE id = ?1", params![id.get()])?;
            if changed == 0 {
                return Err(StoreError::NotFound("Project"));
            }
            tracing::info!(project_id = %id, "Deleted project");
            Ok(())
        })
    }

    fn list_users(&self) -> StoreResult<Vec<User>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM users ORDER BY id")?;
            let users = stmt
                .query_map([], user_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(users)
        })
    }

    fn get_user(&self, id: EntityId) -> StoreResult<User> {
        self.with_connection(|conn| {
            conn.query_row("SELECT * FROM users WHERE id = ?1", params![id.get()], user_from_row)
                .optional()?
                .ok_or(StoreError::NotFound("User"))
        })
    }

    fn create_user(&self, draft: &UserDraft) -> StoreResult<User> {
        let id = self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO users (name, role, title, avatar_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    draft.name,
                    draft.role.as_str(),
                    draft.title,
                    draft.avatar_url,
                    now_text()
                ],
            )?;
            Ok(EntityId::new(conn.last_insert_rowid()))
        })?;
        self.get_user(id)
    }

    fn update_user(&self, id: EntityId, draft: &UserDraft) -> StoreResult<User> {
        self.with_connection(|conn| {
            let changed = conn.execute(
                "UPDATE users SET name = ?1, role = ?2, title = ?3, avatar_url = ?4 WHERE id = ?5",
                params![
                    draft.name,
                    draft.role.as_str(),
                    draft.title,
                    draft.avatar_url,
                    id.get()
                ],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound("User"));
            }
            Ok(())
        })?;
        self.get_user(id)
    }

    fn delete_user(&self, id: EntityId) -> StoreResult<()> {
        self.with_connection(|conn| {
            let changed = conn.execute("DELETE FROM users WHERE id = ?1", params![id.get()])?;
            if changed == 0 {
                return Err(StoreError::NotFound("User"));
            }
            Ok(())
        })
    }

    fn list_tasks(&self, project_id: Option<EntityId>) -> StoreResult<Vec<Task>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{TASK_SELECT} WHERE (?1 IS NULL OR t.project_id = ?1) ORDER BY t.id DESC"
            ))?;
            let tasks = stmt
                .query_map(params![project_id.map(EntityId::get)], task_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tasks)
        })
    }

    fn create_task(&self, draft: &TaskDraft) -> StoreResult<Task> {
        self.with_connection(|conn| {
            if let Some(project_id) = draft.project_id {
                Self::ensure_exists(conn, "projects", "Project", project_id)?;
            }
            if let Some(user_id) = draft.assigned_to_user_id {
                Self::ensure_exists(conn, "users", "User", user_id)?;
            }
            conn.execute(
                "INSERT INTO tasks (project_id, assigned_to_user_id, title, description, status,
                    priority, due_date, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    draft.project_id.map(EntityId::get),
                    draft.assigned_to_user_id.map(EntityId::get),
                    draft.title,
                    draft.description,
                    draft.status,
                    draft.priority.as_str(),
                    date_text(draft.due_date),
                    now_text(),
                ],
            )?;
            let id = conn.last_insert_rowid();
            let task = conn.query_row(
                &format!("{TASK_SELECT} WHERE t.id = ?1"),
                params![id],
                task_from_row,
            )?;
            Ok(task)
        })
    }
}
