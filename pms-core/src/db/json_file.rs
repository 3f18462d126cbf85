use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::{enrich_tasks, Store, StoreError, StoreResult};
use crate::models::{EntityId, Project, ProjectDraft, Task, TaskDraft, User, UserDraft};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Collections {
    #[serde(default)]
    projects: Vec<Project>,
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    tasks: Vec<Task>,
}

fn next_id<I: Iterator<Item = EntityId>>(ids: I) -> EntityId {
    EntityId::new(ids.map(EntityId::get).max().unwrap_or(0) + 1)
}

/// Flat-file store keeping every collection in one `database.json`.
///
/// The file is read once on open and rewritten atomically after each change.
pub struct JsonFileStore {
    path: PathBuf,
    data: Mutex<Collections>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let mut data = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Collections::default(),
            Ok(text) => serde_json::from_str::<Collections>(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Collections::default(),
            Err(e) => return Err(e.into()),
        };
        // Names are joined in on read; stored copies would go stale.
        data.tasks = data.tasks.into_iter().map(Task::without_enrichment).collect();
        tracing::debug!(
            path = %path.display(),
            projects = data.projects.len(),
            users = data.users.len(),
            tasks = data.tasks.len(),
            "Opened JSON store"
        );
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read<T>(&self, f: impl FnOnce(&Collections) -> StoreResult<T>) -> StoreResult<T> {
        let data = self.data.lock().map_err(|_| StoreError::Poisoned)?;
        f(&data)
    }

    /// Apply `f` to a copy and persist it; the in-memory state only changes
    /// if the write succeeds.
    fn write<T>(&self, f: impl FnOnce(&mut Collections) -> StoreResult<T>) -> StoreResult<T> {
        let mut data = self.data.lock().map_err(|_| StoreError::Poisoned)?;
        let mut next = Collections {
            projects: data.projects.clone(),
            users: data.users.clone(),
            tasks: data.tasks.clone(),
        };
        let result = f(&mut next)?;
        self.persist(&next)?;
        *data = next;
        Ok(result)
    }

    fn persist(&self, data: &Collections) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(data)?;
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl Store for JsonFileStore {
    fn list_projects(&self) -> StoreResult<Vec<Project>> {
        self.read(|data| {
            let mut projects = data.projects.clone();
            projects.sort_by(|a, b| b.id.cmp(&a.id));
            Ok(projects)
        })
    }

    fn get_project(&self, id: EntityId) -> StoreResult<Project> {
        self.read(|data| {
            data.projects
                .iter()
                .find(|p| p.id == id)
                .cloned()
                .ok_or(StoreError::NotFound("Project"))
        })
    }

    fn create_project(&self, draft: &ProjectDraft) -> StoreResult<Project> {
        let project = self.write(|data| {
            let project = draft
                .clone()
                .into_project(next_id(data.projects.iter().map(|p| p.id)));
            data.projects.push(project.clone());
            Ok(project)
        })?;
        tracing::info!(project_id = %project.id, name = %project.name, "Created project");
        Ok(project)
    }

    fn update_project(&self, id: EntityId, draft: &ProjectDraft) -> StoreResult<Project> {
        self.write(|data| {
            let slot = data
                .projects
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or(StoreError::NotFound("Project"))?;
            *slot = draft.clone().into_project(id);
            Ok(slot.clone())
        })
    }

    fn delete_project(&self, id: EntityId) -> StoreResult<()> {
        self.write(|data| {
            let before = data.projects.len();
            data.projects.retain(|p| p.id != id);
            if data.projects.len() == before {
                return Err(StoreError::NotFound("Project"));
            }
            data.tasks.retain(|t| t.project_id != Some(id));
            Ok(())
        })?;
        tracing::info!(project_id = %id, "Deleted project");
        Ok(())
    }

    fn list_users(&self) -> StoreResult<Vec<User>> {
        self.read(|data| {
            let mut users = data.users.clone();
            users.sort_by_key(|u| u.id);
            Ok(users)
        })
    }

    fn get_user(&self, id: EntityId) -> StoreResult<User> {
        self.read(|data| {
            data.users
                .iter()
                .find(|u| u.id == id)
                .cloned()
                .ok_or(StoreError::NotFound("User"))
        })
    }

    fn create_user(&self, draft: &UserDraft) -> StoreResult<User> {
        self.write(|data| {
            let user = draft
                .clone()
                .into_user(next_id(data.users.iter().map(|u| u.id)));
            data.users.push(user.clone());
            Ok(user)
        })
    }

    fn update_user(&self, id: EntityId, draft: &UserDraft) -> StoreResult<User> {
        self.write(|data| {
            let slot = data
                .users
                .iter_mut()
                .find(|u| u.id == id)
                .ok_or(StoreError::NotFound("User"))?;
            *slot = draft.clone().into_user(id);
            Ok(slot.clone())
        })
    }

    fn delete_user(&self, id: EntityId) -> StoreResult<()> {
        self.write(|data| {
            let before = data.users.len();
            data.users.retain(|u| u.id != id);
            if data.users.len() == before {
                return Err(StoreError::NotFound("User"));
            }
            for task in data
                .tasks
                .iter_mut()
                .filter(|t| t.assigned_to_user_id == Some(id))
            {
                task.assigned_to_user_id = None;
            }
            Ok(())
        })
    }

    fn list_tasks(&self, project_id: Option<EntityId>) -> StoreResult<Vec<Task>> {
        self.read(|data| {
            let mut tasks: Vec<Task> = data
                .tasks
                .iter()
                .filter(|t| project_id.is_none() || t.project_id == project_id)
                .cloned()
                .collect();
            tasks.sort_by(|a, b| b.id.cmp(&a.id));
            Ok(enrich_tasks(tasks, &data.projects, &data.users))
        })
    }

    fn create_task(&self, draft: &TaskDraft) -> StoreResult<Task> {
        let task = self.write(|data| {
            if let Some(project_id) = draft.project_id {
                if !data.projects.iter().any(|p| p.id == project_id) {
                    return Err(StoreError::NotFound("Project"));
                }
            }
            if let Some(user_id) = draft.assigned_to_user_id {
                if !data.users.iter().any(|u| u.id == user_id) {
                    return Err(StoreError::NotFound("User"));
                }
            }
            let task = draft
                .clone()
                .into_task(next_id(data.tasks.iter().map(|t| t.id)));
            data.tasks.push(task.clone());
            Ok(task)
        })?;
        self.read(|data| {
            enrich_tasks(vec![task], &data.projects, &data.users)
                .into_iter()
                .next()
                .ok_or(StoreError::NotFound("Task"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProjectStatus, UserRole};
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> JsonFileStore {
        JsonFileStore::open(dir.path().join("database.json")).unwrap()
    }

    #[test]
    fn persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let created = {
            let store = open_store(&dir);
            store
                .create_project(&ProjectDraft::new("Atlas").with_status(ProjectStatus::Planning))
                .unwrap()
        };
        let store = open_store(&dir);
        assert_eq!(store.get_project(created.id).unwrap(), created);
    }

    #[test]
    fn enrichment_in_the_file_is_not_written_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("database.json");
        fs::write(
            &path,
            r#"{"projects": [{"id": 1, "name": "Renamed"}], "users": [],
                "tasks": [{"id": 1, "project_id": 1, "title": "Wire", "project_name": "Old name"}]}"#,
        )
        .unwrap();
        let store = JsonFileStore::open(&path).unwrap();

        let tasks = store.list_tasks(None).unwrap();
        assert_eq!(tasks[0].project_name.as_deref(), Some("Renamed"));

        store.create_project(&ProjectDraft::new("Atlas")).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw["tasks"][0].get("project_name").is_none());
        assert_eq!(raw["tasks"][0]["title"], "Wire");
    }

    #[test]
    fn file_carries_textual_list_columns() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let mut draft = ProjectDraft::new("Atlas");
        draft.tech_stack = vec!["Rust".into()];
        store.create_project(&draft).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["projects"][0]["tech_stack_json"], "[\"Rust\"]");
    }

    #[test]
    fn ids_continue_from_the_largest() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let a = store.create_user(&UserDraft::new("a", UserRole::Team)).unwrap();
        let b = store.create_user(&UserDraft::new("b", UserRole::Team)).unwrap();
        store.delete_user(a.id).unwrap();
        let c = store.create_user(&UserDraft::new("c", UserRole::Team)).unwrap();
        assert_eq!(c.id.get(), b.id.get() + 1);
    }

    #[test]
    fn delete_cascades_and_unassigns() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let project = store.create_project(&ProjectDraft::new("Atlas")).unwrap();
        let user = store.create_user(&UserDraft::new("Ana", UserRole::Admin)).unwrap();
        store
            .create_task(&TaskDraft::new("loose").assigned_to(user.id))
            .unwrap();
        store
            .create_task(&TaskDraft::new("owned").for_project(project.id))
            .unwrap();

        store.delete_project(project.id).unwrap();
        store.delete_user(user.id).unwrap();

        let tasks = store.list_tasks(None).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "loose");
        assert!(tasks[0].assigned_to_user_id.is_none());
    }

    #[test]
    fn create_task_rejects_unknown_project() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let result = store.create_task(&TaskDraft::new("x").for_project(EntityId::new(5)));
        assert!(matches!(result, Err(StoreError::NotFound("Project"))));
    }
}
