//! Endpoint profiles: where each collection lives on a given backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How a backend expects the record id on single-record writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdPlacement {
    /// `PUT /projects/{id}`, `GET /projects/{id}`, `DELETE /upload/{filename}`.
    #[default]
    Path,
    /// `PUT /projects` with `{"id": ..}`, `GET /projects?id=`,
    /// `DELETE /upload?filename=`.
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Projects,
    Users,
    Tasks,
    Upload,
}

/// Collection paths (relative to the base URL) and id placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointProfile {
    pub projects: String,
    pub users: String,
    pub tasks: String,
    pub upload: String,
    #[serde(default)]
    pub id_placement: IdPlacement,
}

impl EndpointProfile {
    pub fn nodejs() -> Self {
        Self {
            projects: "api/projects".into(),
            users: "api/users".into(),
            tasks: "api/tasks".into(),
            upload: "api/upload".into(),
            id_placement: IdPlacement::Path,
        }
    }

    pub fn php() -> Self {
        Self {
            projects: "api/projects.php".into(),
            users: "api/users.php".into(),
            tasks: "api/tasks.php".into(),
            upload: "api/upload.php".into(),
            id_placement: IdPlacement::Body,
        }
    }

    pub fn path(&self, collection: Collection) -> &str {
        let path = match collection {
            Collection::Projects => &self.projects,
            Collection::Users => &self.users,
            Collection::Tasks => &self.tasks,
            Collection::Upload => &self.upload,
        };
        path.trim_start_matches('/')
    }
}

/// Named profiles; the built-in `nodejs` and `php` entries can be overridden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTable {
    profiles: BTreeMap<String, EndpointProfile>,
}

impl Default for EndpointTable {
    fn default() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert("nodejs".to_string(), EndpointProfile::nodejs());
        profiles.insert("php".to_string(), EndpointProfile::php());
        Self { profiles }
    }
}

impl EndpointTable {
    pub fn with_overrides(overrides: BTreeMap<String, EndpointProfile>) -> Self {
        let mut table = Self::default();
        table.profiles.extend(overrides);
        table
    }

    pub fn get(&self, name: &str) -> Option<&EndpointProfile> {
        self.profiles.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}
