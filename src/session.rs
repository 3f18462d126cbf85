//! Durable "current user" pointer.
//!
//! Stored as `~/.pms/session.json` (`{"user_id": .., "updated_at": ..}`) so
//! a restart resumes the last login.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use pms_core::models::EntityId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not determine home directory")]
    NoHomeDir,
    #[error("session file io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSession {
    pub user_id: EntityId,
    pub updated_at: String,
}

/// Default session path under the home directory.
pub fn default_session_path() -> Result<PathBuf, SessionError> {
    dirs::home_dir()
        .map(|home| home.join(".pms").join("session.json"))
        .ok_or(SessionError::NoHomeDir)
}

#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The saved user id, if any. A corrupt file reads as no session.
    pub fn load(&self) -> Result<Option<EntityId>, SessionError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&self.path)?;
        match serde_json::from_str::<SavedSession>(&json) {
            Ok(saved) => Ok(Some(saved.user_id)),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring unreadable session file");
                Ok(None)
            }
        }
    }

    /// Write atomically: temp file, then rename.
    pub fn save(&self, user_id: EntityId) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let saved = SavedSession {
            user_id,
            updated_at: chrono::Utc::now().to_rfc3339(),
        };
        let json = serde_json::to_string_pretty(&saved)?;
        let temp_path = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), SessionError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    /// Persist or clear, as requested by a state effect.
    pub fn store(&self, user_id: Option<EntityId>) -> Result<(), SessionError> {
        match user_id {
            Some(id) => self.save(id),
            None => self.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn session(dir: &TempDir) -> SessionFile {
        SessionFile::new(dir.path().join("nested").join("session.json"))
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let file = session(&dir);
        file.save(EntityId::new(3)).unwrap();
        assert_eq!(file.load().unwrap(), Some(EntityId::new(3)));
        assert!(!file.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn load_returns_none_when_file_missing() {
        let dir = TempDir::new().unwrap();
        assert_eq!(session(&dir).load().unwrap(), None);
    }

    #[test]
    fn corrupt_file_reads_as_logged_out() {
        let dir = TempDir::new().unwrap();
        let file = session(&dir);
        fs::create_dir_all(file.path().parent().unwrap()).unwrap();
        fs::write(file.path(), "{not json").unwrap();
        assert_eq!(file.load().unwrap(), None);
    }

    #[test]
    fn clear_removes_existing_file() {
        let dir = TempDir::new().unwrap();
        let file = session(&dir);
        file.store(Some(EntityId::new(1))).unwrap();
        assert!(file.path().exists());
        file.store(None).unwrap();
        assert!(!file.path().exists());
    }
}
