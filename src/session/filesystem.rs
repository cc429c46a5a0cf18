use super::storage::SessionStore;
use crate::error::{ChatError, Result};
use crate::models::Session;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

pub const SESSION_EXPIRY_MINUTES: i64 = 30;

const FILE_PREFIX: &str = "session-";

/// One JSON file per session under the cache directory.
pub struct FilesystemSessionStore {
    dir: PathBuf,
}

impl FilesystemSessionStore {
    /// Store under `~/.cache/docbot`.
    pub fn new() -> Result<Self> {
        let dir = dirs::cache_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".cache")))
            .ok_or_else(|| ChatError::Session("Could not determine a cache directory".to_string()))?
            .join("docbot");
        Self::with_dir(dir)
    }

    pub fn with_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn session_path(&self, session_id: &str) -> Result<PathBuf> {
        if session_id.is_empty()
            || !session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ChatError::Session(format!(
                "Invalid session id: '{}'",
                session_id
            )));
        }
        Ok(self.dir.join(format!("{}{}.json", FILE_PREFIX, session_id)))
    }

    fn session_files(&self) -> Vec<PathBuf> {
        fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.path())
                    .filter(|path| {
                        path.extension().and_then(|e| e.to_str()) == Some("json")
                            && path
                                .file_name()
                                .and_then(|n| n.to_str())
                                .is_some_and(|n| n.starts_with(FILE_PREFIX))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl SessionStore for FilesystemSessionStore {
    fn get(&self, session_id: &str) -> Result<Option<Session>> {
        let path = self.session_path(session_id)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn put(&self, session: &Session) -> Result<()> {
        let path = self.session_path(&session.session_id)?;
        let content = serde_json::to_string_pretty(session)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn find_recent(&self) -> Option<Session> {
        let now = Local::now();

        let mut sessions: Vec<(PathBuf, Session)> = self
            .session_files()
            .into_iter()
            .filter_map(|path| {
                let content = fs::read_to_string(&path).ok()?;
                let session: Session = serde_json::from_str(&content).ok()?;
                Some((path, session))
            })
            .collect();

        sessions.sort_by(|a, b| b.1.last_updated.cmp(&a.1.last_updated));

        let (path, session) = sessions.into_iter().next()?;
        let age_minutes = now.signed_duration_since(session.last_updated).num_minutes();
        if age_minutes.abs() < SESSION_EXPIRY_MINUTES {
            Some(session)
        } else {
            if let Err(e) = fs::remove_file(&path) {
                tracing::debug!(path = %path.display(), error = %e, "could not remove expired session");
            }
            None
        }
    }

    fn clear_all(&self) -> Result<()> {
        for path in self.session_files() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
