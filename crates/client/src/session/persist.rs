//! On-disk session persistence.
//!
//! A single JSON file holds the authenticated identity and the backend
//! session cookie header, so a fresh process can pick up where the last one
//! left off. Writes go through a sibling temp file and a rename.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::Identity;

const SCHEMA_VERSION: u32 = 1;

/// Errors while reading or writing the session file.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Failed to access session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to encode session file: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Everything that survives a process restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    #[serde(default = "schema_version")]
    pub schema_version: u32,
    /// Identity confirmed at the last login.
    #[serde(default)]
    pub identity: Option<Identity>,
    /// `Cookie` header the gateway was sending at the last save.
    #[serde(default)]
    pub cookies: Option<String>,
}

const fn schema_version() -> u32 {
    SCHEMA_VERSION
}

impl PersistedSession {
    #[must_use]
    pub const fn new(identity: Option<Identity>, cookies: Option<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            identity,
            cookies,
        }
    }
}

/// Handle to the session file.
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted session.
    ///
    /// A missing, unreadable or corrupt file yields `None`; corruption and
    /// read failures are logged, never returned.
    pub async fn load(&self) -> Option<PersistedSession> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No persisted session");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read session file");
                return None;
            }
        };

        match serde_json::from_slice::<PersistedSession>(&bytes) {
            Ok(session) if session.schema_version == SCHEMA_VERSION => Some(session),
            Ok(session) => {
                warn!(
                    path = %self.path.display(),
                    schema_version = session.schema_version,
                    "Ignoring session file with unknown schema version"
                );
                None
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring corrupt session file");
                None
            }
        }
    }

    /// Write the session atomically.
    ///
    /// # Errors
    ///
    /// Returns `PersistError` if the directory, temp file or rename fails.
    pub async fn save(&self, session: &PersistedSession) -> Result<(), PersistError> {
        let bytes = serde_json::to_vec_pretty(session)?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| self.io_error(source))?;
        }

        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, bytes)
            .await
            .map_err(|source| PersistError::Io {
                path: tmp_path.clone(),
                source,
            })?;

        if let Err(rename_err) = tokio::fs::rename(&tmp_path, &self.path).await {
            // Some platforms refuse to rename over an existing file.
            if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
                tokio::fs::remove_file(&self.path)
                    .await
                    .map_err(|source| self.io_error(source))?;
                tokio::fs::rename(&tmp_path, &self.path)
                    .await
                    .map_err(|source| self.io_error(source))?;
            } else {
                let _ = tokio::fs::remove_file(&tmp_path).await;
                return Err(self.io_error(rename_err));
            }
        }

        debug!(path = %self.path.display(), "Session file saved");
        Ok(())
    }

    /// Delete the session file. A file that is already gone is fine.
    ///
    /// # Errors
    ///
    /// Returns `PersistError` if the file exists but cannot be removed.
    pub async fn clear(&self) -> Result<(), PersistError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Session file removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: io::Error) -> PersistError {
        PersistError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sneakershelf_core::{AccountRole, Email, UserId};

    use super::*;

    fn identity() -> Identity {
        Identity::new(
            UserId::new("7"),
            "johndoe",
            Email::parse("user@sneakershelf.com").unwrap(),
            AccountRole::Shopper,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let file = SessionFile::new(dir.path().join("nested").join("session.json"));

        assert!(file.load().await.is_none());

        let session = PersistedSession::new(Some(identity()), Some("sessionid=abc".to_string()));
        file.save(&session).await.unwrap();
        assert_eq!(file.load().await, Some(session));
        assert!(!file.tmp_path().exists());

        file.clear().await.unwrap();
        assert!(file.load().await.is_none());
        file.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let file = SessionFile::new(dir.path().join("session.json"));

        file.save(&PersistedSession::new(Some(identity()), None))
            .await
            .unwrap();
        file.save(&PersistedSession::new(None, Some("sessionid=next".to_string())))
            .await
            .unwrap();

        let loaded = file.load().await.unwrap();
        assert!(loaded.identity.is_none());
        assert_eq!(loaded.cookies.as_deref(), Some("sessionid=next"));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"{not json").unwrap();

        assert!(SessionFile::new(&path).load().await.is_none());
    }

    #[tokio::test]
    async fn test_tampered_identity_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(
            &path,
            br#"{"schema_version": 1, "identity": {"id": "", "email": "x@y.z"}}"#,
        )
        .unwrap();

        assert!(SessionFile::new(&path).load().await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_schema_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, br#"{"schema_version": 99}"#).unwrap();

        assert!(SessionFile::new(&path).load().await.is_none());
    }
}
