//! Durable storage for the session credential pair.
//!
//! This is the only state the client persists: exactly two keys, `credential`
//! and `username`, kept in a TOML file under the config directory. The session
//! manager is the sole reader and writer. A missing, corrupt, or partial file
//! is treated as "no stored session", never as an error: a stale or mangled
//! credential must not block startup.
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write credential file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode credential file: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// The persisted `(credential, username)` pair.
#[derive(Debug)]
pub struct StoredCredential {
    pub credential: SecretString,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CredentialFile {
    credential: String,
    username: String,
}

/// File-backed two-key store for the session credential.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored pair. `None` if the file is absent, unreadable, or
    /// does not parse; a warning is logged but never surfaced.
    pub fn load(&self) -> Option<StoredCredential> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read credential file");
                return None;
            }
        };

        match toml::from_str::<CredentialFile>(&content) {
            Ok(file) if !file.credential.is_empty() && !file.username.is_empty() => {
                Some(StoredCredential {
                    credential: SecretString::from(file.credential),
                    username: file.username,
                })
            }
            Ok(_) => {
                tracing::warn!(path = %self.path.display(), "Credential file has empty fields, ignoring");
                None
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Credential file is corrupt, ignoring");
                None
            }
        }
    }

    /// Persist the pair atomically: write to a temp file in the same
    /// directory, fsync, then rename over the destination. A crash mid-write
    /// leaves either the old file or the new one, never a torn mix.
    pub fn save(&self, credential: &SecretString, username: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string(&CredentialFile {
            credential: credential.expose_secret().to_string(),
            username: username.to_string(),
        })?;

        // Randomized temp name so a concurrent writer cannot collide with us.
        use std::time::{SystemTime, UNIX_EPOCH};
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let temp_path = self.path.with_extension(format!("tmp.{:016x}", suffix));

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create_new(true);
        // The file holds a bearer token: user-only read/write on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut temp_file = options.open(&temp_path)?;
        if let Err(e) = temp_file
            .write_all(content.as_bytes())
            .and_then(|_| temp_file.sync_all())
        {
            let _ = std::fs::remove_file(&temp_path);
            return Err(StoreError::Io(e));
        }
        drop(temp_file);

        if let Err(e) = std::fs::rename(&temp_path, &self.path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(StoreError::Io(e));
        }

        tracing::debug!(path = %self.path.display(), username = username, "Credential persisted");
        Ok(())
    }

    /// Remove the stored pair. Missing file is fine; other I/O failures are
    /// logged and swallowed so logout always completes.
    pub fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Credential cleared"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove credential file");
            }
        }
    }
}
