//! Persisted session fields.
//!
//! Three string fields survive restarts: the bearer token, the account email,
//! and the role. Storage is authoritative for "am I logged in": the absence of
//! a token means logged out, no matter what any in-memory cache believes.
//!
//! Writes never fail from the caller's point of view. [`FileStorage`] keeps an
//! in-process copy and logs a warning when the disk write fails, so login and
//! logout always take effect for the running process.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, warn};

/// Fixed names of the persisted fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageKey {
    Token,
    Email,
    Role,
}

impl StorageKey {
    pub const ALL: [Self; 3] = [Self::Token, Self::Email, Self::Role];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::Email => "email",
            Self::Role => "role",
        }
    }
}

/// Key-value storage for the persisted session fields.
///
/// Shared between the session store (explicit login/logout) and the gateway
/// (which clears it on a 401). Last writer wins.
pub trait SessionStorage: Send + Sync {
    /// Read a field.
    fn load(&self, key: StorageKey) -> Option<String>;

    /// Write a field.
    fn store(&self, key: StorageKey, value: &str);

    /// Delete a field. Deleting an absent field is a no-op.
    fn remove(&self, key: StorageKey);

    /// The persisted bearer token, if present and non-empty.
    fn token(&self) -> Option<String> {
        self.load(StorageKey::Token).filter(|t| !t.is_empty())
    }

    /// Remove every session field.
    fn clear_session(&self) {
        for key in StorageKey::ALL {
            self.remove(key);
        }
    }
}

type Fields = BTreeMap<String, String>;

/// Process-local storage. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    fields: RwLock<Fields>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self, key: StorageKey) -> Option<String> {
        self.fields
            .read()
            .ok()
            .and_then(|fields| fields.get(key.as_str()).cloned())
    }

    fn store(&self, key: StorageKey, value: &str) {
        if let Ok(mut fields) = self.fields.write() {
            fields.insert(key.as_str().to_string(), value.to_string());
        }
    }

    fn remove(&self, key: StorageKey) {
        if let Ok(mut fields) = self.fields.write() {
            fields.remove(key.as_str());
        }
    }
}

/// JSON object on disk, written through on every change.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    fields: RwLock<Fields>,
}

impl FileStorage {
    /// Open storage at `path`, reading existing fields if the file exists.
    ///
    /// A missing file starts empty; an unreadable or corrupt file also starts
    /// empty (logged), which reads as "logged out".
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let fields = read_fields(&path);
        debug!(path = %path.display(), fields = fields.len(), "Opened session storage");
        Self {
            path,
            fields: RwLock::new(fields),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, fields: &Fields) {
        if let Err(e) = write_fields(&self.path, fields) {
            warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to persist session storage; keeping in-process copy"
            );
        }
    }

    fn mutate(&self, change: impl FnOnce(&mut Fields)) {
        let Ok(mut fields) = self.fields.write() else {
            warn!("Session storage lock poisoned");
            return;
        };
        change(&mut fields);
        self.persist(&fields);
    }
}

impl SessionStorage for FileStorage {
    fn load(&self, key: StorageKey) -> Option<String> {
        self.fields
            .read()
            .ok()
            .and_then(|fields| fields.get(key.as_str()).cloned())
    }

    fn store(&self, key: StorageKey, value: &str) {
        self.mutate(|fields| {
            fields.insert(key.as_str().to_string(), value.to_string());
        });
    }

    fn remove(&self, key: StorageKey) {
        self.mutate(|fields| {
            fields.remove(key.as_str());
        });
    }

    fn clear_session(&self) {
        self.mutate(|fields| {
            for key in StorageKey::ALL {
                fields.remove(key.as_str());
            }
        });
    }
}

fn read_fields(path: &Path) -> Fields {
    match std::fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Corrupt session storage; starting empty");
            Fields::new()
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Fields::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unreadable session storage; starting empty");
            Fields::new()
        }
    }
}

fn write_fields(path: &Path, fields: &Fields) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec_pretty(fields).map_err(std::io::Error::other)?;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    // The file holds a bearer token: owner read/write only.
    #[cfg(unix)]
    std::os::unix::fs::OpenOptionsExt::mode(&mut options, 0o600);

    let mut file = options.open(path)?;
    file.write_all(&json)
}
