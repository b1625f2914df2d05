use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use encore_auth::Credential;
use encore_bus::{Broadcast, InMemoryBroadcast, Subscription};

use super::{CredentialStore, StoreChange, StoreError};

/// Slot backed by a single file.
///
/// Processes sharing the file see each other's logins and logouts once they
/// [`poll`](CredentialStore::poll). A missing or blank file is an empty slot.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    last_seen: Mutex<Option<Credential>>,
    changes: InMemoryBroadcast<StoreChange>,
}

impl FileCredentialStore {
    /// Opens the slot, remembering its current value as already seen.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let current = read_slot(&path)?;
        Ok(Self {
            path,
            last_seen: Mutex::new(current),
            changes: InMemoryBroadcast::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Record `current` as seen, announcing it if it differs.
    fn observe(&self, current: Option<Credential>) -> Result<bool, StoreError> {
        let previous = {
            let mut last = self.last_seen.lock().map_err(|_| StoreError::Poisoned)?;
            if *last == current {
                return Ok(false);
            }
            std::mem::replace(&mut *last, current.clone())
        };

        tracing::debug!(path = %self.path.display(), present = current.is_some(), "credential file changed");
        if let Err(err) = self.changes.publish(StoreChange { previous, current }) {
            tracing::warn!(?err, "failed to announce credential slot change");
        }
        Ok(true)
    }
}

fn read_slot(path: &Path) -> Result<Option<Credential>, StoreError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Ok(Credential::parse(raw)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

impl CredentialStore for FileCredentialStore {
    fn read(&self) -> Result<Option<Credential>, StoreError> {
        read_slot(&self.path)
    }

    fn write(&self, credential: &Credential) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        std::fs::write(&self.path, credential.as_str()).map_err(|e| self.io_error(e))?;
        self.observe(Some(credential.clone()))?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(self.io_error(err)),
        }
        self.observe(None)?;
        Ok(())
    }

    fn subscribe(&self) -> Subscription<StoreChange> {
        self.changes.subscribe()
    }

    fn poll(&self) -> Result<bool, StoreError> {
        let current = read_slot(&self.path)?;
        self.observe(current)
    }
}
