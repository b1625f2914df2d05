//! Persisted credential slot.

mod file;
mod in_memory;

use std::path::PathBuf;

use thiserror::Error;

use encore_auth::Credential;
use encore_bus::Subscription;

pub use file::FileCredentialStore;
pub use in_memory::InMemoryCredentialStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential slot at {} is not accessible: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("credential slot lock poisoned")]
    Poisoned,
}

/// Notification that the slot's value changed.
///
/// Receivers must re-read the slot instead of trusting `current`: several
/// notifications may be queued and only the latest value matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub previous: Option<Credential>,
    pub current: Option<Credential>,
}

/// A single mutable slot holding a credential or nothing.
///
/// Other processes may change the slot at any time; implementations announce
/// every observed change (their own writes included) to subscribers and stay
/// silent when a write leaves the value as it was.
pub trait CredentialStore: Send + Sync {
    fn read(&self) -> Result<Option<Credential>, StoreError>;

    fn write(&self, credential: &Credential) -> Result<(), StoreError>;

    fn clear(&self) -> Result<(), StoreError>;

    fn subscribe(&self) -> Subscription<StoreChange>;

    /// Look for out-of-band changes and announce them.
    ///
    /// Returns `true` when a change was published. Stores that are notified
    /// synchronously have nothing to poll.
    fn poll(&self) -> Result<bool, StoreError> {
        Ok(false)
    }
}
