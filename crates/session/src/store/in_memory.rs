use std::sync::RwLock;

use encore_auth::Credential;
use encore_bus::{Broadcast, InMemoryBroadcast, Subscription};

use super::{CredentialStore, StoreChange, StoreError};

/// Process-local slot. Sharing one instance through an `Arc` behaves like
/// several tabs sharing browser storage.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    slot: RwLock<Option<Credential>>,
    changes: InMemoryBroadcast<StoreChange>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: RwLock::new(Some(credential)),
            changes: InMemoryBroadcast::new(),
        }
    }

    fn set(&self, next: Option<Credential>) -> Result<(), StoreError> {
        let previous = {
            let mut slot = self.slot.write().map_err(|_| StoreError::Poisoned)?;
            if *slot == next {
                return Ok(());
            }
            std::mem::replace(&mut *slot, next.clone())
        };

        if let Err(err) = self.changes.publish(StoreChange {
            previous,
            current: next,
        }) {
            tracing::warn!(?err, "failed to announce credential slot change");
        }
        Ok(())
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn read(&self) -> Result<Option<Credential>, StoreError> {
        self.slot
            .read()
            .map(|slot| slot.clone())
            .map_err(|_| StoreError::Poisoned)
    }

    fn write(&self, credential: &Credential) -> Result<(), StoreError> {
        self.set(Some(credential.clone()))
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.set(None)
    }

    fn subscribe(&self) -> Subscription<StoreChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(raw: &str) -> Credential {
        Credential::parse(raw).unwrap()
    }

    #[test]
    fn announces_changes_with_previous_value() {
        let store = InMemoryCredentialStore::new();
        let sub = store.subscribe();

        store.write(&credential("a")).unwrap();
        store.clear().unwrap();

        let changes = sub.drain();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].previous, None);
        assert_eq!(changes[1].previous, Some(credential("a")));
        assert_eq!(changes[1].current, None);
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn same_value_writes_are_silent() {
        let store = InMemoryCredentialStore::with_credential(credential("a"));
        let sub = store.subscribe();

        store.write(&credential("a")).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();

        assert_eq!(sub.drain().len(), 1);
    }
}
