//! Session manager: the only writer of the session and the credential slot.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use thiserror::Error;

use encore_auth::{Credential, CredentialDecoder};
use encore_bus::{Broadcast, InMemoryBroadcast, Subscription};

use crate::session::{ChangeCause, Session, SessionChange};
use crate::store::{CredentialStore, StoreChange, StoreError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("credential must not be empty")]
    EmptyCredential,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Default)]
struct State {
    session: Session,
    epoch: u64,
}

/// Owns the session.
///
/// # Invariants
/// - The session is authenticated iff the slot holds a credential that
///   decoded successfully; a credential that fails to decode is removed from
///   the slot.
/// - Every effective transition bumps the epoch before it becomes visible,
///   so work started under an older epoch can tell it is stale.
/// - `logout()` is visible to every read that starts after it returns.
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    decoder: Arc<dyn CredentialDecoder>,
    clock: fn() -> DateTime<Utc>,
    state: RwLock<State>,
    store_events: Mutex<Subscription<StoreChange>>,
    changes: InMemoryBroadcast<SessionChange>,
}

impl SessionManager {
    /// Creates the manager and adopts whatever the slot currently holds.
    pub fn new(store: Arc<dyn CredentialStore>, decoder: Arc<dyn CredentialDecoder>) -> Self {
        Self::with_clock(store, decoder, Utc::now)
    }

    pub fn with_clock(
        store: Arc<dyn CredentialStore>,
        decoder: Arc<dyn CredentialDecoder>,
        clock: fn() -> DateTime<Utc>,
    ) -> Self {
        let store_events = store.subscribe();
        let manager = Self {
            store,
            decoder,
            clock,
            state: RwLock::new(State::default()),
            store_events: Mutex::new(store_events),
            changes: InMemoryBroadcast::new(),
        };

        match manager.store.read() {
            Ok(Some(credential)) => {
                let session = manager.decode_or_clear(credential);
                manager.write_state().session = session;
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "credential slot unreadable; starting anonymous"),
        }
        manager.drain_store_events();

        manager
    }

    /// Snapshot of the current session.
    pub fn current(&self) -> Session {
        self.read_state().session.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_state().session.is_authenticated()
    }

    /// Monotonic counter bumped on every effective transition.
    pub fn epoch(&self) -> u64 {
        self.read_state().epoch
    }

    pub fn subscribe(&self) -> Subscription<SessionChange> {
        self.changes.subscribe()
    }

    /// Adopts `raw` as the credential.
    ///
    /// A credential that does not decode leaves the session anonymous and the
    /// slot empty; that outcome is returned, not raised.
    pub fn login(&self, raw: &str) -> Result<Session, SessionError> {
        let credential = Credential::parse(raw).ok_or(SessionError::EmptyCredential)?;
        self.adopt(credential, ChangeCause::Login)
    }

    /// Clears the session and the slot. Idempotent.
    pub fn logout(&self) {
        self.end(ChangeCause::Logout);
    }

    /// Ends the session after the remote rejected the credential.
    pub fn force_logout(&self) {
        self.end(ChangeCause::AuthorizationFailure);
    }

    /// Polls the slot for out-of-band changes, then reconciles.
    pub fn refresh(&self) -> Option<SessionChange> {
        if let Err(err) = self.store.poll() {
            tracing::warn!(error = %err, "credential slot poll failed");
        }
        self.reconcile()
    }

    /// Applies pending slot notifications.
    ///
    /// The slot is re-read rather than trusting notification payloads, and
    /// notifications that leave the slot matching the session do nothing.
    pub fn reconcile(&self) -> Option<SessionChange> {
        if self.drain_store_events() == 0 {
            return None;
        }

        let stored = match self.store.read() {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!(error = %err, "credential slot unreadable; keeping session");
                return None;
            }
        };

        let session = self.current();
        match (stored, session.credential()) {
            (None, None) => {
                tracing::debug!("ignoring no-op credential slot notification");
                None
            }
            (Some(stored), Some(held)) if &stored == held => {
                tracing::debug!("ignoring no-op credential slot notification");
                None
            }
            (None, Some(_)) => {
                tracing::info!("credential removed elsewhere; logging out");
                self.transition(Session::Anonymous, ChangeCause::ExternalLogout)
            }
            (Some(stored), _) => {
                let next = self.decode_or_clear(stored);
                let cause = if next.is_authenticated() {
                    tracing::info!("credential written elsewhere; adopting it");
                    ChangeCause::ExternalLogin
                } else {
                    ChangeCause::DecodeFailure
                };
                self.drain_store_events();
                self.transition(next, cause)
            }
        }
    }

    fn adopt(&self, credential: Credential, cause: ChangeCause) -> Result<Session, SessionError> {
        let now = (self.clock)();
        match self.decoder.decode(&credential, now) {
            Ok(identity) => {
                self.store.write(&credential)?;
                let session = Session::Authenticated { credential, identity };
                self.transition(session.clone(), cause);
                Ok(session)
            }
            Err(err) => {
                tracing::warn!(error = %err, "credential rejected; no active session");
                if let Err(err) = self.store.clear() {
                    tracing::warn!(error = %err, "failed to clear credential slot");
                }
                self.transition(Session::Anonymous, ChangeCause::DecodeFailure);
                Ok(Session::Anonymous)
            }
        }
    }

    fn end(&self, cause: ChangeCause) {
        self.transition(Session::Anonymous, cause);
        if let Err(err) = self.store.clear() {
            tracing::warn!(error = %err, "failed to clear credential slot");
        }
    }

    fn decode_or_clear(&self, credential: Credential) -> Session {
        match self.decoder.decode(&credential, (self.clock)()) {
            Ok(identity) => Session::Authenticated { credential, identity },
            Err(err) => {
                tracing::warn!(error = %err, "stored credential rejected; clearing slot");
                if let Err(err) = self.store.clear() {
                    tracing::warn!(error = %err, "failed to clear credential slot");
                }
                Session::Anonymous
            }
        }
    }

    /// Swaps in `next` and announces it, unless nothing changes.
    fn transition(&self, next: Session, cause: ChangeCause) -> Option<SessionChange> {
        let change = {
            let mut state = self.write_state();
            if state.session == next {
                return None;
            }
            state.epoch += 1;
            let previous = std::mem::replace(&mut state.session, next.clone());
            SessionChange {
                previous,
                current: next,
                cause,
                epoch: state.epoch,
            }
        };

        tracing::info!(
            cause = ?change.cause,
            epoch = change.epoch,
            session = %change.current,
            "session changed"
        );
        if let Err(err) = self.changes.publish(change.clone()) {
            tracing::warn!(?err, "failed to announce session change");
        }
        Some(change)
    }

    fn drain_store_events(&self) -> usize {
        self.store_events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .len()
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl core::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionManager")
            .field("session", &self.current())
            .field("epoch", &self.epoch())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryCredentialStore;
    use encore_auth::{DecodeError, Identity, RoleSet};
    use encore_core::SubjectId;

    /// Accepts `user:<id>` and `admin:<id>`; anything else is malformed.
    struct StubDecoder;

    impl CredentialDecoder for StubDecoder {
        fn decode(&self, credential: &Credential, _now: DateTime<Utc>) -> Result<Identity, DecodeError> {
            let (kind, id) = credential
                .token()
                .split_once(':')
                .ok_or_else(|| DecodeError::Malformed("no separator".to_string()))?;
            let id: i64 = id.parse().map_err(|_| DecodeError::Malformed("bad id".to_string()))?;
            let roles = match kind {
                "user" => RoleSet::from_tags(["ROLE_USER"]),
                "admin" => RoleSet::from_tags(["ROLE_USER", "ROLE_ADMIN"]),
                _ => return Err(DecodeError::Malformed("unknown kind".to_string())),
            };
            Ok(Identity {
                subject_id: SubjectId::new(id),
                display_name: format!("{kind}{id}"),
                roles,
            })
        }
    }

    fn manager_with(store: Arc<InMemoryCredentialStore>) -> SessionManager {
        SessionManager::new(store, Arc::new(StubDecoder))
    }

    #[test]
    fn malformed_credentials_leave_session_anonymous_and_slot_empty() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let manager = manager_with(store.clone());

        for raw in ["garbage", "user:abc", "root:1", "Bearer nope"] {
            let session = manager.login(raw).unwrap();
            assert_eq!(session, Session::Anonymous);
            assert_eq!(manager.current(), Session::Anonymous);
            assert_eq!(store.read().unwrap(), None);
        }
    }

    #[test]
    fn malformed_login_while_authenticated_ends_the_session() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let manager = manager_with(store.clone());
        manager.login("user:1").unwrap();

        manager.login("garbage").unwrap();
        assert!(!manager.is_authenticated());
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn empty_login_is_refused_without_touching_the_session() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let manager = manager_with(store.clone());
        manager.login("user:1").unwrap();
        let epoch = manager.epoch();

        assert!(matches!(manager.login("  "), Err(SessionError::EmptyCredential)));
        assert!(manager.is_authenticated());
        assert_eq!(manager.epoch(), epoch);
    }

    #[test]
    fn login_persists_and_logout_clears() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let manager = manager_with(store.clone());
        let changes = manager.subscribe();

        let session = manager.login("admin:9").unwrap();
        assert!(session.is_admin());
        assert_eq!(store.read().unwrap().as_ref().map(Credential::as_str), Some("admin:9"));

        manager.logout();
        manager.logout();
        assert_eq!(store.read().unwrap(), None);

        let seen = changes.drain();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].cause, ChangeCause::Login);
        assert!(seen[1].became_anonymous());
        assert_eq!(manager.epoch(), 2);
    }

    #[test]
    fn adopts_a_valid_stored_credential_at_startup() {
        let store = Arc::new(InMemoryCredentialStore::with_credential(
            Credential::parse("user:4").unwrap(),
        ));
        let manager = manager_with(store);
        assert_eq!(
            manager.current().identity().map(|i| i.subject_id),
            Some(SubjectId::new(4))
        );
        assert_eq!(manager.reconcile(), None);
    }

    #[test]
    fn clears_a_malformed_stored_credential_at_startup() {
        let store = Arc::new(InMemoryCredentialStore::with_credential(
            Credential::parse("junk").unwrap(),
        ));
        let manager = manager_with(store.clone());
        assert!(!manager.is_authenticated());
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn external_login_is_reconciled_into_the_session() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let manager = manager_with(store.clone());

        store.write(&Credential::parse("user:7").unwrap()).unwrap();
        let change = manager.reconcile().unwrap();

        assert_eq!(change.cause, ChangeCause::ExternalLogin);
        assert!(change.became_authenticated());
        assert!(manager.is_authenticated());
    }

    #[test]
    fn external_logout_is_reconciled_into_the_session() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let manager = manager_with(store.clone());
        manager.login("user:7").unwrap();

        store.clear().unwrap();
        let change = manager.reconcile().unwrap();

        assert_eq!(change.cause, ChangeCause::ExternalLogout);
        assert!(!manager.is_authenticated());
    }

    #[test]
    fn reconciliation_survives_a_poisoned_notification_lock() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let manager = manager_with(store.clone());

        std::thread::scope(|s| {
            let poisoner = s.spawn(|| {
                let _events = manager.store_events.lock().unwrap();
                panic!("holding the notification lock");
            });
            assert!(poisoner.join().is_err());
        });
        assert!(manager.store_events.is_poisoned());

        store.write(&Credential::parse("user:8").unwrap()).unwrap();
        let change = manager.reconcile().unwrap();

        assert_eq!(change.cause, ChangeCause::ExternalLogin);
        assert!(manager.is_authenticated());
    }

    #[test]
    fn external_malformed_credential_is_cleared() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let manager = manager_with(store.clone());
        manager.login("user:7").unwrap();

        store.write(&Credential::parse("junk").unwrap()).unwrap();
        let change = manager.reconcile().unwrap();

        assert_eq!(change.cause, ChangeCause::DecodeFailure);
        assert_eq!(store.read().unwrap(), None);
        assert_eq!(manager.reconcile(), None);
    }

    #[test]
    fn a_different_external_credential_replaces_the_identity() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let manager = manager_with(store.clone());
        manager.login("user:1").unwrap();

        store.write(&Credential::parse("admin:2").unwrap()).unwrap();
        manager.reconcile().unwrap();

        assert!(manager.current().is_admin());
    }

    #[test]
    fn login_then_logout_is_not_resurrected_by_reconciliation() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let manager = manager_with(store.clone());

        manager.login("user:3").unwrap();
        manager.logout();

        // Unrelated notification: someone clears an already empty slot, then
        // a stale subscriber re-announces nothing new.
        store.clear().unwrap();
        assert_eq!(manager.reconcile(), None);
        assert_eq!(manager.current(), Session::Anonymous);
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn reconcile_without_notifications_does_nothing() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let manager = manager_with(store);
        assert_eq!(manager.reconcile(), None);
        assert_eq!(manager.refresh(), None);
    }

    #[test]
    fn forced_logout_reports_authorization_failure() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let manager = manager_with(store.clone());
        let changes = manager.subscribe();
        manager.login("user:5").unwrap();

        manager.force_logout();

        let last = changes.drain().pop().unwrap();
        assert_eq!(last.cause, ChangeCause::AuthorizationFailure);
        assert_eq!(store.read().unwrap(), None);
    }
}
