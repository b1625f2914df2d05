//! `encore-session` — the single owner of "who is logged in".
//!
//! The session is derived from one persisted credential slot. The
//! [`SessionManager`] is its only writer; everything else reads a snapshot or
//! subscribes to [`SessionChange`] notifications.

pub mod manager;
pub mod session;
pub mod store;

pub use manager::{SessionError, SessionManager};
pub use session::{ChangeCause, Session, SessionChange};
pub use store::{CredentialStore, FileCredentialStore, InMemoryCredentialStore, StoreChange, StoreError};
