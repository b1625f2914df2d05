//! Boundary to the remote catalog service.

mod http;

use async_trait::async_trait;
use serde::Serialize;

use encore_auth::Credential;
use encore_catalog::{Artist, ArtistDraft, Event, EventAction, EventDraft};
use encore_core::{ArtistId, DomainError, DomainResult, EventId};

use crate::error::ApiError;

pub use http::{HttpCatalogApi, requires_credential};

const MIN_PASSWORD_LEN: usize = 8;
const NAME_LEN: core::ops::RangeInclusive<usize> = 3..=30;

/// Sign-up form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    #[serde(rename = "nombre")]
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    pub fn new(name: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if !NAME_LEN.contains(&self.name.trim().chars().count()) {
            return Err(DomainError::validation("name must be 3 to 30 characters"));
        }
        if !self.email.contains('@') {
            return Err(DomainError::validation("email address is not valid"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation("password must be at least 8 characters"));
        }
        Ok(())
    }
}

/// Remote catalog operations.
///
/// Methods that take a `&Credential` are private endpoints; implementations
/// attach it as a bearer header. Everything else is public.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<Credential, ApiError>;

    /// Returns the service's confirmation message.
    async fn register(&self, registration: &Registration) -> Result<String, ApiError>;

    async fn public_events(&self) -> Result<Vec<Event>, ApiError>;

    async fn public_event(&self, id: EventId) -> Result<Event, ApiError>;

    async fn public_artist(&self, id: ArtistId) -> Result<Artist, ApiError>;

    /// The artist list is public, but carries the credential when there is one.
    async fn artists(&self, credential: Option<&Credential>) -> Result<Vec<Artist>, ApiError>;

    async fn events(&self, credential: &Credential) -> Result<Vec<Event>, ApiError>;

    async fn event(&self, credential: &Credential, id: EventId) -> Result<Event, ApiError>;

    async fn create_event(&self, credential: &Credential, draft: &EventDraft) -> Result<Event, ApiError>;

    /// Performs a lifecycle or assignment action, returning the event as the
    /// service now has it.
    async fn apply_event_action(
        &self,
        credential: &Credential,
        id: EventId,
        action: &EventAction,
    ) -> Result<Event, ApiError>;

    async fn create_artist(&self, credential: &Credential, draft: &ArtistDraft) -> Result<Artist, ApiError>;

    async fn update_artist(
        &self,
        credential: &Credential,
        id: ArtistId,
        draft: &ArtistDraft,
    ) -> Result<Artist, ApiError>;

    async fn delete_artist(&self, credential: &Credential, id: ArtistId) -> Result<(), ApiError>;

    async fn follow_artist(&self, credential: &Credential, id: ArtistId) -> Result<(), ApiError>;

    async fn unfollow_artist(&self, credential: &Credential, id: ArtistId) -> Result<(), ApiError>;

    async fn followed_artists(&self, credential: &Credential) -> Result<Vec<Artist>, ApiError>;

    async fn favorite_event(&self, credential: &Credential, id: EventId) -> Result<(), ApiError>;

    async fn unfavorite_event(&self, credential: &Credential, id: EventId) -> Result<(), ApiError>;

    async fn favorite_events(&self, credential: &Credential) -> Result<Vec<Event>, ApiError>;
}
