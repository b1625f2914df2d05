//! Application orchestrator.
//!
//! `EncoreApp` ties the session manager, the view router and the remote API
//! together. Every user action goes through the same steps: check the session
//! (and, for event mutations, the workflow gate), call the remote, then apply
//! the remote's answer to the screen that asked for it, provided that screen
//! and the session it was asked under are both still current.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use encore_auth::Credential;
use encore_bus::{Broadcast, InMemoryBroadcast, Subscription};
use encore_catalog::{ActionKind, Artist, ArtistDraft, EntityCache, Event, EventAction, EventDraft, workflow};
use encore_core::{ArtistId, DomainError, EventId};
use encore_navigation::{NavigationState, Resolution, SideEffect, View, ViewRouter, ViewScope, require_login};
use encore_session::{ChangeCause, Session, SessionChange, SessionManager};

use crate::api::{CatalogApi, Registration};
use crate::error::{ActionError, ApiError, ErrorClass};
use crate::notice::Notice;
use crate::screen::{Details, Screen};

const RESTRICTED: &str = "Preliminary information, access restricted.";

/// Whether a fetch result made it onto the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// The view was torn down or the session changed while waiting.
    Discarded,
}

impl LoadOutcome {
    fn and(self, other: LoadOutcome) -> LoadOutcome {
        match (self, other) {
            (LoadOutcome::Applied, LoadOutcome::Applied) => LoadOutcome::Applied,
            _ => LoadOutcome::Discarded,
        }
    }
}

/// How a request was made, for the forced-logout decision.
#[derive(Debug, Clone, Copy)]
enum Call {
    Public,
    /// Carried the credential of session `epoch`.
    Authenticated { epoch: u64 },
}

/// The view and session a piece of async work started under.
#[derive(Debug, Clone, Copy)]
struct Ticket {
    scope: ViewScope,
    epoch: u64,
}

enum Relation {
    Follow(ArtistId),
    Unfollow(ArtistId),
    Favorite(EventId),
    Unfavorite(EventId),
}

struct ViewState {
    router: ViewRouter,
    screen: Screen,
}

pub struct EncoreApp {
    session: Arc<SessionManager>,
    api: Arc<dyn CatalogApi>,
    view: Mutex<ViewState>,
    session_events: Mutex<Subscription<SessionChange>>,
    notices: InMemoryBroadcast<Notice>,
}

impl EncoreApp {
    pub fn new(session: Arc<SessionManager>, api: Arc<dyn CatalogApi>) -> Self {
        let session_events = session.subscribe();
        let router = ViewRouter::new();
        let screen = Screen::mount(&router.current());
        Self {
            session,
            api,
            view: Mutex::new(ViewState { router, screen }),
            session_events: Mutex::new(session_events),
            notices: InMemoryBroadcast::new(),
        }
    }

    pub fn session(&self) -> Session {
        self.session.current()
    }

    pub fn session_manager(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn current_view(&self) -> NavigationState {
        self.lock_view().router.current()
    }

    /// Snapshot of the current screen's data.
    pub fn screen(&self) -> Screen {
        self.lock_view().screen.clone()
    }

    pub fn subscribe_notices(&self) -> Subscription<Notice> {
        self.notices.subscribe()
    }

    /// Actions the gate currently offers for a loaded event.
    pub fn available_actions(&self, event_id: EventId) -> Option<Vec<ActionKind>> {
        self.lock_view()
            .screen
            .managed_event(event_id)
            .map(|event| workflow::available_actions(event.state))
    }

    // ---- navigation -------------------------------------------------------

    /// Asks the guard for `view` and shows whatever it decides.
    pub fn navigate(&self, view: View, target_id: Option<i64>) -> Resolution {
        self.sync_session();
        let session = self.session.current();

        let resolution = {
            let mut state = self.lock_view();
            let before = state.router.scope();
            let resolution = state.router.navigate(view, target_id, &session);
            if !state.router.is_live(&before) {
                state.screen = Screen::mount(&resolution.state);
            }
            resolution
        };

        if let Some(effect) = resolution.effect {
            self.notify(effect.into());
        }
        resolution
    }

    /// Navigates and loads the resulting view.
    pub async fn open(&self, view: View, target_id: Option<i64>) -> Result<LoadOutcome, ActionError> {
        self.navigate(view, target_id);
        self.load_current_view().await
    }

    /// Picks up credential changes made elsewhere and reloads if needed.
    pub async fn refresh_session(&self) -> Vec<SessionChange> {
        self.session.refresh();
        let changes = self.sync_session();

        for change in &changes {
            match change.cause {
                ChangeCause::ExternalLogin => {
                    self.notify(Notice::info(format!("Signed in elsewhere as {}.", change.current)));
                }
                ChangeCause::ExternalLogout => self.notify(Notice::info("Signed out elsewhere.")),
                _ => {}
            }
        }

        if !changes.is_empty() {
            if let Err(err) = self.load_current_view().await {
                tracing::debug!(error = %err, "reload after session change failed");
            }
        }
        changes
    }

    /// Fetches the data the current view shows.
    pub async fn load_current_view(&self) -> Result<LoadOutcome, ActionError> {
        self.sync_session();
        let ticket = self.ticket();
        let state = ticket.scope.state();
        let session = self.session.current();

        match state.view {
            View::Login | View::Register => Ok(LoadOutcome::Applied),

            View::Home => {
                let result = self.api.public_events().await;
                self.settle(ticket, result, Call::Public, |screen, events| {
                    if let Screen::Home { events: slot } = screen {
                        *slot = Some(events.into_iter().filter(Event::is_publicly_visible).collect());
                    }
                })
            }

            View::Artists => {
                let credential = session.credential().cloned();
                let call = match credential {
                    Some(_) => Call::Authenticated { epoch: ticket.epoch },
                    None => Call::Public,
                };
                let result = self.api.artists(credential.as_ref()).await;
                self.settle(ticket, result, call, |screen, artists| {
                    if let Screen::Artists { artists: slot } = screen {
                        *slot = Some(EntityCache::from_entities(artists));
                    }
                })
            }

            View::EventDetails => {
                let id = state.event_id().ok_or_else(|| no_target("event"))?;
                let result = match self.api.public_event(id).await {
                    Ok(event) if event.is_publicly_visible() => Ok(Details::Visible(event)),
                    Ok(_) => Ok(Details::Restricted),
                    Err(err) if err.status_code() == Some(403) => Ok(Details::Restricted),
                    Err(err) => Err(err),
                };
                let restricted = matches!(result, Ok(Details::Restricted));
                let outcome = self.settle(ticket, result, Call::Public, |screen, details| {
                    if let Screen::EventDetails { details: slot, .. } = screen {
                        *slot = Some(details);
                    }
                })?;
                if restricted && outcome == LoadOutcome::Applied {
                    self.notify(Notice::warning(RESTRICTED));
                }
                Ok(outcome)
            }

            View::Dashboard => {
                let (credential, call) = self.authenticated()?;
                let (followed, favorites) = tokio::join!(
                    async {
                        let result = self.api.followed_artists(&credential).await;
                        self.settle(ticket, result, call, |screen, artists| {
                            if let Screen::Dashboard { followed, .. } = screen {
                                *followed = Some(EntityCache::from_entities(artists));
                            }
                        })
                    },
                    async {
                        let result = self.api.favorite_events(&credential).await;
                        self.settle(ticket, result, call, |screen, events| {
                            if let Screen::Dashboard { favorites, .. } = screen {
                                *favorites = Some(EntityCache::from_entities(events));
                            }
                        })
                    },
                );
                Ok(followed?.and(favorites?))
            }

            View::Admin => {
                let (credential, call) = self.authenticated()?;
                let (events, artists) = tokio::join!(
                    async {
                        let result = self.api.events(&credential).await;
                        self.settle(ticket, result, call, |screen, fetched| {
                            if let Screen::Admin { events, .. } = screen {
                                *events = Some(EntityCache::from_entities(fetched));
                            }
                        })
                    },
                    async {
                        let result = self.api.artists(Some(&credential)).await;
                        self.settle(ticket, result, call, |screen, fetched| {
                            if let Screen::Admin { artists, .. } = screen {
                                *artists = Some(EntityCache::from_entities(fetched));
                            }
                        })
                    },
                );
                Ok(events?.and(artists?))
            }

            View::EditArtist => {
                let id = state.artist_id().ok_or_else(|| no_target("artist"))?;
                let result = self.api.public_artist(id).await;
                self.settle(ticket, result, Call::Public, |screen, fetched| {
                    if let Screen::EditArtist { artist, .. } = screen {
                        *artist = Some(fetched);
                    }
                })
            }

            View::EditEvent => {
                let id = state.event_id().ok_or_else(|| no_target("event"))?;
                let (credential, call) = self.authenticated()?;
                let (event, artists) = tokio::join!(
                    async {
                        let result = self.api.event(&credential, id).await;
                        self.settle(ticket, result, call, |screen, fetched| {
                            if let Screen::EditEvent { event, .. } = screen {
                                *event = Some(fetched);
                            }
                        })
                    },
                    async {
                        let result = self.api.artists(Some(&credential)).await;
                        self.settle(ticket, result, call, |screen, fetched| {
                            if let Screen::EditEvent { artists, .. } = screen {
                                *artists = Some(EntityCache::from_entities(fetched));
                            }
                        })
                    },
                );
                Ok(event?.and(artists?))
            }
        }
    }

    // ---- session ----------------------------------------------------------

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ActionError> {
        let credential = self
            .api
            .login(email.trim(), password)
            .await
            .map_err(|err| self.fail(err.into(), Call::Public))?;

        let session = self
            .session
            .login(credential.as_str())
            .map_err(|err| self.fail(err.into(), Call::Public))?;
        self.sync_session();

        if !session.is_authenticated() {
            return Err(self.fail(ActionError::InvalidCredential, Call::Public));
        }

        self.notify(Notice::success(format!("Welcome, {session}.")));
        self.navigate(View::Dashboard, None);
        if let Err(err) = self.load_current_view().await {
            tracing::debug!(error = %err, "dashboard load after sign-in failed");
        }
        Ok(session)
    }

    /// Creates an account and returns the service's confirmation.
    pub async fn register(&self, registration: &Registration) -> Result<String, ActionError> {
        registration
            .validate()
            .map_err(|err| self.fail(err.into(), Call::Public))?;

        let message = self
            .api
            .register(registration)
            .await
            .map_err(|err| self.fail(err.into(), Call::Public))?;

        self.notify(Notice::success(message.clone()));
        self.navigate(View::Login, None);
        Ok(message)
    }

    pub async fn sign_out(&self) {
        self.session.logout();
        self.sync_session();
        self.navigate(View::Home, None);
        self.notify(Notice::info("Signed out."));
        if let Err(err) = self.load_current_view().await {
            tracing::debug!(error = %err, "home load after sign-out failed");
        }
    }

    // ---- relations --------------------------------------------------------

    pub async fn follow_artist(&self, id: ArtistId) -> Result<(), ActionError> {
        self.relate(Relation::Follow(id)).await
    }

    pub async fn unfollow_artist(&self, id: ArtistId) -> Result<(), ActionError> {
        self.relate(Relation::Unfollow(id)).await
    }

    pub async fn favorite_event(&self, id: EventId) -> Result<(), ActionError> {
        self.relate(Relation::Favorite(id)).await
    }

    pub async fn unfavorite_event(&self, id: EventId) -> Result<(), ActionError> {
        self.relate(Relation::Unfavorite(id)).await
    }

    async fn relate(&self, relation: Relation) -> Result<(), ActionError> {
        let (credential, call) = self.authenticated()?;

        let (result, done, refetch) = match relation {
            Relation::Follow(id) => (
                self.api.follow_artist(&credential, id).await,
                format!("Now following artist #{id}."),
                false,
            ),
            Relation::Unfollow(id) => (
                self.api.unfollow_artist(&credential, id).await,
                format!("Stopped following artist #{id}."),
                true,
            ),
            Relation::Favorite(id) => (
                self.api.favorite_event(&credential, id).await,
                format!("Event #{id} added to favorites."),
                false,
            ),
            Relation::Unfavorite(id) => (
                self.api.unfavorite_event(&credential, id).await,
                format!("Event #{id} removed from favorites."),
                true,
            ),
        };
        result.map_err(|err| self.fail(err.into(), call))?;
        self.notify(Notice::success(done));

        if refetch && self.current_view().view == View::Dashboard {
            if let Err(err) = self.load_current_view().await {
                tracing::debug!(error = %err, "dashboard reload failed");
            }
        }
        Ok(())
    }

    // ---- event workflow ---------------------------------------------------

    /// Runs a workflow action against an event loaded in the current view.
    ///
    /// The gate is checked against the cached event before anything is sent.
    /// On success the cached event is replaced with the remote's answer; on
    /// failure it is left as it was.
    pub async fn perform(&self, event_id: EventId, action: EventAction) -> Result<Event, ActionError> {
        let (credential, call) = self.administrator()?;
        let ticket = self.ticket();

        let cached = self.lock_view().screen.managed_event(event_id).cloned();
        let cached = cached.ok_or_else(|| self.fail(ActionError::NotLoaded(format!("event #{event_id}")), call))?;

        if let Err(rejection) = workflow::check(&cached, &action) {
            tracing::info!(event = %event_id, action = %action.kind(), %rejection, "gate rejected event action");
            return Err(self.fail(rejection.into(), call));
        }

        tracing::info!(event = %event_id, action = %action.kind(), "requesting event action");
        let updated = self
            .api
            .apply_event_action(&credential, event_id, &action)
            .await
            .map_err(|err| self.fail(err.into(), call))?;

        self.commit(ticket, |screen| screen.store_event(updated.clone()));
        let done = match action {
            EventAction::AssignArtist(artist_id) => format!("Artist #{artist_id} assigned to {}.", updated.name),
            EventAction::UnassignArtist(artist_id) => format!("Artist #{artist_id} removed from {}.", updated.name),
            _ => format!("{} is now {}.", updated.name, updated.state),
        };
        self.notify(Notice::success(done));
        Ok(updated)
    }

    // ---- catalog management -----------------------------------------------

    pub async fn create_artist(&self, draft: &ArtistDraft) -> Result<Artist, ActionError> {
        let (credential, call) = self.administrator()?;
        if draft.name.trim().is_empty() {
            return Err(self.fail(DomainError::validation("artist name is required").into(), call));
        }

        let ticket = self.ticket();
        let created = self
            .api
            .create_artist(&credential, draft)
            .await
            .map_err(|err| self.fail(err.into(), call))?;

        self.commit(ticket, |screen| screen.store_artist(created.clone()));
        self.notify(Notice::success(format!("Artist {} created.", created.name)));
        Ok(created)
    }

    pub async fn update_artist(&self, id: ArtistId, draft: &ArtistDraft) -> Result<Artist, ActionError> {
        let (credential, call) = self.administrator()?;
        if draft.name.trim().is_empty() {
            return Err(self.fail(DomainError::validation("artist name is required").into(), call));
        }

        let ticket = self.ticket();
        let updated = self
            .api
            .update_artist(&credential, id, draft)
            .await
            .map_err(|err| self.fail(err.into(), call))?;

        self.commit(ticket, |screen| screen.store_artist(updated.clone()));
        self.notify(Notice::success(format!("Artist {} updated.", updated.name)));
        Ok(updated)
    }

    pub async fn delete_artist(&self, id: ArtistId) -> Result<(), ActionError> {
        let (credential, call) = self.administrator()?;
        let ticket = self.ticket();
        self.api
            .delete_artist(&credential, id)
            .await
            .map_err(|err| self.fail(err.into(), call))?;

        self.commit(ticket, |screen| screen.forget_artist(id));
        self.notify(Notice::success(format!("Artist #{id} deleted.")));
        Ok(())
    }

    /// Creates an event; the service creates it `TENTATIVE`.
    pub async fn create_event(&self, draft: &EventDraft) -> Result<Event, ActionError> {
        let (credential, call) = self.administrator()?;
        if draft.name.trim().is_empty() || draft.description.trim().is_empty() {
            return Err(self.fail(
                DomainError::validation("event name and description are required").into(),
                call,
            ));
        }

        let ticket = self.ticket();
        let created = self
            .api
            .create_event(&credential, draft)
            .await
            .map_err(|err| self.fail(err.into(), call))?;

        self.commit(ticket, |screen| screen.store_event(created.clone()));
        self.notify(Notice::success(format!("Event {} created ({}).", created.name, created.state)));
        Ok(created)
    }

    // ---- plumbing ---------------------------------------------------------

    /// Applies pending session transitions to the router.
    ///
    /// Any transition remounts the current screen: its data belonged to the
    /// previous session.
    fn sync_session(&self) -> Vec<SessionChange> {
        let changes = self
            .session_events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain();
        if changes.is_empty() {
            return changes;
        }

        let effects: Vec<SideEffect> = {
            let mut state = self.lock_view();
            let effects = changes
                .iter()
                .filter_map(|change| state.router.on_session_change(change))
                .filter_map(|resolution| resolution.effect)
                .collect();
            let current = state.router.current();
            state.screen = Screen::mount(&current);
            effects
        };
        for effect in effects {
            self.notify(effect.into());
        }
        changes
    }

    /// Credential for a call that needs a session, or the login redirect.
    fn authenticated(&self) -> Result<(Credential, Call), ActionError> {
        self.sync_session();
        let epoch = self.session.epoch();
        let session = self.session.current();

        if let Some(resolution) = require_login(&session) {
            tracing::info!("action needs a session; redirecting to login");
            {
                let mut state = self.lock_view();
                let before = state.router.scope();
                state.router.apply(&resolution);
                if !state.router.is_live(&before) {
                    state.screen = Screen::mount(&resolution.state);
                }
            }
            if let Some(effect) = resolution.effect {
                self.notify(effect.into());
            }
            return Err(ActionError::LoginRequired);
        }

        match session.credential() {
            Some(credential) => Ok((credential.clone(), Call::Authenticated { epoch })),
            None => Err(ActionError::LoginRequired),
        }
    }

    fn administrator(&self) -> Result<(Credential, Call), ActionError> {
        let granted = self.authenticated()?;
        if !self.session.current().is_admin() {
            tracing::warn!("administrator action attempted without the admin role");
            self.notify(SideEffect::AccessDenied.into());
            return Err(ActionError::AccessDenied);
        }
        Ok(granted)
    }

    fn ticket(&self) -> Ticket {
        Ticket {
            scope: self.lock_view().router.scope(),
            epoch: self.session.epoch(),
        }
    }

    fn is_current(&self, ticket: &Ticket, state: &ViewState) -> bool {
        state.router.is_live(&ticket.scope) && self.session.epoch() == ticket.epoch
    }

    /// Applies `apply` to the screen if the ticket is still current.
    fn commit(&self, ticket: Ticket, apply: impl FnOnce(&mut Screen)) -> LoadOutcome {
        let mut state = self.lock_view();
        if !self.is_current(&ticket, &state) {
            tracing::debug!(view = %ticket.scope.state(), "discarding stale result");
            return LoadOutcome::Discarded;
        }
        apply(&mut state.screen);
        LoadOutcome::Applied
    }

    /// Commits a fetch result, or routes its failure through [`Self::fail`].
    ///
    /// Failures of stale fetches are dropped, except for authorization
    /// failures on a credential that is still the current one.
    fn settle<T>(
        &self,
        ticket: Ticket,
        result: Result<T, ApiError>,
        call: Call,
        apply: impl FnOnce(&mut Screen, T),
    ) -> Result<LoadOutcome, ActionError> {
        match result {
            Ok(value) => Ok(self.commit(ticket, |screen| apply(screen, value))),
            Err(err) => {
                let current = {
                    let state = self.lock_view();
                    self.is_current(&ticket, &state)
                };
                let credential_current =
                    matches!(call, Call::Authenticated { epoch } if epoch == self.session.epoch());

                if !current && !(credential_current && err.forces_logout(true)) {
                    tracing::debug!(error = %err, "discarding stale failure");
                    return Ok(LoadOutcome::Discarded);
                }
                Err(self.fail(err.into(), call))
            }
        }
    }

    /// The single failure funnel.
    ///
    /// An authorization failure on a request that carried the current
    /// credential ends the session and sends the user to login; everything
    /// else becomes a notice.
    fn fail(&self, err: ActionError, call: Call) -> ActionError {
        let forced = match (&err, call) {
            (ActionError::Api(api), Call::Authenticated { epoch }) => {
                api.forces_logout(true) && epoch == self.session.epoch()
            }
            _ => false,
        };

        if forced {
            tracing::warn!(error = %err, "remote rejected the credential; ending session");
            self.session.force_logout();
            self.sync_session();
            self.navigate(View::Login, None);
            self.notify(SideEffect::SessionExpired.into());
            return err;
        }

        let notice = match err.class() {
            ErrorClass::Transient => {
                tracing::error!(error = %err, "action failed");
                Notice::error(err.user_message())
            }
            _ => {
                tracing::warn!(error = %err, "action rejected");
                Notice::warning(err.user_message())
            }
        };
        self.notify(notice);
        err
    }

    fn notify(&self, notice: Notice) {
        tracing::debug!(%notice, "notice");
        if let Err(err) = self.notices.publish(notice) {
            tracing::warn!(?err, "failed to publish notice");
        }
    }

    fn lock_view(&self) -> MutexGuard<'_, ViewState> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn no_target(kind: &str) -> ActionError {
    ActionError::Invalid(DomainError::invalid_id(format!("no {kind} selected")))
}

impl core::fmt::Debug for EncoreApp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EncoreApp")
            .field("session", &self.session)
            .field("view", &self.current_view())
            .finish_non_exhaustive()
    }
}
