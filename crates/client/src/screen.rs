//! View-owned data.
//!
//! Each screen owns whatever it fetched. Nothing is shared between screens;
//! leaving a view drops its data and the next view fetches its own.
//! `None` means "not resolved yet".

use encore_catalog::{Artist, EntityCache, Event};
use encore_core::{ArtistId, EventId};
use encore_navigation::{NavigationState, View};

/// What the public event details view can show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Details {
    Visible(Event),
    /// Preliminary event, not shown to the public.
    Restricted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Home {
        events: Option<EntityCache<Event>>,
    },
    Login,
    Register,
    Artists {
        artists: Option<EntityCache<Artist>>,
    },
    EventDetails {
        event_id: Option<EventId>,
        details: Option<Details>,
    },
    Dashboard {
        followed: Option<EntityCache<Artist>>,
        favorites: Option<EntityCache<Event>>,
    },
    Admin {
        events: Option<EntityCache<Event>>,
        artists: Option<EntityCache<Artist>>,
    },
    EditArtist {
        artist_id: Option<ArtistId>,
        artist: Option<Artist>,
    },
    EditEvent {
        event_id: Option<EventId>,
        event: Option<Event>,
        artists: Option<EntityCache<Artist>>,
    },
}

impl Screen {
    /// A freshly mounted, empty screen for `state`.
    pub fn mount(state: &NavigationState) -> Self {
        match state.view {
            View::Home => Screen::Home { events: None },
            View::Login => Screen::Login,
            View::Register => Screen::Register,
            View::Artists => Screen::Artists { artists: None },
            View::EventDetails => Screen::EventDetails {
                event_id: state.event_id(),
                details: None,
            },
            View::Dashboard => Screen::Dashboard {
                followed: None,
                favorites: None,
            },
            View::Admin => Screen::Admin {
                events: None,
                artists: None,
            },
            View::EditArtist => Screen::EditArtist {
                artist_id: state.artist_id(),
                artist: None,
            },
            View::EditEvent => Screen::EditEvent {
                event_id: state.event_id(),
                event: None,
                artists: None,
            },
        }
    }

    pub fn view(&self) -> View {
        match self {
            Screen::Home { .. } => View::Home,
            Screen::Login => View::Login,
            Screen::Register => View::Register,
            Screen::Artists { .. } => View::Artists,
            Screen::EventDetails { .. } => View::EventDetails,
            Screen::Dashboard { .. } => View::Dashboard,
            Screen::Admin { .. } => View::Admin,
            Screen::EditArtist { .. } => View::EditArtist,
            Screen::EditEvent { .. } => View::EditEvent,
        }
    }

    /// The cached event a workflow action would apply to.
    pub fn managed_event(&self, id: EventId) -> Option<&Event> {
        match self {
            Screen::Admin { events: Some(events), .. } => events.get(id),
            Screen::EditEvent { event: Some(event), .. } if event.id == id => Some(event),
            _ => None,
        }
    }

    /// Replaces an event this screen manages with the remote's version.
    pub fn store_event(&mut self, updated: Event) {
        match self {
            Screen::Admin { events: Some(events), .. } => {
                events.insert(updated);
            }
            Screen::EditEvent { event_id, event, .. } if *event_id == Some(updated.id) => {
                *event = Some(updated);
            }
            _ => {}
        }
    }

    pub fn store_artist(&mut self, updated: Artist) {
        match self {
            Screen::Admin { artists: Some(artists), .. } => {
                artists.insert(updated);
            }
            Screen::EditArtist { artist_id, artist } if *artist_id == Some(updated.id) => {
                *artist = Some(updated);
            }
            _ => {}
        }
    }

    pub fn forget_artist(&mut self, id: ArtistId) {
        if let Screen::Admin { artists: Some(artists), .. } = self {
            artists.remove(id);
        }
    }

    /// Artist names for an event's assignments.
    ///
    /// Ids the artist list has not resolved (yet) are shown as `#id`.
    pub fn assigned_artist_names(&self, event: &Event) -> Vec<String> {
        let artists = match self {
            Screen::Admin { artists, .. } | Screen::EditEvent { artists, .. } => artists.as_ref(),
            _ => None,
        };
        event
            .assigned_artist_ids
            .iter()
            .map(|id| match artists.and_then(|cache| cache.get(*id)) {
                Some(artist) => artist.name.clone(),
                None => format!("#{id}"),
            })
            .collect()
    }
}
