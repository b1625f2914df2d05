use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use encore_core::{ArtistId, Entity, EventId};

use crate::wire;

/// Event lifecycle state.
///
/// `Tentative` is where every new event starts; `Cancelled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventState {
    #[default]
    Tentative,
    Confirmed,
    Rescheduled,
    #[serde(alias = "CANCELED")]
    Cancelled,
}

impl EventState {
    pub fn is_terminal(self) -> bool {
        matches!(self, EventState::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventState::Tentative => "TENTATIVE",
            EventState::Confirmed => "CONFIRMED",
            EventState::Rescheduled => "RESCHEDULED",
            EventState::Cancelled => "CANCELLED",
        }
    }
}

impl core::fmt::Display for EventState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cached copy of a remote event.
///
/// # Invariants
/// - `state` only changes by replacing the whole value with the remote's
///   answer to a gate-approved action.
/// - `assigned_artist_ids` is a set; duplicates from the wire collapse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,

    #[serde(rename = "nombre", alias = "name")]
    pub name: String,

    #[serde(rename = "descripcion", alias = "description", default, deserialize_with = "wire::null_as_default")]
    pub description: Option<String>,

    #[serde(rename = "startDate", deserialize_with = "wire::lenient_date")]
    pub start_date: NaiveDate,

    #[serde(default, deserialize_with = "wire::null_as_default")]
    pub state: EventState,

    #[serde(rename = "artistIds", default, deserialize_with = "wire::null_as_default")]
    pub assigned_artist_ids: BTreeSet<ArtistId>,
}

impl Event {
    pub fn is_assigned(&self, artist_id: ArtistId) -> bool {
        self.assigned_artist_ids.contains(&artist_id)
    }

    /// Tentative events are preliminary and hidden from the public catalog.
    pub fn is_publicly_visible(&self) -> bool {
        self.state != EventState::Tentative
    }
}

impl Entity for Event {
    type Id = EventId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl core::fmt::Display for Event {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{} {} ({}) - {}", self.id, self.name, self.state, self.start_date)
    }
}

/// Payload for creating an event. The remote creates it `TENTATIVE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventDraft {
    #[serde(rename = "nombre")]
    pub name: String,

    #[serde(rename = "descripcion")]
    pub description: String,

    #[serde(rename = "startDate")]
    pub start_date: NaiveDate,
}
