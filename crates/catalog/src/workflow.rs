//! Event lifecycle gate.
//!
//! Every mutating event action is checked here twice: once to decide whether
//! the control is offered, and again right before the request is issued.
//! The gate never moves an event to its target state; the cached copy is
//! replaced with the remote's confirmation instead.

use chrono::NaiveDate;
use thiserror::Error;

use encore_core::{ArtistId, DomainError, DomainResult};

use crate::event::{Event, EventState};

/// Action tag, independent of its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Confirm,
    Reschedule,
    Cancel,
    AssignArtist,
    UnassignArtist,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::Confirm,
        ActionKind::Reschedule,
        ActionKind::Cancel,
        ActionKind::AssignArtist,
        ActionKind::UnassignArtist,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Confirm => "confirm",
            ActionKind::Reschedule => "reschedule",
            ActionKind::Cancel => "cancel",
            ActionKind::AssignArtist => "assign artist",
            ActionKind::UnassignArtist => "unassign artist",
        }
    }
}

impl core::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A requested event mutation with its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    Confirm,
    Reschedule(NaiveDate),
    Cancel,
    AssignArtist(ArtistId),
    UnassignArtist(ArtistId),
}

impl EventAction {
    /// Builds a reschedule action from user input (`YYYY-MM-DD`).
    pub fn reschedule(raw: &str) -> DomainResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DomainError::validation("reschedule requires a new date"));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(EventAction::Reschedule)
            .map_err(|e| DomainError::validation(format!("invalid date '{raw}': {e}")))
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            EventAction::Confirm => ActionKind::Confirm,
            EventAction::Reschedule(_) => ActionKind::Reschedule,
            EventAction::Cancel => ActionKind::Cancel,
            EventAction::AssignArtist(_) => ActionKind::AssignArtist,
            EventAction::UnassignArtist(_) => ActionKind::UnassignArtist,
        }
    }

    /// State the remote is expected to report after accepting the action.
    ///
    /// Informational only; callers must apply the remote's answer.
    pub fn target_state(&self) -> Option<EventState> {
        match self {
            EventAction::Confirm => Some(EventState::Confirmed),
            EventAction::Reschedule(_) => Some(EventState::Rescheduled),
            EventAction::Cancel => Some(EventState::Cancelled),
            EventAction::AssignArtist(_) | EventAction::UnassignArtist(_) => None,
        }
    }
}

/// State-only part of the gate.
///
/// Artist assignment eligibility by state is decided remotely; locally only
/// membership is checked (see [`check`]).
pub const fn permits(state: EventState, action: ActionKind) -> bool {
    use ActionKind as A;
    use EventState as S;

    match (state, action) {
        (S::Cancelled, A::Confirm | A::Reschedule | A::Cancel) => false,
        (S::Confirmed, A::Confirm) => false,
        (S::Tentative, A::Cancel) => false,

        (S::Tentative | S::Rescheduled, A::Confirm) => true,
        (S::Tentative | S::Confirmed | S::Rescheduled, A::Reschedule) => true,
        (S::Confirmed | S::Rescheduled, A::Cancel) => true,

        (_, A::AssignArtist | A::UnassignArtist) => true,
    }
}

/// Lists the state-permitted actions, in a stable order.
pub fn available_actions(state: EventState) -> Vec<ActionKind> {
    ActionKind::ALL
        .into_iter()
        .filter(|kind| permits(state, *kind))
        .collect()
}

/// Why the gate refused an action.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    #[error("cannot {action} an event that is {state}")]
    InvalidState { action: ActionKind, state: EventState },

    #[error("artist {0} is already assigned to this event")]
    AlreadyAssigned(ArtistId),

    #[error("artist {0} is not assigned to this event")]
    NotAssigned(ArtistId),
}

/// Full gate check against the cached event.
pub fn check(event: &Event, action: &EventAction) -> Result<(), GateRejection> {
    let kind = action.kind();
    if !permits(event.state, kind) {
        return Err(GateRejection::InvalidState {
            action: kind,
            state: event.state,
        });
    }

    match *action {
        EventAction::AssignArtist(artist_id) if event.is_assigned(artist_id) => {
            Err(GateRejection::AlreadyAssigned(artist_id))
        }
        EventAction::UnassignArtist(artist_id) if !event.is_assigned(artist_id) => {
            Err(GateRejection::NotAssigned(artist_id))
        }
        _ => Ok(()),
    }
}
