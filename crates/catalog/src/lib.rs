//! Catalog domain: artists, events and the event lifecycle gate.
//!
//! The remote service owns every entity; this crate holds the client's cached
//! copies and the pure rules that decide which mutations may be requested.

pub mod artist;
pub mod cache;
pub mod event;
pub mod workflow;

mod wire;

pub use artist::{Artist, ArtistDraft};
pub use cache::EntityCache;
pub use event::{Event, EventDraft, EventState};
pub use workflow::{ActionKind, EventAction, GateRejection, available_actions, check, permits};
