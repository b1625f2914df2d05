//! `encore-core` — shared building blocks for the Encore catalog client.
//!
//! This crate contains **pure** primitives (no IO, no transport concerns).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{ArtistId, EventId, SubjectId};
