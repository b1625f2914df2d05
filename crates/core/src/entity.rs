//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Entities are owned by the remote service; the client only ever holds
/// cached copies keyed by this identifier.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + Ord + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
