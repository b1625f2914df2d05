//! `encore-bus` — broadcast/subscription mechanics.
//!
//! Used for credential store change notifications, session transitions and
//! user-visible notices. One writer publishes, any number of readers subscribe.

pub mod broadcast;
pub mod in_memory;

pub use broadcast::{Broadcast, Subscription};
pub use in_memory::{InMemoryBroadcast, InMemoryBroadcastError};
