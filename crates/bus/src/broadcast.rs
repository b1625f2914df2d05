//! Publish/subscribe abstraction (mechanics only).
//!
//! A broadcast distributes messages to every live subscriber. It makes minimal
//! assumptions:
//!
//! - **Transport-agnostic**: in-memory channels today; anything with fan-out
//!   semantics fits.
//! - **No persistence**: the broadcast carries notifications, never state.
//!   Consumers re-read the source of truth (e.g. the credential store) when a
//!   notification arrives.
//! - **Non-blocking consumption**: the client is cooperative, so consumers
//!   drain with [`Subscription::drain`] / [`Subscription::try_recv`] at their
//!   own pace rather than parking a thread.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// A subscription to a broadcast stream.
///
/// Each subscription gets a copy of every message published after it was
/// created. Dropping the subscription unsubscribes it on the next publish.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Take every message currently queued, oldest first.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Broadcast channel contract.
///
/// The trait requires `Send + Sync` so a single publisher handle can be
/// shared by every component that reads the same state.
pub trait Broadcast<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> Broadcast<M> for Arc<B>
where
    B: Broadcast<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
