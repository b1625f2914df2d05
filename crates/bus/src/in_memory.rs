//! In-memory broadcast.

use std::sync::{Mutex, PoisonError, mpsc};

use crate::broadcast::{Broadcast, Subscription};

#[derive(Debug)]
pub enum InMemoryBroadcastError {
    /// Publish failed due to internal lock poisoning.
    Poisoned,
}

/// In-memory fan-out.
///
/// - No IO / no async
/// - Dead subscribers are pruned while publishing
#[derive(Debug)]
pub struct InMemoryBroadcast<M> {
    subscribers: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> InMemoryBroadcast<M> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M> Default for InMemoryBroadcast<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> Broadcast<M> for InMemoryBroadcast<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBroadcastError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut subs = self
            .subscribers
            .lock()
            .map_err(|_| InMemoryBroadcastError::Poisoned)?;

        subs.retain(|tx| tx.send(message.clone()).is_ok());
        tracing::trace!(subscribers = subs.len(), "broadcast published");

        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();

        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);

        Subscription::new(rx)
    }
}
