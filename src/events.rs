//! Piece state change feed.

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::Completion;

/// A piece changed completion state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceStateChange {
    pub index: u32,
    pub completion: Completion,
}

#[derive(Debug, Default)]
struct Registry {
    senders: HashMap<u64, Sender<PieceStateChange>>,
    closed: bool,
}

#[derive(Debug, Default)]
struct Subscribers {
    registry: Mutex<Registry>,
    next_id: AtomicU64,
}

/// Fan-out publisher: every live subscription sees every change, in publish order.
#[derive(Debug, Clone, Default)]
pub struct PieceEventBus {
    inner: Arc<Subscribers>,
}

impl PieceEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber. Only changes published after this call are seen.
    ///
    /// Once the bus is closed the returned subscription is already disconnected.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = unbounded();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut registry = self.inner.registry.lock();
        if !registry.closed {
            registry.senders.insert(id, tx);
        }
        drop(registry);
        Subscription {
            id,
            receiver: rx,
            bus: Some(Arc::clone(&self.inner)),
        }
    }

    pub fn publish(&self, change: PieceStateChange) {
        let mut registry = self.inner.registry.lock();
        // A subscriber whose receiver is gone without release is dropped here.
        registry.senders.retain(|_, tx| tx.send(change).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.lock().senders.len()
    }

    /// Close the feed for good: every subscription, present or future, sees
    /// disconnection once drained.
    pub fn close(&self) {
        let mut registry = self.inner.registry.lock();
        registry.closed = true;
        registry.senders.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.registry.lock().closed
    }
}

/// A registered consumer of [`PieceStateChange`]s.
///
/// Acquire with [`PieceEventBus::subscribe`]; give it back with
/// [`Subscription::release`]. Dropping an unreleased subscription releases it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    receiver: Receiver<PieceStateChange>,
    bus: Option<Arc<Subscribers>>,
}

impl Subscription {
    pub fn receiver(&self) -> &Receiver<PieceStateChange> {
        &self.receiver
    }

    pub fn release(mut self) {
        self.unregister();
    }

    fn unregister(&mut self) {
        if let Some(bus) = self.bus.take() {
            bus.registry.lock().senders.remove(&self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unregister();
    }
}
