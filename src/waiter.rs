//! Blocking wait for a set of pieces to become complete.
//!
//! The waiter subscribes to the piece state feed *before* checking the
//! current state of each awaited piece, so a piece finishing in between is
//! still seen. It then drains the feed until nothing is pending, the caller
//! cancels, or the deadline passes.

use crossbeam_channel::{Receiver, Sender, TryRecvError, after, bounded, never, select};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::debug;

use crate::events::Subscription;
use crate::models::Completion;

/// Piece indices still awaited by one download request
pub type PendingSet = BTreeSet<u32>;

/// What the waiter needs from whoever tracks piece state
pub trait PieceStates {
    fn piece_completion(&self, index: u32) -> Completion;
    fn subscribe(&self) -> Subscription;
}

/// Fires a [`CancelToken`]. Cancelling twice is harmless, and dropping the
/// canceller cancels as well.
#[derive(Debug)]
pub struct Canceller {
    tx: Mutex<Option<Sender<()>>>,
}

impl Canceller {
    pub fn cancel(&self) {
        self.tx.lock().take();
    }
}

/// Cancellation signal observed by the drain loop; clones observe the same signal.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: Receiver<()>,
}

impl CancelToken {
    pub fn pair() -> (Canceller, CancelToken) {
        let (tx, rx) = bounded(0);
        (
            Canceller {
                tx: Mutex::new(Some(tx)),
            },
            CancelToken { rx },
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }
}

#[derive(Debug, Clone, Default)]
pub struct WaitOptions {
    pub cancel: Option<CancelToken>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Completed,
    Cancelled { pending: PendingSet },
    TimedOut { pending: PendingSet },
    /// The feed was closed before every piece completed.
    FeedClosed { pending: PendingSet },
}

impl WaitOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, WaitOutcome::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaiterState {
    Computing,
    Draining,
    Done,
}

pub struct PendingPieceWaiter {
    pending: PendingSet,
    state: WaiterState,
    events_seen: usize,
}

impl PendingPieceWaiter {
    pub fn new(pending: PendingSet) -> Self {
        Self {
            pending,
            state: WaiterState::Computing,
            events_seen: 0,
        }
    }

    pub fn state(&self) -> WaiterState {
        self.state
    }

    pub fn pending(&self) -> &PendingSet {
        &self.pending
    }

    /// Feed events consumed while draining
    pub fn events_seen(&self) -> usize {
        self.events_seen
    }

    /// Block until every pending piece is verified complete or the wait ends
    /// some other way. The subscription is released before returning.
    pub fn wait<S>(&mut self, states: &S, options: WaitOptions) -> WaitOutcome
    where
        S: PieceStates + ?Sized,
    {
        let subscription = states.subscribe();

        self.state = WaiterState::Computing;
        self.pending
            .retain(|&index| !states.piece_completion(index).is_verified());
        if self.pending.is_empty() {
            return self.finish(subscription, WaitOutcome::Completed);
        }

        self.state = WaiterState::Draining;
        debug!(pending = self.pending.len(), "waiting for pieces");

        let cancel = options.cancel.map(|c| c.rx).unwrap_or_else(never);
        let deadline = options.timeout.map(after).unwrap_or_else(never);
        let events = subscription.receiver().clone();

        loop {
            select! {
                recv(events) -> msg => match msg {
                    Ok(change) => {
                        self.events_seen += 1;
                        if !self.pending.contains(&change.index) {
                            continue;
                        }
                        debug!(piece = change.index, completion = ?change.completion, "piece state changed");
                        if change.completion.is_verified() {
                            self.pending.remove(&change.index);
                            if self.pending.is_empty() {
                                return self.finish(subscription, WaitOutcome::Completed);
                            }
                        }
                    }
                    Err(_) => {
                        let pending = self.pending.clone();
                        return self.finish(subscription, WaitOutcome::FeedClosed { pending });
                    }
                },
                // Only ever disconnects; no value is sent.
                recv(cancel) -> _ => {
                    let pending = self.pending.clone();
                    return self.finish(subscription, WaitOutcome::Cancelled { pending });
                },
                recv(deadline) -> _ => {
                    let pending = self.pending.clone();
                    return self.finish(subscription, WaitOutcome::TimedOut { pending });
                },
            }
        }
    }

    fn finish(&mut self, subscription: Subscription, outcome: WaitOutcome) -> WaitOutcome {
        subscription.release();
        self.state = WaiterState::Done;
        debug!(?outcome, "wait finished");
        outcome
    }
}

/// Convenience for [`PendingPieceWaiter::wait`] on a fresh waiter
pub fn wait_for_pieces<S>(states: &S, pending: PendingSet, options: WaitOptions) -> WaitOutcome
where
    S: PieceStates + ?Sized,
{
    PendingPieceWaiter::new(pending).wait(states, options)
}
