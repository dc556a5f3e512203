//! Change notifications for the presentation layer.
//!
//! Each list structure owns an [`EventChannel`]. Subscribers get an mpsc
//! receiver and drain it whenever they like; events are only ever sent after
//! the mutation that produced them has finished, so a subscriber can never
//! observe (or re-enter) a half-applied change.

use std::sync::mpsc::{self, Receiver, Sender};

use conflation_core::MatchKey;

/// Handle returned by [`EventChannel::subscribe`].
pub type SubscriptionId = u64;

/// Notification variants shared by the Match Set and the unmatched registries.
///
/// Intervals are inclusive row indices at the time of the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent {
    IntervalAdded { first: usize, last: usize },
    IntervalRemoved { first: usize, last: usize },
    ContentsChanged,
    /// Only emitted by the Match Set.
    SelectionChanged { selected: Vec<MatchKey> },
}

impl ListEvent {
    pub fn added(index: usize) -> Self {
        Self::IntervalAdded { first: index, last: index }
    }

    pub fn removed(index: usize) -> Self {
        Self::IntervalRemoved { first: index, last: index }
    }
}

/// Fan-out of events to any number of subscribers.
#[derive(Debug)]
pub struct EventChannel<E> {
    senders: Vec<(SubscriptionId, Sender<E>)>,
    next_id: SubscriptionId,
}

impl<E: Clone> EventChannel<E> {
    pub fn new() -> Self {
        Self {
            senders: Vec::new(),
            next_id: 1,
        }
    }

    /// Register a subscriber and return its receiver.
    pub fn subscribe(&mut self) -> (SubscriptionId, Receiver<E>) {
        let id = self.next_id;
        self.next_id += 1;
        let (tx, rx) = mpsc::channel();
        self.senders.push((id, tx));
        (id, rx)
    }

    /// Returns whether `id` was subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.senders.len();
        self.senders.retain(|(sub_id, _)| *sub_id != id);
        self.senders.len() != before
    }

    /// Send `event` to every live subscriber. Subscribers whose receiver has
    /// been dropped are pruned.
    pub fn emit(&mut self, event: E) {
        self.senders.retain(|(id, tx)| {
            let alive = tx.send(event.clone()).is_ok();
            if !alive {
                log::debug!("dropping disconnected subscriber {id}");
            }
            alive
        });
    }

    pub fn emit_all(&mut self, events: impl IntoIterator<Item = E>) {
        for event in events {
            self.emit(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.senders.len()
    }
}

impl<E: Clone> Default for EventChannel<E> {
    fn default() -> Self {
        Self::new()
    }
}
