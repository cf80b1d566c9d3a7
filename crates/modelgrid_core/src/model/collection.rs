//! Ordered, observable item collection.
//!
//! # Responsibility
//! - Hold items in display order and mutate them under identity rules.
//! - Publish change events through subscription channels.
//!
//! # Invariants
//! - Insertion order is display order; edits never move an item.
//! - A bulk append publishes exactly one `Reset`, not one event per item.
//! - Identity lookups go by identifier, never by reference or full equality.

use super::{Model, ModelId};
use std::sync::mpsc::{channel, Receiver, Sender};

/// Change published by a [`ModelCollection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionEvent {
    /// One item appended at the end.
    Added { identifier: ModelId },
    /// One item removed.
    Removed { identifier: ModelId },
    /// An item's fields were rewritten in place.
    Updated { identifier: ModelId },
    /// An item changed position during a reorder.
    Moved {
        identifier: ModelId,
        from: usize,
        to: usize,
    },
    /// Bulk change; consumers should re-read the whole collection.
    Reset,
}

/// Handle for cancelling a collection subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// Ordered collection of items with channel-based change notification.
///
/// Subscribers receive events over `std::sync::mpsc` channels; receivers
/// that have been dropped are pruned on the next publish.
pub struct ModelCollection<T: Model> {
    items: Vec<T>,
    subscribers: Vec<(SubscriptionId, Sender<CollectionEvent>)>,
    next_subscription: u64,
}

impl<T: Model> Default for ModelCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Model> ModelCollection<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    /// Position of the item with the given identifier, if present.
    pub fn index_of_identifier(&self, identifier: ModelId) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.identifier() == identifier)
    }

    pub fn contains_identifier(&self, identifier: ModelId) -> bool {
        self.index_of_identifier(identifier).is_some()
    }

    pub fn item_by_identifier(&self, identifier: ModelId) -> Option<&T> {
        self.index_of_identifier(identifier)
            .map(|index| &self.items[index])
    }

    /// Opens a change-event channel.
    pub fn subscribe(&mut self) -> (SubscriptionId, Receiver<CollectionEvent>) {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        let (tx, rx) = channel();
        self.subscribers.push((id, tx));
        (id, rx)
    }

    /// Closes a previously opened change-event channel.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.retain(|(sub, _)| *sub != id);
    }

    /// Appends one item and publishes `Added`.
    pub fn push(&mut self, item: T) {
        let identifier = item.identifier();
        self.items.push(item);
        self.publish(CollectionEvent::Added { identifier });
    }

    /// Appends a batch of items and publishes a single `Reset`.
    ///
    /// An empty batch publishes nothing.
    pub fn append_range(&mut self, items: Vec<T>) {
        if items.is_empty() {
            return;
        }
        self.items.extend(items);
        self.publish(CollectionEvent::Reset);
    }

    /// Removes the item with the given identifier, publishing `Removed`.
    pub fn remove_by_identifier(&mut self, identifier: ModelId) -> Option<T> {
        let index = self.index_of_identifier(identifier)?;
        let removed = self.items.remove(index);
        self.publish(CollectionEvent::Removed { identifier });
        Some(removed)
    }

    /// Writes an edited copy's fields back onto the tracked instance.
    ///
    /// The tracked instance keeps its position; returns `false` when no item
    /// with a matching identifier exists.
    pub fn apply_edit(&mut self, edited: &T) -> bool {
        let identifier = edited.identifier();
        match self.index_of_identifier(identifier) {
            Some(index) => {
                self.items[index].copy_from(edited);
                self.publish(CollectionEvent::Updated { identifier });
                true
            }
            None => false,
        }
    }

    /// Reorders the collection ascending by identifier.
    ///
    /// Publishes one `Moved` per item that actually changes position; an
    /// already sorted collection publishes nothing.
    pub fn sort(&mut self) {
        let mut order: Vec<ModelId> = self.items.iter().map(Model::identifier).collect();
        order.sort_unstable();

        for (target, identifier) in order.into_iter().enumerate() {
            let current = self
                .index_of_identifier(identifier)
                .unwrap_or(target);
            if current == target {
                continue;
            }
            let item = self.items.remove(current);
            self.items.insert(target, item);
            self.publish(CollectionEvent::Moved {
                identifier,
                from: current,
                to: target,
            });
        }
    }

    /// Item whose identifier is nearest to `identifier` by absolute
    /// distance.
    ///
    /// Ties go to the first item encountered in iteration order: a later
    /// item replaces the candidate only when strictly closer.
    pub fn neighbor(&self, identifier: ModelId) -> Option<&T> {
        let mut best: Option<&T> = None;
        let mut best_distance = ModelId::MAX;
        for item in &self.items {
            let distance = item.identifier().abs_diff(identifier);
            if distance < best_distance {
                best_distance = distance;
                best = Some(item);
            }
        }
        best
    }

    /// Clones every item in display order.
    pub fn clone_items(&self) -> Vec<T> {
        self.items.to_vec()
    }

    fn publish(&mut self, event: CollectionEvent) {
        self.subscribers
            .retain(|(_, tx)| tx.send(event).is_ok());
    }
}
