//! Capacity-bounded logs for chat and round history

use std::collections::VecDeque;

use serde::Serialize;

/// An ordered log that never holds more than `limit` entries
///
/// Appending at one end evicts from the other, so the log keeps the most
/// recent entries whichever end they are written to.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Bounded<T> {
    items: VecDeque<T>,
    #[serde(skip)]
    limit: usize,
}

impl<T: Clone> Bounded<T> {
    /// Creates an empty log holding at most `limit` entries
    pub fn new(limit: usize) -> Self {
        Self {
            items: VecDeque::new(),
            limit,
        }
    }

    /// Appends at the back, evicting the oldest entries from the front
    pub fn push_back(&mut self, item: T) {
        self.items.push_back(item);
        while self.items.len() > self.limit {
            self.items.pop_front();
        }
    }

    /// Prepends at the front, evicting the oldest entries from the back
    pub fn push_front(&mut self, item: T) {
        self.items.push_front(item);
        self.items.truncate(self.limit);
    }

    /// Number of entries in the log
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates the entries front to back
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Iterates the entries front to back, mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    /// Copies the entries front to back
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}
