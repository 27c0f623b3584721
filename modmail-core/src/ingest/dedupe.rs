use std::collections::{HashSet, VecDeque};

use crate::entities::DedupeKey;

/// Bounded set of recently seen keys.
///
/// Once `capacity` keys are held the oldest one is forgotten for every new
/// key inserted, so memory stays flat on long-running sessions.
#[derive(Debug, Clone)]
pub struct DedupeWindow {
    capacity: usize,
    order: VecDeque<DedupeKey>,
    seen: HashSet<DedupeKey>,
}

impl DedupeWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    /// Record `key`. Returns `false` if it was already in the window.
    pub fn insert(&mut self, key: DedupeKey) -> bool {
        if self.seen.contains(&key) {
            return false;
        }
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.seen.insert(key.clone());
        self.order.push_back(key);
        true
    }

    pub fn contains(&self, key: &DedupeKey) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
