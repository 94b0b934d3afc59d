use std::collections::VecDeque;

use crate::protocol::DeltaFragment;

/// Updates retained for rebasing
pub const MAX_HISTORY: usize = 64;

/// All fragments received for one update id
#[derive(Debug, Clone)]
pub struct Update {
    pub id: u16,
    pub fragments: Vec<DeltaFragment>,
    /// Set once an ack covering this update was sent; late fragments are
    /// no longer appended afterwards.
    pub acked: bool,
}

impl Update {
    pub fn new(first: DeltaFragment) -> Self {
        Self {
            id: first.update_id,
            fragments: vec![first],
            acked: false,
        }
    }

    /// Add a fragment, ignoring duplicates. Returns false for a duplicate.
    pub fn push_fragment(&mut self, fragment: DeltaFragment) -> bool {
        if self.has_fragment(fragment.fragment_id) {
            return false;
        }
        self.fragments.push(fragment);
        true
    }

    pub fn has_fragment(&self, fragment_id: u16) -> bool {
        self.fragments.iter().any(|f| f.fragment_id == fragment_id)
    }
}

/// Bounded FIFO of recent updates, oldest first
#[derive(Debug)]
pub struct UpdateHistory {
    entries: VecDeque<Update>,
    capacity: usize,
}

impl UpdateHistory {
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Update> {
        self.entries.iter()
    }

    pub fn get(&self, id: u16) -> Option<&Update> {
        self.entries.iter().find(|u| u.id == id)
    }

    pub fn get_mut(&mut self, id: u16) -> Option<&mut Update> {
        self.entries.iter_mut().find(|u| u.id == id)
    }

    /// Append a new update, evicting the oldest when full
    pub fn push(&mut self, update: Update) -> Option<Update> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(update);
        evicted
    }

    /// Add a fragment to its pending update. Returns false when there is
    /// no unacked update with that id, or the fragment is a duplicate.
    pub fn append(&mut self, fragment: DeltaFragment) -> bool {
        match self.get_mut(fragment.update_id) {
            Some(update) if !update.acked => update.push_fragment(fragment),
            _ => false,
        }
    }

    /// Drop every update with id <= `baseline_id`
    pub fn prune_through(&mut self, baseline_id: u16) -> usize {
        let before = self.entries.len();
        self.entries.retain(|u| u.id > baseline_id);
        before - self.entries.len()
    }

    /// The unacked update with the highest id
    pub fn best_pending_mut(&mut self) -> Option<&mut Update> {
        self.entries
            .iter_mut()
            .filter(|u| !u.acked)
            .max_by_key(|u| u.id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for UpdateHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn fragment(update_id: u16, fragment_id: u16) -> DeltaFragment {
        DeltaFragment {
            update_id,
            baseline_id: 0,
            fragment_id,
            body: Bytes::new(),
        }
    }

    #[test]
    fn test_eviction_keeps_newest() {
        let mut history = UpdateHistory::new();
        for id in 1..=64 {
            assert!(history.push(Update::new(fragment(id, 0))).is_none());
        }
        let evicted = history.push(Update::new(fragment(65, 0))).unwrap();

        assert_eq!(evicted.id, 1);
        assert_eq!(history.iter().count(), 64);
        assert!(history.get(1).is_none());
        assert!(history.get(2).is_some());
        assert!(history.get(65).is_some());
    }

    #[test]
    fn test_append_only_to_pending() {
        let mut history = UpdateHistory::new();
        history.push(Update::new(fragment(3, 0)));

        assert!(history.append(fragment(3, 1)));
        assert!(!history.append(fragment(3, 1)), "duplicate accepted");
        assert!(!history.append(fragment(4, 0)), "unknown update accepted");

        history.get_mut(3).unwrap().acked = true;
        assert!(!history.append(fragment(3, 2)), "late fragment accepted");
        assert_eq!(history.get(3).unwrap().fragments.len(), 2);
    }

    #[test]
    fn test_prune_through_baseline() {
        let mut history = UpdateHistory::new();
        for id in [4, 5, 6, 7] {
            history.push(Update::new(fragment(id, 0)));
        }
        assert_eq!(history.prune_through(5), 2);
        let ids: Vec<u16> = history.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![6, 7]);
    }

    #[test]
    fn test_best_pending_is_highest_unacked() {
        let mut history = UpdateHistory::new();
        for id in [10, 12, 11] {
            history.push(Update::new(fragment(id, 0)));
        }
        history.get_mut(12).unwrap().acked = true;
        assert_eq!(history.best_pending_mut().unwrap().id, 11);

        history.get_mut(11).unwrap().acked = true;
        history.get_mut(10).unwrap().acked = true;
        assert!(history.best_pending_mut().is_none());
    }
}
