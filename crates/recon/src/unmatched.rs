//! Features of one role that ended up without a partner.

use std::collections::HashSet;
use std::sync::mpsc::Receiver;

use conflation_core::{FeatureId, Role};

use crate::events::{EventChannel, ListEvent, SubscriptionId};

/// Ordered registry of unmatched features for a single role.
///
/// Selection lives in the presentation layer; `index_of` lets it translate a
/// feature into a visible row.
#[derive(Debug)]
pub struct UnmatchedRegistry {
    role: Role,
    items: Vec<FeatureId>,
    members: HashSet<FeatureId>,
    events: EventChannel<ListEvent>,
}

impl UnmatchedRegistry {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            items: Vec::new(),
            members: HashSet::new(),
            events: EventChannel::new(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn subscribe(&mut self) -> (SubscriptionId, Receiver<ListEvent>) {
        self.events.subscribe()
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Append `feature` unless already present.
    pub fn add_element(&mut self, feature: FeatureId) -> bool {
        if !self.members.insert(feature) {
            return false;
        }
        self.items.push(feature);
        self.events.emit(ListEvent::added(self.items.len() - 1));
        true
    }

    /// Append every feature not already present; one interval for the batch.
    pub fn add_all(&mut self, features: impl IntoIterator<Item = FeatureId>) -> usize {
        let first = self.items.len();
        for feature in features {
            if self.members.insert(feature) {
                self.items.push(feature);
            }
        }
        let added = self.items.len() - first;
        if added > 0 {
            self.events.emit(ListEvent::IntervalAdded {
                first,
                last: self.items.len() - 1,
            });
        }
        added
    }

    /// Returns whether `feature` was present.
    pub fn remove_element(&mut self, feature: FeatureId) -> bool {
        if !self.members.remove(&feature) {
            return false;
        }
        if let Some(index) = self.items.iter().position(|f| *f == feature) {
            self.items.remove(index);
            self.events.emit(ListEvent::removed(index));
        }
        true
    }

    /// Returns whether anything was removed.
    pub fn remove_all<'a>(&mut self, features: impl IntoIterator<Item = &'a FeatureId>) -> bool {
        let mut removed = false;
        for feature in features {
            removed |= self.remove_element(*feature);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.members.clear();
        self.events.emit(ListEvent::ContentsChanged);
    }

    pub fn contains(&self, feature: FeatureId) -> bool {
        self.members.contains(&feature)
    }

    pub fn index_of(&self, feature: FeatureId) -> Option<usize> {
        if !self.members.contains(&feature) {
            return None;
        }
        self.items.iter().position(|f| *f == feature)
    }

    pub fn get(&self, index: usize) -> Option<FeatureId> {
        self.items.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = FeatureId> + '_ {
        self.items.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<FeatureId> {
        self.items.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u64]) -> Vec<FeatureId> {
        raw.iter().map(|&n| FeatureId(n)).collect()
    }

    #[test]
    fn add_all_skips_duplicates() {
        let mut reg = UnmatchedRegistry::new(Role::Reference);
        let (_, rx) = reg.subscribe();
        assert_eq!(reg.add_all(ids(&[1, 2, 2, 3])), 3);
        assert_eq!(reg.add_all(ids(&[3])), 0);
        assert!(!reg.add_element(FeatureId(1)));
        assert_eq!(reg.to_vec(), ids(&[1, 2, 3]));
        assert_eq!(
            rx.try_iter().collect::<Vec<_>>(),
            vec![ListEvent::IntervalAdded { first: 0, last: 2 }]
        );
    }

    #[test]
    fn remove_element_reports_presence() {
        let mut reg = UnmatchedRegistry::new(Role::Subject);
        reg.add_all(ids(&[4, 5, 6]));
        let (_, rx) = reg.subscribe();
        assert!(reg.remove_element(FeatureId(5)));
        assert!(!reg.remove_element(FeatureId(5)));
        assert_eq!(reg.index_of(FeatureId(6)), Some(1));
        assert_eq!(reg.index_of(FeatureId(5)), None);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![ListEvent::removed(1)]);
    }

    #[test]
    fn remove_all_and_clear() {
        let mut reg = UnmatchedRegistry::new(Role::Reference);
        reg.add_all(ids(&[1, 2, 3]));
        assert!(!reg.remove_all(&ids(&[8, 9])));
        assert!(reg.remove_all(&ids(&[1, 3])));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get(0), Some(FeatureId(2)));

        reg.clear();
        assert!(reg.is_empty());
        assert!(!reg.contains(FeatureId(2)));
    }
}
