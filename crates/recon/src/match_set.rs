//! Ordered, event-emitting collection of candidate matches.
//!
//! Insertion order is presentation order. A feature may hold the reference
//! slot of at most one match and the subject slot of at most one match;
//! `add` silently refuses anything that would break that.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::Receiver;

use conflation_core::{FeatureId, Match, MatchKey, Role};

use crate::events::{EventChannel, ListEvent, SubscriptionId};

#[derive(Debug, Default)]
pub struct MatchSet {
    order: Vec<MatchKey>,
    matches: HashMap<MatchKey, Match>,
    by_reference: HashMap<FeatureId, MatchKey>,
    by_subject: HashMap<FeatureId, MatchKey>,
    selected: HashSet<MatchKey>,
    events: EventChannel<ListEvent>,
}

impl MatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from matcher output, dropping entries that reuse a feature.
    pub fn from_matches(matches: impl IntoIterator<Item = Match>) -> Self {
        let mut set = Self::new();
        for m in matches {
            set.insert(m);
        }
        set
    }

    pub fn subscribe(&mut self) -> (SubscriptionId, Receiver<ListEvent>) {
        self.events.subscribe()
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    // -----------------------------------------------------------------------
    // Content
    // -----------------------------------------------------------------------

    /// Append `m`. Returns false (and changes nothing) if either of its
    /// features already takes part in a match in the same role.
    pub fn add(&mut self, m: Match) -> bool {
        match self.insert(m) {
            Some(index) => {
                self.events.emit(ListEvent::added(index));
                true
            }
            None => false,
        }
    }

    /// Append every acceptable match, emitting one interval for the batch.
    /// Returns how many were added.
    pub fn add_all(&mut self, matches: impl IntoIterator<Item = Match>) -> usize {
        let first = self.order.len();
        let added = matches.into_iter().filter_map(|m| self.insert(m)).count();
        if added > 0 {
            self.events.emit(ListEvent::IntervalAdded {
                first,
                last: first + added - 1,
            });
        }
        added
    }

    fn insert(&mut self, m: Match) -> Option<usize> {
        let key = m.key();
        if self.by_reference.contains_key(&m.reference) || self.by_subject.contains_key(&m.subject) {
            log::debug!("rejecting match {key}: a feature is already matched");
            return None;
        }
        self.by_reference.insert(m.reference, key);
        self.by_subject.insert(m.subject, key);
        self.matches.insert(key, m);
        self.order.push(key);
        Some(self.order.len() - 1)
    }

    /// Remove the match identified by `key`, returning it if it was present.
    pub fn remove(&mut self, key: &MatchKey) -> Option<Match> {
        let index = self.index_of(key)?;
        let (m, was_selected) = self.remove_at(index);
        self.events.emit(ListEvent::removed(index));
        if was_selected {
            self.emit_selection();
        }
        Some(m)
    }

    /// Remove every listed match. Returns whether anything was removed.
    pub fn remove_all<'a>(&mut self, keys: impl IntoIterator<Item = &'a MatchKey>) -> bool {
        let mut events = Vec::new();
        let mut selection_touched = false;
        for key in keys {
            if let Some(index) = self.index_of(key) {
                let (_, was_selected) = self.remove_at(index);
                selection_touched |= was_selected;
                events.push(ListEvent::removed(index));
            }
        }
        if events.is_empty() {
            return false;
        }
        self.events.emit_all(events);
        if selection_touched {
            self.emit_selection();
        }
        true
    }

    fn remove_at(&mut self, index: usize) -> (Match, bool) {
        let key = self.order.remove(index);
        self.by_reference.remove(&key.reference);
        self.by_subject.remove(&key.subject);
        let was_selected = self.selected.remove(&key);
        let m = self
            .matches
            .remove(&key)
            .unwrap_or_else(|| Match::new(key.reference, key.subject));
        (m, was_selected)
    }

    /// Drop everything, including the selection.
    pub fn clear(&mut self) {
        let had_selection = !self.selected.is_empty();
        self.reset();
        self.events.emit(ListEvent::ContentsChanged);
        if had_selection {
            self.emit_selection();
        }
    }

    /// Take over the contents of `other` (typically a freshly computed set)
    /// while keeping this set's subscribers.
    pub fn replace_with(&mut self, other: MatchSet) {
        let had_selection = !self.selected.is_empty();
        self.order = other.order;
        self.matches = other.matches;
        self.by_reference = other.by_reference;
        self.by_subject = other.by_subject;
        self.selected.clear();
        self.events.emit(ListEvent::ContentsChanged);
        if had_selection {
            self.emit_selection();
        }
    }

    fn reset(&mut self) {
        self.order.clear();
        self.matches.clear();
        self.by_reference.clear();
        self.by_subject.clear();
        self.selected.clear();
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Match> {
        self.order.get(index).and_then(|key| self.matches.get(key))
    }

    pub fn contains(&self, key: &MatchKey) -> bool {
        self.matches.contains_key(key)
    }

    pub fn index_of(&self, key: &MatchKey) -> Option<usize> {
        if !self.matches.contains_key(key) {
            return None;
        }
        self.order.iter().position(|k| k == key)
    }

    pub fn get_match_by_reference(&self, feature: FeatureId) -> Option<&Match> {
        self.by_reference.get(&feature).and_then(|key| self.matches.get(key))
    }

    pub fn get_match_by_subject(&self, feature: FeatureId) -> Option<&Match> {
        self.by_subject.get(&feature).and_then(|key| self.matches.get(key))
    }

    pub fn get_match_by_role(&self, role: Role, feature: FeatureId) -> Option<&Match> {
        match role {
            Role::Reference => self.get_match_by_reference(feature),
            Role::Subject => self.get_match_by_subject(feature),
        }
    }

    pub fn has_match_for_reference(&self, feature: FeatureId) -> bool {
        self.by_reference.contains_key(&feature)
    }

    pub fn has_match_for_subject(&self, feature: FeatureId) -> bool {
        self.by_subject.contains_key(&feature)
    }

    /// Matches in presentation order.
    pub fn iter(&self) -> impl Iterator<Item = &Match> {
        self.order.iter().filter_map(|key| self.matches.get(key))
    }

    pub fn keys(&self) -> &[MatchKey] {
        &self.order
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    pub fn is_selected(&self, key: &MatchKey) -> bool {
        self.selected.contains(key)
    }

    /// Selected matches in presentation order.
    pub fn selected(&self) -> Vec<&Match> {
        self.iter().filter(|m| self.selected.contains(&m.key())).collect()
    }

    pub fn selected_keys(&self) -> Vec<MatchKey> {
        self.order
            .iter()
            .filter(|key| self.selected.contains(key))
            .copied()
            .collect()
    }

    /// Replace the selection. Keys that are not members are ignored. Emits
    /// `SelectionChanged` only if the resulting selection differs from the
    /// current one; returns whether it did.
    pub fn set_selected(&mut self, keys: impl IntoIterator<Item = MatchKey>) -> bool {
        let next: HashSet<MatchKey> = keys
            .into_iter()
            .filter(|key| self.matches.contains_key(key))
            .collect();
        if next == self.selected {
            return false;
        }
        self.selected = next;
        self.emit_selection();
        true
    }

    pub fn clear_selection(&mut self) -> bool {
        self.set_selected(std::iter::empty())
    }

    /// The match that should take the focus once the current selection is
    /// removed: the first unselected match after the last selected one, or
    /// failing that the nearest unselected match before it.
    pub fn find_next_selection(&self) -> Option<MatchKey> {
        let last = self.order.iter().rposition(|key| self.selected.contains(key))?;
        let unselected = |key: &&MatchKey| !self.selected.contains(*key);
        self.order[last + 1..]
            .iter()
            .find(unselected)
            .or_else(|| self.order[..last].iter().rev().find(unselected))
            .copied()
    }

    fn emit_selection(&mut self) {
        let selected = self.selected_keys();
        self.events.emit(ListEvent::SelectionChanged { selected });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(r: u64, s: u64) -> Match {
        Match::new(FeatureId(r), FeatureId(s))
    }

    fn k(r: u64, s: u64) -> MatchKey {
        MatchKey::new(FeatureId(r), FeatureId(s))
    }

    fn abc() -> MatchSet {
        MatchSet::from_matches([m(1, 11), m(2, 12), m(3, 13)])
    }

    #[test]
    fn add_rejects_reused_features() {
        let mut set = abc();
        assert!(!set.add(m(1, 99)));
        assert!(!set.add(m(99, 12)));
        assert!(set.add(m(4, 14)));
        assert_eq!(set.len(), 4);
        assert_eq!(set.index_of(&k(4, 14)), Some(3));
    }

    #[test]
    fn add_emits_interval() {
        let mut set = MatchSet::new();
        let (_, rx) = set.subscribe();
        set.add(m(1, 11));
        set.add_all([m(2, 12), m(2, 13), m(3, 13)]);
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![ListEvent::added(0), ListEvent::IntervalAdded { first: 1, last: 2 }]
        );
    }

    #[test]
    fn lookup_by_role() {
        let set = abc();
        assert_eq!(set.get_match_by_reference(FeatureId(2)).unwrap().key(), k(2, 12));
        assert_eq!(set.get_match_by_subject(FeatureId(13)).unwrap().key(), k(3, 13));
        assert!(set.get_match_by_subject(FeatureId(2)).is_none());
        assert!(set.has_match_for_reference(FeatureId(1)));
        assert!(!set.has_match_for_subject(FeatureId(1)));
        assert_eq!(set.get_match_by_role(Role::Subject, FeatureId(11)).unwrap().reference, FeatureId(1));
    }

    #[test]
    fn remove_frees_features_and_reports_index() {
        let mut set = abc();
        let (_, rx) = set.subscribe();
        let removed = set.remove(&k(2, 12)).unwrap();
        assert_eq!(removed.key(), k(2, 12));
        assert!(set.remove(&k(2, 12)).is_none());
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![ListEvent::removed(1)]);
        assert!(set.add(m(2, 12)));
        assert_eq!(set.keys(), &[k(1, 11), k(3, 13), k(2, 12)]);
    }

    #[test]
    fn remove_all_reports_whether_anything_went() {
        let mut set = abc();
        assert!(!set.remove_all(&[k(9, 19)]));
        assert!(set.remove_all(&[k(1, 11), k(9, 19), k(3, 13)]));
        assert_eq!(set.keys(), &[k(2, 12)]);
    }

    #[test]
    fn identical_selection_is_silent() {
        let mut set = abc();
        let (_, rx) = set.subscribe();
        assert!(set.set_selected([k(1, 11), k(3, 13)]));
        assert!(!set.set_selected([k(3, 13), k(1, 11)]));
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![ListEvent::SelectionChanged { selected: vec![k(1, 11), k(3, 13)] }]
        );
    }

    #[test]
    fn selection_ignores_non_members() {
        let mut set = abc();
        assert!(!set.set_selected([k(7, 17)]));
        assert!(set.selected().is_empty());
    }

    #[test]
    fn removing_selected_match_updates_selection() {
        let mut set = abc();
        set.set_selected([k(2, 12)]);
        let (_, rx) = set.subscribe();
        set.remove(&k(2, 12));
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![ListEvent::removed(1), ListEvent::SelectionChanged { selected: vec![] }]
        );
    }

    #[test]
    fn next_selection_follows_last_selected() {
        let mut set = abc();
        set.set_selected([k(2, 12)]);
        assert_eq!(set.find_next_selection(), Some(k(3, 13)));
        assert_eq!(set.find_next_selection(), set.find_next_selection());

        let selected = set.selected_keys();
        set.remove_all(&selected);
        assert_eq!(set.keys(), &[k(1, 11), k(3, 13)]);
    }

    #[test]
    fn next_selection_falls_back_to_preceding() {
        let mut set = abc();
        set.set_selected([k(2, 12), k(3, 13)]);
        assert_eq!(set.find_next_selection(), Some(k(1, 11)));

        set.set_selected([k(1, 11), k(2, 12), k(3, 13)]);
        assert_eq!(set.find_next_selection(), None);

        set.clear_selection();
        assert_eq!(set.find_next_selection(), None);
    }

    #[test]
    fn next_selection_skips_selected_gaps() {
        let mut set = MatchSet::from_matches([m(1, 11), m(2, 12), m(3, 13), m(4, 14)]);
        set.set_selected([k(1, 11), k(3, 13), k(4, 14)]);
        assert_eq!(set.find_next_selection(), Some(k(2, 12)));
    }

    #[test]
    fn replace_keeps_subscribers() {
        let mut set = abc();
        set.set_selected([k(1, 11)]);
        let (_, rx) = set.subscribe();
        set.replace_with(MatchSet::from_matches([m(5, 15)]));
        assert_eq!(set.keys(), &[k(5, 15)]);
        assert!(!set.has_match_for_reference(FeatureId(1)));
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![ListEvent::ContentsChanged, ListEvent::SelectionChanged { selected: vec![] }]
        );
    }

    #[test]
    fn clear_empties_everything() {
        let mut set = abc();
        let (_, rx) = set.subscribe();
        set.clear();
        assert!(set.is_empty());
        assert!(set.add(m(1, 11)));
        assert_eq!(rx.try_recv().unwrap(), ListEvent::ContentsChanged);
    }
}
