//! Removal/restoration bookkeeping.
//!
//! When the dataset removes a feature that takes part in the session, the
//! match or unmatched entry it belonged to is taken out of the live lists and
//! parked here under the feature's id. If the dataset later brings back that
//! exact feature (undo of a deletion), the entry is put back.

use std::collections::BTreeMap;

use conflation_core::{FeatureId, Match, Role};

use crate::host::FeatureStore;
use crate::lists::MatchLists;

/// What a removed feature was part of.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEntry {
    Matched(Match),
    Unmatched,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub restored: usize,
    pub purged: usize,
    pub retained: usize,
}

impl SweepReport {
    pub fn merge(self, other: SweepReport) -> SweepReport {
        SweepReport {
            restored: self.restored + other.restored,
            purged: self.purged + other.purged,
            retained: self.retained + other.retained,
        }
    }
}

/// Ledger for one role.
#[derive(Debug)]
pub struct Ledger {
    role: Role,
    entries: BTreeMap<FeatureId, LedgerEntry>,
}

impl Ledger {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            entries: BTreeMap::new(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Park whatever `feature` was part of. Returns false if it took no part
    /// in the session.
    pub fn feature_removed(&mut self, feature: FeatureId, lists: &mut MatchLists) -> bool {
        let key = lists
            .matches
            .get_match_by_role(self.role, feature)
            .map(|m| m.key());
        if let Some(m) = key.and_then(|key| lists.matches.remove(&key)) {
            log::debug!("{} {feature} removed, parking match {}", self.role, m.key());
            self.entries.insert(feature, LedgerEntry::Matched(m));
            return true;
        }

        if lists.unmatched_mut(self.role).remove_element(feature) {
            log::debug!("{} {feature} removed, parking unmatched entry", self.role);
            self.entries.insert(feature, LedgerEntry::Unmatched);
            return true;
        }

        false
    }

    /// Restore whatever `feature` was part of before its removal. Returns
    /// whether a ledger entry existed.
    pub fn feature_added(&mut self, feature: FeatureId, lists: &mut MatchLists) -> bool {
        match self.entries.remove(&feature) {
            Some(entry) => {
                self.restore(feature, entry, lists);
                true
            }
            None => false,
        }
    }

    /// Reconcile after a bulk change: restore entries whose feature is no
    /// longer deleted, keep entries whose feature still is, and (with
    /// `purge_missing`) drop entries whose feature the store no longer knows.
    pub fn sweep(
        &mut self,
        store: &dyn FeatureStore,
        purge_missing: bool,
        lists: &mut MatchLists,
    ) -> SweepReport {
        let mut report = SweepReport::default();
        let features: Vec<FeatureId> = self.entries.keys().copied().collect();

        for feature in features {
            if purge_missing && !store.contains(feature) {
                self.entries.remove(&feature);
                log::debug!("{} {feature} purged from dataset, dropping ledger entry", self.role);
                report.purged += 1;
            } else if !store.is_deleted(feature) {
                if let Some(entry) = self.entries.remove(&feature) {
                    self.restore(feature, entry, lists);
                    report.restored += 1;
                }
            } else {
                report.retained += 1;
            }
        }

        report
    }

    fn restore(&self, feature: FeatureId, entry: LedgerEntry, lists: &mut MatchLists) {
        match entry {
            LedgerEntry::Matched(m) => {
                let key = m.key();
                if lists.matches.add(m) {
                    log::debug!("{} {feature} restored, match {key} is back", self.role);
                } else {
                    log::debug!("{} {feature} restored, but match {key} now conflicts", self.role);
                }
            }
            LedgerEntry::Unmatched => {
                lists.unmatched_mut(self.role).add_element(feature);
                log::debug!("{} {feature} restored to unmatched list", self.role);
            }
        }
    }

    pub fn get(&self, feature: FeatureId) -> Option<&LedgerEntry> {
        self.entries.get(&feature)
    }

    pub fn contains(&self, feature: FeatureId) -> bool {
        self.entries.contains_key(&feature)
    }

    /// Parked features in id order.
    pub fn features(&self) -> impl Iterator<Item = FeatureId> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use conflation_core::MatchKey;

    use super::*;
    use crate::match_set::MatchSet;

    #[derive(Default)]
    struct Store {
        deleted: HashSet<FeatureId>,
        purged: HashSet<FeatureId>,
    }

    impl FeatureStore for Store {
        fn is_deleted(&self, feature: FeatureId) -> bool {
            self.deleted.contains(&feature) || self.purged.contains(&feature)
        }

        fn contains(&self, feature: FeatureId) -> bool {
            !self.purged.contains(&feature)
        }
    }

    fn f(n: u64) -> FeatureId {
        FeatureId(n)
    }

    fn lists() -> MatchLists {
        let mut lists = MatchLists::new();
        lists.install(
            MatchSet::from_matches([Match::new(f(1), f(11)), Match::new(f(2), f(12))]),
            vec![f(3)],
            vec![f(13)],
        );
        lists
    }

    #[test]
    fn removed_match_comes_back_on_add() {
        let mut lists = lists();
        let mut ledger = Ledger::new(Role::Reference);

        assert!(ledger.feature_removed(f(1), &mut lists));
        assert!(!lists.matches.has_match_for_reference(f(1)));
        assert_eq!(
            ledger.get(f(1)),
            Some(&LedgerEntry::Matched(Match::new(f(1), f(11))))
        );

        assert!(ledger.feature_added(f(1), &mut lists));
        assert!(lists.matches.contains(&MatchKey::new(f(1), f(11))));
        assert!(ledger.is_empty());
    }

    #[test]
    fn subject_ledger_looks_up_subject_slot() {
        let mut lists = lists();
        let mut ledger = Ledger::new(Role::Subject);

        assert!(!ledger.feature_removed(f(1), &mut lists));
        assert!(ledger.feature_removed(f(12), &mut lists));
        assert!(!lists.matches.has_match_for_reference(f(2)));
        assert!(ledger.feature_removed(f(13), &mut lists));
        assert!(lists.subject_only.is_empty());
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn unmatched_entry_round_trips() {
        let mut lists = lists();
        let mut ledger = Ledger::new(Role::Reference);

        assert!(ledger.feature_removed(f(3), &mut lists));
        assert!(!lists.reference_only.contains(f(3)));
        assert_eq!(ledger.get(f(3)), Some(&LedgerEntry::Unmatched));

        assert!(ledger.feature_added(f(3), &mut lists));
        assert!(lists.reference_only.contains(f(3)));
        assert!(!ledger.feature_added(f(3), &mut lists));
    }

    #[test]
    fn unknown_feature_is_ignored() {
        let mut lists = lists();
        let mut ledger = Ledger::new(Role::Reference);
        assert!(!ledger.feature_removed(f(99), &mut lists));
        assert!(!ledger.feature_added(f(99), &mut lists));
        assert!(ledger.is_empty());
    }

    #[test]
    fn sweep_restores_only_undeleted() {
        let mut lists = lists();
        let mut ledger = Ledger::new(Role::Reference);
        ledger.feature_removed(f(1), &mut lists);
        ledger.feature_removed(f(3), &mut lists);

        let mut store = Store::default();
        store.deleted.insert(f(3));

        let report = ledger.sweep(&store, true, &mut lists);
        assert_eq!(report, SweepReport { restored: 1, purged: 0, retained: 1 });
        assert!(lists.matches.has_match_for_reference(f(1)));
        assert!(!lists.reference_only.contains(f(3)));
        assert!(ledger.contains(f(3)));
    }

    #[test]
    fn sweep_purges_missing_when_enabled() {
        let mut lists = lists();
        let mut ledger = Ledger::new(Role::Reference);
        ledger.feature_removed(f(3), &mut lists);

        let mut store = Store::default();
        store.purged.insert(f(3));

        let report = ledger.sweep(&store, false, &mut lists);
        assert_eq!(report.retained, 1);
        assert!(ledger.contains(f(3)));

        let report = ledger.sweep(&store, true, &mut lists);
        assert_eq!(report.purged, 1);
        assert!(ledger.is_empty());
        assert!(!lists.reference_only.contains(f(3)));
    }

    #[test]
    fn restore_into_conflict_is_dropped_quietly() {
        let mut lists = lists();
        let mut ledger = Ledger::new(Role::Reference);
        ledger.feature_removed(f(1), &mut lists);
        // Partner got matched elsewhere in the meantime.
        assert!(lists.matches.add(Match::new(f(5), f(11))));

        assert!(ledger.feature_added(f(1), &mut lists));
        assert!(!lists.matches.has_match_for_reference(f(1)));
        assert!(ledger.is_empty());
    }
}
