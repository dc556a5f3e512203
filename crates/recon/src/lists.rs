use conflation_core::{FeatureId, Role};

use crate::match_set::MatchSet;
use crate::unmatched::UnmatchedRegistry;

/// The three live structures of a session, grouped so commands and the
/// ledgers can be handed a single mutable borrow.
#[derive(Debug)]
pub struct MatchLists {
    pub matches: MatchSet,
    pub reference_only: UnmatchedRegistry,
    pub subject_only: UnmatchedRegistry,
}

impl MatchLists {
    pub fn new() -> Self {
        Self {
            matches: MatchSet::new(),
            reference_only: UnmatchedRegistry::new(Role::Reference),
            subject_only: UnmatchedRegistry::new(Role::Subject),
        }
    }

    pub fn unmatched(&self, role: Role) -> &UnmatchedRegistry {
        match role {
            Role::Reference => &self.reference_only,
            Role::Subject => &self.subject_only,
        }
    }

    pub fn unmatched_mut(&mut self, role: Role) -> &mut UnmatchedRegistry {
        match role {
            Role::Reference => &mut self.reference_only,
            Role::Subject => &mut self.subject_only,
        }
    }

    /// Install freshly computed contents, keeping every subscriber.
    pub fn install(
        &mut self,
        matches: MatchSet,
        reference_only: Vec<FeatureId>,
        subject_only: Vec<FeatureId>,
    ) {
        self.matches.replace_with(matches);
        self.reference_only.clear();
        self.reference_only.add_all(reference_only);
        self.subject_only.clear();
        self.subject_only.add_all(subject_only);
    }

    pub fn clear(&mut self) {
        self.matches.clear();
        self.reference_only.clear();
        self.subject_only.clear();
    }

    /// Whether `feature` takes part in the session in `role` at all.
    pub fn participates(&self, role: Role, feature: FeatureId) -> bool {
        self.matches.get_match_by_role(role, feature).is_some()
            || self.unmatched(role).contains(feature)
    }
}

impl Default for MatchLists {
    fn default() -> Self {
        Self::new()
    }
}
