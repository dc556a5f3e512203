use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::feature::{FeatureId, Role};

/// Identity of a match: the (reference, subject) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchKey {
    pub reference: FeatureId,
    pub subject: FeatureId,
}

impl MatchKey {
    pub fn new(reference: FeatureId, subject: FeatureId) -> Self {
        Self { reference, subject }
    }

    /// The feature occupying `role` in this pair.
    pub fn feature(&self, role: Role) -> FeatureId {
        match role {
            Role::Reference => self.reference,
            Role::Subject => self.subject,
        }
    }
}

impl std::fmt::Display for MatchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <-> {}", self.reference, self.subject)
    }
}

/// A candidate pairing of one reference feature with one subject feature.
///
/// `conflicts` holds the tag keys whose values disagree between the two
/// sides, as reported by the matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub reference: FeatureId,
    pub subject: FeatureId,
    #[serde(default)]
    pub score: f64,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub conflicts: BTreeSet<String>,
}

impl Match {
    pub fn new(reference: FeatureId, subject: FeatureId) -> Self {
        Self {
            reference,
            subject,
            score: 0.0,
            conflicts: BTreeSet::new(),
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    pub fn with_conflicts<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conflicts.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn key(&self) -> MatchKey {
        MatchKey::new(self.reference, self.subject)
    }

    pub fn feature(&self, role: Role) -> FeatureId {
        self.key().feature(role)
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}
