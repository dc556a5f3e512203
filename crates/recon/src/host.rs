//! Collaborator interfaces the host editor implements.

use conflation_core::{FeatureId, Match};

use crate::config::MatchingConfig;

/// Read access to a layer's features.
pub trait FeatureStore {
    /// Whether the feature is currently marked deleted.
    fn is_deleted(&self, feature: FeatureId) -> bool;

    /// Whether the layer still knows the feature at all, deleted or not.
    /// Purged features return false.
    fn contains(&self, feature: FeatureId) -> bool;
}

/// The host's "current selection".
pub trait SelectionTarget {
    /// Replace the selection on the reference and subject layers.
    fn replace_selection(&mut self, reference: &[FeatureId], subject: &[FeatureId]);
}

/// Result of asking the host to merge or copy features.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged,
    /// The user backed out; stop the current batch.
    Cancelled,
    /// The merge was rejected; the description is shown to the user.
    Failed(String),
}

/// Performs the actual geometry/tag merge in the host dataset.
pub trait Merger {
    fn merge(&mut self, matched: &Match, config: &MatchingConfig) -> MergeOutcome;

    /// Copy unmatched reference features into the subject layer.
    fn copy_to_subject(&mut self, features: &[FeatureId], config: &MatchingConfig) -> MergeOutcome;
}

/// Map overlay showing the current matches.
pub trait MatchLayer {
    fn attach(&mut self) -> Result<(), String>;
    fn detach(&mut self);
}
