//! In-memory stand-in for the host editor: a dataset with deleted flags, a
//! selection, and a merger whose answers come from the script.

use std::collections::{BTreeMap, HashMap};

use conflation_core::{FeatureId, LayerId, Match};
use conflation_recon::{FeatureStore, MatchingConfig, MergeOutcome, Merger, SelectionTarget};

use crate::script::{MergerScript, Script};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Live,
    Deleted,
}

pub struct World {
    layers: HashMap<LayerId, BTreeMap<FeatureId, Presence>>,
    selection: Vec<FeatureId>,
}

impl World {
    pub fn from_script(script: &Script) -> Self {
        let mut layers: HashMap<LayerId, BTreeMap<FeatureId, Presence>> = HashMap::new();
        for layer in [&script.layers.reference, &script.layers.subject] {
            let features = layers.entry(layer.id).or_default();
            for &feature in &layer.features {
                features.insert(feature, Presence::Live);
            }
        }
        Self {
            layers,
            selection: Vec::new(),
        }
    }

    /// Mark features deleted. Returns the ones that were live.
    pub fn delete(&mut self, layer: LayerId, features: &[FeatureId]) -> Vec<FeatureId> {
        self.flip(layer, features, Presence::Live, Presence::Deleted)
    }

    /// Bring deleted features back. Returns the ones that were deleted.
    pub fn undelete(&mut self, layer: LayerId, features: &[FeatureId]) -> Vec<FeatureId> {
        self.flip(layer, features, Presence::Deleted, Presence::Live)
    }

    /// Forget features entirely.
    pub fn purge(&mut self, layer: LayerId, features: &[FeatureId]) -> Vec<FeatureId> {
        let Some(layer) = self.layers.get_mut(&layer) else {
            return Vec::new();
        };
        features
            .iter()
            .copied()
            .filter(|f| layer.remove(f).is_some())
            .collect()
    }

    fn flip(
        &mut self,
        layer: LayerId,
        features: &[FeatureId],
        from: Presence,
        to: Presence,
    ) -> Vec<FeatureId> {
        let Some(layer) = self.layers.get_mut(&layer) else {
            return Vec::new();
        };
        let mut changed = Vec::new();
        for &feature in features {
            if let Some(presence) = layer.get_mut(&feature) {
                if *presence == from {
                    *presence = to;
                    changed.push(feature);
                }
            }
        }
        changed
    }

    pub fn selection(&self) -> &[FeatureId] {
        &self.selection
    }

    pub fn set_selection(&mut self, features: &[FeatureId]) {
        self.selection = features.to_vec();
    }

    fn presence(&self, feature: FeatureId) -> Option<Presence> {
        self.layers.values().find_map(|layer| layer.get(&feature).copied())
    }
}

impl FeatureStore for World {
    fn is_deleted(&self, feature: FeatureId) -> bool {
        self.presence(feature) != Some(Presence::Live)
    }

    fn contains(&self, feature: FeatureId) -> bool {
        self.presence(feature).is_some()
    }
}

impl SelectionTarget for World {
    fn replace_selection(&mut self, reference: &[FeatureId], subject: &[FeatureId]) {
        self.selection = reference.iter().chain(subject).copied().collect();
    }
}

/// Merger whose outcomes are read from the script.
pub struct ScriptedMerger {
    cancel: Vec<FeatureId>,
    fail: HashMap<FeatureId, String>,
    copy_failure: Option<String>,
    pub merged: usize,
    pub copied: usize,
}

impl ScriptedMerger {
    pub fn new(script: &MergerScript) -> Self {
        Self {
            cancel: script.cancel.clone(),
            fail: script
                .fail
                .iter()
                .map(|f| (f.reference, f.message.clone()))
                .collect(),
            copy_failure: script.copy_failure.clone(),
            merged: 0,
            copied: 0,
        }
    }
}

impl Merger for ScriptedMerger {
    fn merge(&mut self, matched: &Match, _config: &MatchingConfig) -> MergeOutcome {
        if self.cancel.contains(&matched.reference) {
            return MergeOutcome::Cancelled;
        }
        if let Some(message) = self.fail.get(&matched.reference) {
            return MergeOutcome::Failed(message.clone());
        }
        self.merged += 1;
        MergeOutcome::Merged
    }

    fn copy_to_subject(&mut self, features: &[FeatureId], _config: &MatchingConfig) -> MergeOutcome {
        if let Some(message) = &self.copy_failure {
            return MergeOutcome::Failed(message.clone());
        }
        self.copied += features.len();
        MergeOutcome::Merged
    }
}
