//! Replay script format.
//!
//! A script declares the two layers, the candidate matches the matcher will
//! propose, how the merger answers, and a list of steps to drive through a
//! session:
//!
//! ```toml
//! [layers.reference]
//! id = 1
//! features = [1, 2, 3, 4]
//!
//! [layers.subject]
//! id = 2
//! features = [11, 12, 13, 14]
//!
//! [[candidates]]
//! reference = 1
//! subject = 11
//! score = 0.93
//!
//! [merger]
//! cancel = [2]
//! fail = [{ reference = 3, message = "ways share no nodes" }]
//!
//! [[steps]]
//! op = "delete"
//! layer = 1
//! features = [1]
//! ```

use std::collections::HashSet;

use serde::Deserialize;

use conflation_core::{FeatureId, LayerId, Match, Role};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    pub layers: Layers,
    #[serde(default)]
    pub candidates: Vec<Match>,
    #[serde(default)]
    pub merger: MergerScript,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Layers {
    pub reference: LayerScript,
    pub subject: LayerScript,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerScript {
    pub id: LayerId,
    pub features: Vec<FeatureId>,
    /// Features taking part in matching. Defaults to every feature.
    #[serde(default)]
    pub selection: Option<Vec<FeatureId>>,
}

impl LayerScript {
    pub fn selection(&self) -> Vec<FeatureId> {
        self.selection.clone().unwrap_or_else(|| self.features.clone())
    }
}

/// How the scripted merger answers, keyed by reference feature.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergerScript {
    /// Merges the user backs out of.
    #[serde(default)]
    pub cancel: Vec<FeatureId>,
    #[serde(default)]
    pub fail: Vec<ScriptedFailure>,
    /// Reject every copy of unmatched features with this message.
    #[serde(default)]
    pub copy_failure: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptedFailure {
    pub reference: FeatureId,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Delete features, with per-feature notifications.
    Delete { layer: LayerId, features: Vec<FeatureId> },
    /// Undelete features, with per-feature notifications.
    Undelete { layer: LayerId, features: Vec<FeatureId> },
    /// Undelete features silently, then send one bulk-change notification.
    BulkRestore { layer: LayerId, features: Vec<FeatureId> },
    /// Drop features from the dataset for good, then send a bulk change.
    Purge { layer: LayerId, features: Vec<FeatureId> },
    /// Replace the dataset selection.
    Select { features: Vec<FeatureId> },
    /// Click match rows, identified by their reference feature.
    SelectMatches { references: Vec<FeatureId> },
    Conflate,
    ConflateUnmatched { features: Vec<FeatureId> },
    RemoveMatches,
    RemoveUnmatched { role: Role, features: Vec<FeatureId> },
    Undo,
    Redo,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Delete { .. } => "delete",
            Self::Undelete { .. } => "undelete",
            Self::BulkRestore { .. } => "bulk_restore",
            Self::Purge { .. } => "purge",
            Self::Select { .. } => "select",
            Self::SelectMatches { .. } => "select_matches",
            Self::Conflate => "conflate",
            Self::ConflateUnmatched { .. } => "conflate_unmatched",
            Self::RemoveMatches => "remove_matches",
            Self::RemoveUnmatched { .. } => "remove_unmatched",
            Self::Undo => "undo",
            Self::Redo => "redo",
        }
    }

    fn layer(&self) -> Option<LayerId> {
        match self {
            Self::Delete { layer, .. }
            | Self::Undelete { layer, .. }
            | Self::BulkRestore { layer, .. }
            | Self::Purge { layer, .. } => Some(*layer),
            _ => None,
        }
    }

    fn features(&self) -> &[FeatureId] {
        match self {
            Self::Delete { features, .. }
            | Self::Undelete { features, .. }
            | Self::BulkRestore { features, .. }
            | Self::Purge { features, .. }
            | Self::Select { features }
            | Self::ConflateUnmatched { features }
            | Self::RemoveUnmatched { features, .. } => features,
            Self::SelectMatches { references } => references,
            Self::Conflate | Self::RemoveMatches | Self::Undo | Self::Redo => &[],
        }
    }
}

impl Script {
    pub fn from_toml(s: &str) -> Result<Self, String> {
        let script: Self = toml::from_str(s).map_err(|e| e.to_string())?;
        script.validate()?;
        Ok(script)
    }

    /// Check that every layer and feature the script mentions was declared.
    pub fn validate(&self) -> Result<(), String> {
        let reference = &self.layers.reference;
        let subject = &self.layers.subject;
        let layer_ids = [reference.id, subject.id];

        let mut known: HashSet<FeatureId> = HashSet::new();
        for layer in [reference, subject] {
            for &feature in &layer.features {
                // A layer playing both roles lists its features twice.
                if !known.insert(feature) && reference.id != subject.id {
                    return Err(format!("feature {feature} declared in both layers"));
                }
            }
            if let Some(selection) = &layer.selection {
                if let Some(f) = selection.iter().find(|f| !layer.features.contains(f)) {
                    return Err(format!("selection names undeclared feature {f} on {}", layer.id));
                }
            }
        }

        for m in &self.candidates {
            if !reference.features.contains(&m.reference) {
                return Err(format!("candidate {} uses undeclared reference feature", m.key()));
            }
            if !subject.features.contains(&m.subject) {
                return Err(format!("candidate {} uses undeclared subject feature", m.key()));
            }
        }

        for (i, step) in self.steps.iter().enumerate() {
            let n = i + 1;
            if let Some(layer) = step.layer() {
                if !layer_ids.contains(&layer) {
                    return Err(format!("step {n} ({}): unknown {layer}", step.name()));
                }
            }
            if let Some(f) = step.features().iter().find(|f| !known.contains(f)) {
                return Err(format!("step {n} ({}): unknown feature {f}", step.name()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
[layers.reference]
id = 1
features = [1, 2]

[layers.subject]
id = 2
features = [11, 12]

[[candidates]]
reference = 1
subject = 11
score = 0.5
conflicts = ["name"]
"#;

    #[test]
    fn parses_steps() {
        let toml = format!(
            "{BASE}
[[steps]]
op = \"delete\"
layer = 1
features = [1]

[[steps]]
op = \"remove_unmatched\"
role = \"subject\"
features = [12]

[[steps]]
op = \"undo\"
"
        );
        let script = Script::from_toml(&toml).unwrap();
        assert_eq!(script.candidates[0].score, 0.5);
        assert!(script.candidates[0].has_conflicts());
        assert_eq!(script.steps.len(), 3);
        assert!(matches!(
            &script.steps[1],
            Step::RemoveUnmatched { role: Role::Subject, features } if features == &[FeatureId(12)]
        ));
        assert_eq!(script.steps[2].name(), "undo");
    }

    #[test]
    fn rejects_unknown_feature_in_step() {
        let toml = format!("{BASE}\n[[steps]]\nop = \"select\"\nfeatures = [99]\n");
        let err = Script::from_toml(&toml).unwrap_err();
        assert_eq!(err, "step 1 (select): unknown feature #99");
    }

    #[test]
    fn rejects_unknown_layer() {
        let toml = format!("{BASE}\n[[steps]]\nop = \"purge\"\nlayer = 7\nfeatures = [1]\n");
        let err = Script::from_toml(&toml).unwrap_err();
        assert!(err.contains("unknown layer 7"), "{err}");
    }

    #[test]
    fn rejects_undeclared_candidate() {
        let toml = format!("{BASE}\n[[candidates]]\nreference = 2\nsubject = 13\n");
        let err = Script::from_toml(&toml).unwrap_err();
        assert!(err.contains("undeclared subject feature"), "{err}");
    }

    #[test]
    fn rejects_unknown_op() {
        let toml = format!("{BASE}\n[[steps]]\nop = \"explode\"\n");
        assert!(Script::from_toml(&toml).is_err());
    }
}
