use serde::Deserialize;

use conflation_core::{FeatureId, LayerId};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
}

impl ReconConfig {
    /// Parse from TOML and validate.
    pub fn from_toml(s: &str) -> Result<Self, ReconError> {
        let config: Self =
            toml::from_str(s).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.session.history_limit == 0 {
            return Err(ReconError::ConfigValidation(
                "session.history_limit must be at least 1".into(),
            ));
        }

        let threshold = self.matching.distance_threshold;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ReconError::ConfigValidation(format!(
                "matching.distance_threshold must be a positive number, got {threshold}"
            )));
        }

        if let Some(key) = self.matching.merge_tags.iter().find(|k| k.trim().is_empty()) {
            return Err(ReconError::ConfigValidation(format!(
                "matching.merge_tags contains an empty key: {key:?}"
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Undo entries kept by `History`.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Drop ledger entries for features the dataset no longer knows at all
    /// when a bulk change is swept.
    #[serde(default = "default_true")]
    pub purge_missing: bool,
    /// Attach the visualization layer when matches are installed.
    #[serde(default = "default_true")]
    pub show_match_layer: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            purge_missing: true,
            show_match_layer: true,
        }
    }
}

fn default_history_limit() -> usize {
    100
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Tuning handed through to the matcher and merger. The engine itself never
/// interprets these values.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchingConfig {
    #[serde(default = "default_distance_threshold")]
    pub distance_threshold: f64,
    #[serde(default)]
    pub merge_tags: Vec<String>,
    #[serde(default = "default_true")]
    pub replace_geometry: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            distance_threshold: default_distance_threshold(),
            merge_tags: Vec::new(),
            replace_geometry: true,
        }
    }
}

fn default_distance_threshold() -> f64 {
    20.0
}

// ---------------------------------------------------------------------------
// Runtime settings for one matching run
// ---------------------------------------------------------------------------

/// What the user picked in the configuration step: the two layers, the
/// features to consider on each side, and the matcher tuning.
#[derive(Debug, Clone)]
pub struct MatchSettings {
    pub reference_layer: LayerId,
    pub subject_layer: LayerId,
    pub reference_selection: Vec<FeatureId>,
    pub subject_selection: Vec<FeatureId>,
    pub matching: MatchingConfig,
}
