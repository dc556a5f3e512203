//! Reversible operations on the session lists.
//!
//! Commands are plain descriptors holding the removed items themselves, never
//! row indices, since the lists can shift between execute and undo.

use conflation_core::{FeatureId, Match, MatchKey, Role};

use crate::lists::MatchLists;

#[derive(Debug, Clone, PartialEq)]
pub enum ReconCommand {
    /// User dismissed matches.
    RemoveMatches { matches: Vec<Match> },
    /// User dismissed unmatched features of one role.
    RemoveUnmatched { role: Role, features: Vec<FeatureId> },
    /// One match was merged in the dataset and leaves the list.
    ConflateMatch { matched: Match },
    /// Unmatched reference features were copied into the subject layer.
    ConflateUnmatched { features: Vec<FeatureId> },
}

impl ReconCommand {
    /// Apply to `lists`. Returns whether anything changed.
    pub fn execute(&self, lists: &mut MatchLists) -> bool {
        match self {
            Self::RemoveMatches { matches } => {
                let keys: Vec<MatchKey> = matches.iter().map(Match::key).collect();
                lists.matches.remove_all(&keys)
            }
            Self::RemoveUnmatched { role, features } => {
                lists.unmatched_mut(*role).remove_all(features)
            }
            Self::ConflateMatch { matched } => lists.matches.remove(&matched.key()).is_some(),
            Self::ConflateUnmatched { features } => {
                lists.unmatched_mut(Role::Reference).remove_all(features)
            }
        }
    }

    /// Put back exactly what `execute` took out.
    pub fn undo(&self, lists: &mut MatchLists) {
        match self {
            Self::RemoveMatches { matches } => {
                lists.matches.add_all(matches.iter().cloned());
            }
            Self::RemoveUnmatched { role, features } => {
                lists.unmatched_mut(*role).add_all(features.iter().copied());
            }
            Self::ConflateMatch { matched } => {
                lists.matches.add(matched.clone());
            }
            Self::ConflateUnmatched { features } => {
                lists
                    .unmatched_mut(Role::Reference)
                    .add_all(features.iter().copied());
            }
        }
    }

    pub fn description(&self) -> String {
        match self {
            Self::RemoveMatches { matches } => {
                format!("Delete {} conflation match{}", matches.len(), plural(matches.len(), "es"))
            }
            Self::RemoveUnmatched { features, .. } => {
                format!("Remove {} unmatched object{}", features.len(), plural(features.len(), "s"))
            }
            Self::ConflateMatch { matched } => format!("Conflate {}", matched.key()),
            Self::ConflateUnmatched { features } => format!(
                "Copy {} unmatched object{} to subject layer",
                features.len(),
                plural(features.len(), "s")
            ),
        }
    }
}

fn plural(n: usize, suffix: &'static str) -> &'static str {
    if n == 1 {
        ""
    } else {
        suffix
    }
}

/// The host's undo/redo stack.
pub trait UndoLog {
    /// Record an already-executed command.
    fn record(&mut self, command: ReconCommand);
}
