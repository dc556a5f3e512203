//! `conflation-recon`: match-set reconciliation engine.
//!
//! Keeps a list of candidate matches and the two unmatched lists consistent
//! with a live, externally edited dataset. Pure engine crate: the host feeds
//! in notifications and collaborators, nothing here does IO.

pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod history;
pub mod host;
pub mod ledger;
pub mod lists;
pub mod match_set;
pub mod matching;
pub mod unmatched;

pub use command::{ReconCommand, UndoLog};
pub use config::{MatchSettings, MatchingConfig, ReconConfig};
pub use controller::{
    ConflateReport, Controller, Focus, MatchingStatus, SelectionPlan, SessionState,
};
pub use error::ReconError;
pub use events::ListEvent;
pub use history::History;
pub use host::{FeatureStore, MatchLayer, MergeOutcome, Merger, SelectionTarget};
pub use ledger::{Ledger, LedgerEntry, SweepReport};
pub use match_set::MatchSet;
pub use matching::{MatchRequest, Matcher, Progress, ProgressMonitor};
pub use unmatched::UnmatchedRegistry;
