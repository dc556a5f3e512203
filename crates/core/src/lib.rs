//! `conflation-core`: identity types shared by the reconciliation engine and
//! its front ends.

pub mod feature;
pub mod pairing;

pub use feature::{FeatureId, LayerId, Role};
pub use pairing::{Match, MatchKey};
