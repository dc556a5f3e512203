use std::fmt;

use crate::controller::SessionState;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (zero history limit, bad threshold, etc.).
    ConfigValidation(String),
    /// Operation requires a different session state.
    InvalidState { operation: &'static str, state: SessionState },
    /// The matching worker could not be started or vanished without reporting.
    Worker(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::InvalidState { operation, state } => {
                write!(f, "cannot {operation} while session is {state}")
            }
            Self::Worker(msg) => write!(f, "matching worker error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
