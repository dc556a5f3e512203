//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                        |
//! |------|------------------------------------------------|
//! | 0    | Success                                        |
//! | 1    | General error (unspecified)                    |
//! | 2    | CLI usage error (bad args, unreadable file)    |
//! | 3    | Config file failed to parse or validate        |
//! | 4    | Replay script failed to parse or validate      |
//! | 5    | Session failed at runtime                      |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing input file.
pub const EXIT_USAGE: u8 = 2;

/// Config TOML could not be parsed or failed validation.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Replay script could not be parsed, or names layers/features it never
/// declared.
pub const EXIT_INVALID_SCRIPT: u8 = 4;

/// Matching failed, or a step was rejected by the session.
pub const EXIT_RUNTIME: u8 = 5;

/// Get a human-readable description for an exit code.
pub fn describe(code: u8) -> &'static str {
    match code {
        EXIT_SUCCESS => "success",
        EXIT_ERROR => "general error",
        EXIT_USAGE => "usage error",
        EXIT_INVALID_CONFIG => "invalid config",
        EXIT_INVALID_SCRIPT => "invalid script",
        EXIT_RUNTIME => "runtime failure",
        _ => "unknown",
    }
}
