//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                                    |
//! |------|------------------------------------------------------------|
//! | 0    | Success                                                    |
//! | 1    | Incomplete records found (only with `--fail-on-missing`)   |
//! | 2    | CLI usage error (bad args; emitted by clap)                |
//! | 3    | Configuration error: nothing was processed                 |
//! | 4    | Runtime I/O error while writing results                    |

/// Success - run completed; directory and report written.
pub const EXIT_SUCCESS: u8 = 0;

/// The missing-fields report is not empty and `--fail-on-missing` was given.
pub const EXIT_MISSING: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config unreadable or invalid, roster or directory unreadable, or the
/// directory lacks the member category. Fatal before any row is processed.
pub const EXIT_CONFIG: u8 = 3;

/// Directory, report or JSON output could not be written.
pub const EXIT_RUNTIME: u8 = 4;
