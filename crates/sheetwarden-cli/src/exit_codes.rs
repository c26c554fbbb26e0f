//! CLI exit codes
//!
//! Scripts branch on these, so they only ever grow.
//!
//! | Code | Meaning                                             |
//! |------|-----------------------------------------------------|
//! | 0    | Success                                             |
//! | 1    | Any failure other than a security rejection         |
//! | 2    | Formula rejected by the security policy             |
//!
//! Argument errors reported by clap also exit with 1, so that 2 always
//! means a security rejection.

/// Command completed.
pub const EXIT_SUCCESS: u8 = 0;

/// Validation, lock, IO, session or argument failure.
pub const EXIT_ERROR: u8 = 1;

/// A formula used a blocked function or an external link without
/// `--allow-external`.
pub const EXIT_SECURITY: u8 = 2;
