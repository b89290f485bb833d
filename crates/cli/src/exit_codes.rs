//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Codes
//!
//! | Code | Domain    | Description                                         |
//! |------|-----------|-----------------------------------------------------|
//! | 0    | Universal | Success                                             |
//! | 1    | Universal | General error (unspecified)                         |
//! | 2    | Universal | CLI usage error (bad args, missing command)         |
//! | 3    | recon     | Unmatched distributor rows (`--fail-on-unmatched`)  |
//! | 4    | recon     | Invalid config (TOML syntax or validation)          |
//! | 5    | recon     | Input shape error (missing columns, empty source)   |
//! | 6    | recon     | Runtime error (I/O, CSV, JSON serialization)        |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Recon (3-6)
// =============================================================================

/// Run completed but some distributor rows matched no inventory.
/// Only returned when `--fail-on-unmatched` is given.
pub const EXIT_RECON_UNMATCHED: u8 = 3;

/// Config file could not be parsed or failed validation.
pub const EXIT_RECON_INVALID_CONFIG: u8 = 4;

/// A source table is missing required columns or has no rows.
pub const EXIT_RECON_INPUT: u8 = 5;

/// Reading inputs or writing outputs failed.
pub const EXIT_RECON_RUNTIME: u8 = 6;
