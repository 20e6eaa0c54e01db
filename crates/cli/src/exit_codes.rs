//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract — scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage error (bad args; clap uses this too)           |
//! | 3    | Schema error (key field missing, bad rename, ...)    |
//! | 4    | Empty input (a source has no data rows)              |
//! | 5    | Ambiguous key (duplicates with `--on-duplicate error`) |
//! | 6    | Load / fetch error (file, URL, decoding)             |
//! | 7    | Export error (writing outputs)                       |
//! | 8    | Job file error (TOML parse or validation)            |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `CliError`'s conversions

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// A key field, rename or mapping column does not fit the tables.
pub const EXIT_SCHEMA: u8 = 3;

/// S4 or ECC has no data rows.
pub const EXIT_EMPTY_INPUT: u8 = 4;

/// Duplicate keys within one source under the `error` policy.
pub const EXIT_AMBIGUOUS_KEY: u8 = 5;

/// A source could not be read, fetched or decoded.
pub const EXIT_LOAD: u8 = 6;

/// MDtable / MDmapping could not be written.
pub const EXIT_EXPORT: u8 = 7;

/// Job file could not be parsed or failed validation.
pub const EXIT_CONFIG: u8 = 8;
