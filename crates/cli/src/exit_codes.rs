//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Scripts branch on these codes, so treat them as a stable contract.
//!
//! | Code | Description                                                  |
//! |------|--------------------------------------------------------------|
//! | 0    | Success (review items allowed unless `--fail-on-review`)     |
//! | 1    | General error (unspecified)                                  |
//! | 2    | CLI usage error (bad args, unknown variant, zone missing)    |
//! | 3    | Variant config file is invalid                               |
//! | 4    | Input workbook rejected (unreadable, headers, columns)       |
//! | 5    | Review required (mismatch/error lines, `--fail-on-review`)   |
//! | 6    | Archive or log could not be written                          |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use segmenter_engine::SegmentError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unknown variant, zone not given.
pub const EXIT_USAGE: u8 = 2;

/// Variant TOML could not be parsed or failed validation.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// The workbook failed a fatal precondition; no archive was produced.
pub const EXIT_INPUT_REJECTED: u8 = 4;

/// The run finished but some agencies need review (`--fail-on-review`).
pub const EXIT_REVIEW_REQUIRED: u8 = 5;

/// Output archive or log file could not be written.
pub const EXIT_WRITE_FAILED: u8 = 6;

/// Map a SegmentError to its exit code.
pub fn segment_exit_code(err: &SegmentError) -> u8 {
    match err {
        SegmentError::Config(_) => EXIT_INVALID_CONFIG,
        SegmentError::ZoneRequired => EXIT_USAGE,
        SegmentError::Unreadable(_)
        | SegmentError::MissingSheet { .. }
        | SegmentError::MissingHeaders { .. }
        | SegmentError::MissingColumn { .. }
        | SegmentError::MissingBoundaryColumn { .. }
        | SegmentError::EmptyZone { .. }
        | SegmentError::NoAgenciesForZone { .. } => EXIT_INPUT_REJECTED,
        SegmentError::Render { .. } | SegmentError::Archive(_) => EXIT_WRITE_FAILED,
    }
}
