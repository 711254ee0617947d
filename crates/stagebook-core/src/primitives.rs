//! # Fixed Primitives
//!
//! Compile-time constants for the Stagebook core.
//!
//! Thresholds here are deliberately not runtime-configurable: every report
//! produced from the same data must classify it the same way.

/// Burn percentage at which a stage or project becomes "At Risk" (inclusive).
pub const RISK_THRESHOLD_PERCENT: u64 = 80;

/// Burn percentage above which a stage or project is "Overrun" (exclusive).
pub const OVERRUN_THRESHOLD_PERCENT: u64 = 100;

/// Fixed-point scale for [`crate::Hours`]: one hour is 100 units.
pub const HOURS_SCALE: u64 = 100;

/// Magic bytes for the snapshot export header.
pub const MAGIC_BYTES: &[u8; 4] = b"STBK";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the snapshot layout.
pub const FORMAT_VERSION: u8 = 1;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of organisation and project names.
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum length of a contact's first or last name.
pub const MAX_PERSON_NAME_LENGTH: usize = 100;

/// Maximum length of a project job number.
pub const MAX_JOB_NUMBER_LENGTH: usize = 50;

/// Maximum length of free-text fields (descriptions, notes).
pub const MAX_TEXT_LENGTH: usize = 4096;

/// Maximum hours a single time entry may record.
pub const MAX_HOURS_PER_ENTRY: u64 = 24;

/// Maximum allocated hours for one stage.
///
/// Bounds the fixed-point sums so they can never overflow.
pub const MAX_ALLOCATED_HOURS: u64 = 1_000_000;
