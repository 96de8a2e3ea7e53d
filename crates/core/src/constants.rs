//! Constants used throughout the ward/lab core crate.

/// Directory under the data directory that holds request records.
pub const REQUESTS_DIR_NAME: &str = "requests";

/// Filename of a stored request document.
pub const REQUEST_FILENAME: &str = "request.yaml";

/// Filename of the per-record lock file, held exclusively across a read-check-write.
pub const REQUEST_LOCK_FILENAME: &str = "request.lock";

/// Default REST listen address.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

/// First hour (UTC, inclusive) counted as day shift in analytics.
pub const DAY_SHIFT_START_HOUR: u32 = 7;

/// Hour (UTC, exclusive) at which night shift starts in analytics.
pub const DAY_SHIFT_END_HOUR: u32 = 19;

/// Default look-back window for request trends.
pub const DEFAULT_TREND_DAYS: u32 = 30;

/// Reason keywords that mark an add-on as preventable (matched case-insensitively).
pub const PREVENTABLE_REASON_KEYWORDS: &[&str] = &["missing", "forgot"];

/// Tests commonly requested as add-ons. Advisory only; any test name is accepted.
pub const SUGGESTED_TESTS: &[&str] = &[
    "CBC",
    "Potassium",
    "Sodium",
    "Creatinine",
    "Lactate",
    "Culture",
    "Blood Gas",
    "Troponin",
    "BNP",
    "D-Dimer",
];

/// Common rejection reasons offered to lab staff. Advisory only.
pub const SUGGESTED_REJECTION_REASONS: &[&str] = &[
    "Old sample",
    "Insufficient quantity",
    "Repeated request without reason",
    "Test not allowed as add-on",
];
