//! Error types for sheetwarden-core

use thiserror::Error;

use crate::sheet_name::SheetNameViolation;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sheetwarden-core
///
/// Every variant is a validation failure: it is raised before the workbook
/// model is touched.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid cell address format or out-of-limit coordinates
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Invalid cell range format
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// Sheet name breaks one or more naming rules
    #[error("Invalid sheet name '{name}': {}", join_violations(.violations))]
    InvalidSheetName {
        name: String,
        violations: Vec<SheetNameViolation>,
    },

    /// Duplicate sheet name (case-insensitive)
    #[error("Duplicate sheet name: {0}")]
    DuplicateSheetName(String),

    /// Sheet index past the last worksheet
    #[error("No worksheet at index {0}")]
    InvalidSheetIndex(usize),

    /// Sheet not found by name
    #[error("Sheet '{name}' not found. Available: {}", .available.join(", "))]
    SheetNotFound { name: String, available: Vec<String> },

    /// Format type is not one of currency, percent, number, accounting
    #[error("Unknown format type '{0}' (expected currency, percent, number or accounting)")]
    UnknownFormatType(String),

    /// Too many decimal places for a number format
    #[error("Decimal places must be between 0 and {max}, got {actual}")]
    InvalidDecimals { actual: i64, max: u8 },

    /// Named style is not in the catalog
    #[error("Unknown style '{0}'")]
    UnknownStyle(String),

    /// Caller text could not be converted to the requested value kind
    #[error("Cannot parse '{text}' as {kind}")]
    InvalidValue { text: String, kind: &'static str },

    /// Unknown value kind name
    #[error("Unknown value type '{0}' (expected auto, string, number, integer or date)")]
    UnknownValueKind(String),
}

fn join_violations(violations: &[SheetNameViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
