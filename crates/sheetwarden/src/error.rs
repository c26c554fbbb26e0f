//! Error types for sheetwarden

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use sheetwarden_core::Error as CoreError;
use sheetwarden_csv::CsvError;
use sheetwarden_formula::{FormulaClass, FormulaError};
use sheetwarden_xlsx::XlsxError;
use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by sessions, locks, saves and exports
#[derive(Debug, Error)]
pub enum Error {
    /// Address, sheet name, style, format or value validation
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Formula rejected by the validator
    #[error(transparent)]
    Formula(#[from] FormulaError),

    /// Workbook codec failure
    #[error("Workbook codec error: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("CSV export error: {0}")]
    Csv(#[from] CsvError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Lock contention outlasted the timeout
    #[error("Timed out after {} ms waiting for the lock on {}", .waited.as_millis(), .path.display())]
    Lock { path: PathBuf, waited: Duration },

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Caller input rejected before anything was touched
    #[error("{0}")]
    Validation(String),

    /// Operation not allowed in the current session state
    #[error("{0}")]
    Session(String),
}

/// Coarse error taxonomy used at process boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Security,
    Formula,
    InvalidReference,
    Complexity,
    Lock,
    NotFound,
    Io,
    Session,
}

impl ErrorKind {
    /// Name reported in machine-readable output
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Security => "SecurityError",
            ErrorKind::Formula => "FormulaError",
            ErrorKind::InvalidReference => "InvalidReference",
            ErrorKind::Complexity => "ComplexityError",
            ErrorKind::Lock => "LockError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::Io => "IOError",
            ErrorKind::Session => "SessionError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Core(CoreError::SheetNotFound { .. }) => ErrorKind::NotFound,
            Error::Core(_) | Error::Validation(_) => ErrorKind::Validation,
            Error::Formula(e) => match e {
                FormulaError::Empty | FormulaError::Malformed(_) => ErrorKind::Formula,
                FormulaError::TooComplex { .. } => ErrorKind::Complexity,
                FormulaError::BlockedFunction { .. } | FormulaError::ExternalLink { .. } => {
                    ErrorKind::Security
                }
                FormulaError::UnknownSheet { .. } => ErrorKind::InvalidReference,
            },
            Error::Xlsx(XlsxError::Core(CoreError::SheetNotFound { .. })) => ErrorKind::NotFound,
            Error::Xlsx(_) | Error::Csv(_) | Error::Io(_) | Error::Json(_) => ErrorKind::Io,
            Error::Lock { .. } => ErrorKind::Lock,
            Error::FileNotFound(_) => ErrorKind::NotFound,
            Error::Session(_) => ErrorKind::Session,
        }
    }

    /// Whether a formula was rejected by the security policy
    pub fn is_security_violation(&self) -> bool {
        matches!(self, Error::Formula(e) if e.is_security_violation())
    }

    /// Formula classification carried by a formula rejection
    pub fn classification(&self) -> Option<FormulaClass> {
        match self {
            Error::Formula(e) => e.classification(),
            _ => None,
        }
    }
}
