//! XLSX error types

use thiserror::Error;

pub type XlsxResult<T> = std::result::Result<T, XlsxError>;

/// Why a workbook package could not be read or written
#[derive(Debug, Error)]
pub enum XlsxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a readable ZIP package
    #[error("Not an XLSX package: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Package structure (relationships, content) is inconsistent
    #[error("Invalid workbook package: {0}")]
    InvalidFormat(String),

    #[error("Workbook package has no part '{0}'")]
    MissingPart(String),

    /// A value inside a part could not be interpreted
    #[error("Unreadable workbook content: {0}")]
    Parse(String),

    #[error(transparent)]
    Core(#[from] sheetwarden_core::Error),
}
