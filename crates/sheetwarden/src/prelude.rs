//! Prelude module - common imports for sheetwarden users
//!
//! ```rust
//! use sheetwarden::prelude::*;
//! ```

pub use crate::{
    AccessMode,
    CellAddress,
    CellValue,
    // Errors
    Error,
    ErrorKind,
    // Export
    ExportFormat,
    ExportMode,
    RangeAddress,
    Result,
    // Sessions
    SessionOptions,
    StyleCatalog,
    TypedValue,
    ValidationOptions,
    ValueKind,
    WorkbookSession,
};
