//! # sheetwarden
//!
//! Safe mutation of spreadsheet workbooks shared between processes.
//!
//! ## Features
//!
//! - Exclusive advisory locks on a `<workbook>.lock` sidecar, with a bounded wait
//! - Atomic saves: write to a temporary file, sync, rename into place
//! - Formula vetting before anything is written (blocked functions,
//!   external links, unknown sheets, complexity bounds)
//! - Named style presets, notes on assumption cells
//! - Range export to CSV or JSON, template cloning
//!
//! ## Example
//!
//! ```rust
//! use sheetwarden::prelude::*;
//!
//! # fn main() -> sheetwarden::Result<()> {
//! let dir = tempfile::tempdir()?;
//! let path = dir.path().join("model.xlsx");
//!
//! let mut session = WorkbookSession::new(SessionOptions::default());
//! session.create_new(&["Assumptions", "Model"])?;
//! session.add_assumption("Assumptions", "B2", &TypedValue::Number(0.2), "Growth", None)?;
//! session.add_formula("Model", "B2", "=Assumptions!B2*100", ValidationOptions::default(), None)?;
//! session.save_and_close(Some(path.as_path()))?;
//!
//! session.open(&path, AccessMode::ReadOnly)?;
//! let rows: Vec<_> = session.export_range("Model", None, ExportMode::Formulas)?.collect();
//! assert_eq!(rows[0][0].formula_text(), Some("=Assumptions!B2*100"));
//! # Ok(())
//! # }
//! ```

pub mod atomic;
pub mod codec;
pub mod error;
pub mod export;
pub mod lock;
pub mod options;
pub mod prelude;
pub mod report;
pub mod session;
pub mod template;

pub use codec::{WorkbookCodec, XlsxCodec};
pub use error::{Error, ErrorKind, Result};
pub use export::{cell_to_json, write_rows, ExportFormat, ExportMode, ExportReport, ExportRows};
pub use lock::{LockCoordinator, LockHandle, LockMode};
pub use options::{
    SessionOptions, DEFAULT_LOCK_POLL_INTERVAL, DEFAULT_LOCK_TIMEOUT, DEFAULT_NOTE_AUTHOR,
};
pub use report::{CreateReport, SaveReport, SessionInfo, SheetInfo};
pub use session::{plan_sheets, AccessMode, WorkbookSession};
pub use template::{clone_template, CloneMethod, CloneReport, Preserve};

// Re-export core types
pub use sheetwarden_core::Error as CoreError;
pub use sheetwarden_core::{
    number_format, number_format_named, BorderKind, CellAddress, CellNote, CellStyle, CellValue,
    Color, FormatType, RangeAddress, SheetNameRules, StyleCatalog, StylePreset, TypedValue,
    ValueKind, Workbook, Worksheet, ASSUMPTION_PRESET, MAX_DECIMALS,
};

// Re-export formula validation types
pub use sheetwarden_formula::{
    FormulaClass, FormulaError, FormulaValidator, FunctionCategory, LinkKind, ValidatedFormula,
    ValidationOptions, ValidatorLimits,
};
