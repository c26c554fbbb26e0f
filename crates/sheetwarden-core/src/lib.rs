//! # sheetwarden-core
//!
//! Core data structures for the sheetwarden workbook-mutation toolkit.
//!
//! This crate provides the fundamental types used throughout sheetwarden:
//! - [`CellAddress`] and [`RangeAddress`] - Strict A1-style addressing
//! - [`SheetNameRules`] - Sheet-name validation and sanitization
//! - [`TypedValue`] and [`CellValue`] - Caller input values and stored cell contents
//! - [`StyleCatalog`] - Named style presets and number-format patterns
//! - [`Workbook`], [`Worksheet`] - The in-memory workbook model
//!
//! ## Example
//!
//! ```rust
//! use sheetwarden_core::{CellAddress, RangeAddress, Workbook, CellValue};
//!
//! let addr = CellAddress::parse("B10").unwrap();
//! assert_eq!((addr.col, addr.row), (2, 10));
//!
//! let range = RangeAddress::parse("B10:A1").unwrap();
//! assert_eq!(range.to_string(), "A1:B10");
//!
//! let mut workbook = Workbook::new();
//! workbook.add_worksheet("Assumptions").unwrap();
//! let sheet = workbook.worksheet_by_name_mut("Assumptions").unwrap();
//! sheet.set_value(addr, CellValue::Number(0.2));
//! ```

pub mod address;
pub mod defined_name;
pub mod error;
pub mod note;
pub mod sheet_name;
pub mod style;
pub mod value;
pub mod workbook;
pub mod worksheet;

// Re-exports for convenience
pub use address::{CellAddress, RangeAddress, RangeCells};
pub use defined_name::{DefinedName, NameScope};
pub use error::{Error, Result};
pub use note::CellNote;
pub use sheet_name::{SheetNameRules, SheetNameViolation};
pub use style::{
    number_format, number_format_named, BorderKind, CellStyle, Color, FormatType, StyleCatalog,
    StylePreset, ASSUMPTION_PRESET, MAX_DECIMALS,
};
pub use value::{CellValue, TypedValue, ValueKind};
pub use workbook::Workbook;
pub use worksheet::{Cell, Worksheet};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
