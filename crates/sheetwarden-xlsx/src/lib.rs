//! # sheetwarden-xlsx
//!
//! XLSX (Office Open XML) reader and writer for sheetwarden.
//!
//! Only what the sheetwarden model represents survives a round trip:
//! values, formulas with their cached results, the [`CellStyle`] subset,
//! cell notes and defined names. Shared formulas are expanded into one
//! formula per cell. Other parts (charts, column widths, ...) are dropped
//! on read.
//!
//! [`CellStyle`]: sheetwarden_core::CellStyle

pub mod error;
pub mod reader;
pub mod writer;

mod escape;
mod shared_formula;
mod styles;

pub use error::{XlsxError, XlsxResult};
pub use reader::XlsxReader;
pub use writer::XlsxWriter;
