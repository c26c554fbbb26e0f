//! # sheetwarden-csv
//!
//! CSV writer for rows exported from a sheetwarden workbook.

mod error;
mod options;
mod writer;

pub use error::{CsvError, CsvResult};
pub use options::{CsvWriteOptions, LineTerminator};
pub use writer::CsvWriter;
