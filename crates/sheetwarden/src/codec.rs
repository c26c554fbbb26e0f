//! Workbook file formats

use std::path::Path;

use sheetwarden_core::Workbook;
use sheetwarden_xlsx::{XlsxReader, XlsxWriter};

use crate::error::Result;

/// Reads and writes the workbook model to storage
///
/// Sessions only ever call `write` with a temporary path next to the real
/// destination, so implementations need not be atomic themselves.
pub trait WorkbookCodec {
    fn read(&self, path: &Path) -> Result<Workbook>;

    fn write(&self, workbook: &Workbook, path: &Path) -> Result<()>;
}

/// Office Open XML (`.xlsx`)
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxCodec;

impl WorkbookCodec for XlsxCodec {
    fn read(&self, path: &Path) -> Result<Workbook> {
        Ok(XlsxReader::read_file(path)?)
    }

    fn write(&self, workbook: &Workbook, path: &Path) -> Result<()> {
        Ok(XlsxWriter::write_file(workbook, path)?)
    }
}
