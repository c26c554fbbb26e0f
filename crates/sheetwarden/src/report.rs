//! Serializable outcomes of session operations

use std::path::PathBuf;

use serde::Serialize;

use crate::session::AccessMode;

/// A completed save
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub path: PathBuf,
    pub bytes_written: u64,
}

/// Sheet list for a new workbook
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CreateReport {
    /// Final names, in order
    pub sheets: Vec<String>,
    /// One entry per sanitized name
    pub warnings: Vec<String>,
}

/// Summary of one worksheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetInfo {
    pub name: String,
    /// A1 range enclosing every stored cell
    pub used_range: Option<String>,
    pub cells: usize,
    pub formulas: usize,
    pub notes: usize,
}

/// Read-only summary of an open session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub path: Option<PathBuf>,
    pub access: AccessMode,
    pub dirty: bool,
    pub locked: bool,
    pub active_sheet: Option<String>,
    pub sheets: Vec<SheetInfo>,
}

impl SessionInfo {
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}
