//! Template cloning

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;
use sheetwarden_core::CellValue;

use crate::atomic::atomic_write_bytes;
use crate::codec::WorkbookCodec;
use crate::error::{Error, Result};
use crate::lock::{LockCoordinator, LockMode};
use crate::session::save_workbook;

/// What a cloned template keeps from its source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Preserve {
    /// Literal cell values
    pub values: bool,
    /// Formula cells
    pub formulas: bool,
    /// Cell styles and number formats
    pub formatting: bool,
}

impl Default for Preserve {
    /// A blank template: structure and formatting only
    fn default() -> Self {
        Self {
            values: false,
            formulas: false,
            formatting: true,
        }
    }
}

impl Preserve {
    pub fn everything() -> Self {
        Self {
            values: true,
            formulas: true,
            formatting: true,
        }
    }

    fn is_everything(&self) -> bool {
        self.values && self.formulas && self.formatting
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneMethod {
    /// Source bytes copied unchanged
    FullCopy,
    /// Workbook read, cleared and rewritten
    SelectiveCopy,
}

/// Outcome of [`clone_template`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloneReport {
    pub method: CloneMethod,
    pub source: PathBuf,
    pub output: PathBuf,
    /// Sheet names; empty for a full copy, which never parses the source
    pub sheets: Vec<String>,
    pub preserved: Preserve,
    pub file_size_bytes: u64,
}

/// Copy `source` to `output`, keeping only what `preserve` asks for
///
/// The source is read without a lock. `output` is written atomically under
/// an exclusive lock.
pub fn clone_template<C: WorkbookCodec + ?Sized>(
    codec: &C,
    locks: &LockCoordinator,
    source: &Path,
    output: &Path,
    preserve: Preserve,
) -> Result<CloneReport> {
    if !source.is_file() {
        return Err(Error::FileNotFound(source.to_path_buf()));
    }

    if preserve.is_everything() {
        let bytes = fs::read(source)?;
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let _guard = locks.acquire(output, LockMode::Exclusive)?;
        let size = atomic_write_bytes(output, &bytes)?;
        info!("Copied {} to {}", source.display(), output.display());
        return Ok(CloneReport {
            method: CloneMethod::FullCopy,
            source: source.to_path_buf(),
            output: output.to_path_buf(),
            sheets: Vec::new(),
            preserved: preserve,
            file_size_bytes: size,
        });
    }

    let mut workbook = codec.read(source)?;
    let mut cleared = 0usize;
    for sheet in workbook.worksheets_mut() {
        sheet.update_cells(|_, cell| {
            let keep = if cell.value.is_formula() {
                preserve.formulas
            } else {
                preserve.values
            };
            if !keep && !cell.value.is_empty() {
                cell.value = CellValue::Empty;
                cleared += 1;
            }
            if !preserve.formatting {
                cell.style = None;
            }
        });
    }
    debug!("Cleared {} cells from {}", cleared, source.display());

    let (size, _lock) = save_workbook(codec, locks, None, &workbook, output)?;
    Ok(CloneReport {
        method: CloneMethod::SelectiveCopy,
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        sheets: workbook.sheet_names().into_iter().map(String::from).collect(),
        preserved: preserve,
        file_size_bytes: size,
    })
}
