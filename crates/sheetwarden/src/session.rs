//! Workbook sessions
//!
//! A [`WorkbookSession`] owns at most one open workbook together with the
//! lock guarding it. Every mutating call validates its whole input before
//! the in-memory model changes, and nothing reaches disk until
//! [`WorkbookSession::save`] replaces the file atomically.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;
use sheetwarden_core::{
    CellAddress, CellNote, CellStyle, CellValue, RangeAddress, SheetNameRules, StyleCatalog,
    TypedValue, Workbook, ASSUMPTION_PRESET,
};
use sheetwarden_formula::{FormulaValidator, ValidatedFormula, ValidationOptions};

use crate::atomic::atomic_write_with_path;
use crate::codec::{WorkbookCodec, XlsxCodec};
use crate::error::{Error, Result};
use crate::export::{ExportMode, ExportRows};
use crate::lock::{LockCoordinator, LockHandle, LockMode};
use crate::options::SessionOptions;
use crate::report::{CreateReport, SaveReport, SessionInfo, SheetInfo};

/// How a workbook is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Inspection and export only. No lock is taken unless
    /// [`SessionOptions::shared_read_lock`] asks for one.
    ReadOnly,
    /// Mutations allowed; holds an exclusive lock while open
    ReadWrite,
}

#[derive(Debug)]
struct OpenWorkbook {
    workbook: Workbook,
    path: Option<PathBuf>,
    access: AccessMode,
    lock: Option<LockHandle>,
    dirty: bool,
}

/// A locked, validated editing session over one workbook file
///
/// ```no_run
/// use sheetwarden::{AccessMode, SessionOptions, TypedValue, WorkbookSession};
///
/// # fn main() -> sheetwarden::Result<()> {
/// let mut session = WorkbookSession::new(SessionOptions::default());
/// session.open("model.xlsx", AccessMode::ReadWrite)?;
/// session.add_assumption(
///     "Assumptions",
///     "B4",
///     &TypedValue::Number(0.2),
///     "Annual growth rate",
///     Some("0.0%"),
/// )?;
/// session.save_and_close(None)?;
/// # Ok(())
/// # }
/// ```
pub struct WorkbookSession<C: WorkbookCodec = XlsxCodec> {
    codec: C,
    options: SessionOptions,
    locks: LockCoordinator,
    catalog: StyleCatalog,
    validator: FormulaValidator,
    current: Option<OpenWorkbook>,
}

impl WorkbookSession<XlsxCodec> {
    /// Session reading and writing `.xlsx` files
    pub fn new(options: SessionOptions) -> Self {
        Self::with_codec(XlsxCodec, options)
    }
}

impl Default for WorkbookSession<XlsxCodec> {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

impl<C: WorkbookCodec> WorkbookSession<C> {
    pub fn with_codec(codec: C, options: SessionOptions) -> Self {
        Self {
            codec,
            locks: LockCoordinator::from_options(&options),
            validator: FormulaValidator::new(options.validator),
            catalog: StyleCatalog::new(),
            options,
            current: None,
        }
    }

    /// Replace the style catalog used by `style` arguments
    pub fn with_catalog(mut self, catalog: StyleCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn catalog(&self) -> &StyleCatalog {
        &self.catalog
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Whether the open workbook has changes not yet saved
    pub fn is_dirty(&self) -> bool {
        self.current.as_ref().is_some_and(|o| o.dirty)
    }

    pub fn path(&self) -> Option<&Path> {
        self.current.as_ref().and_then(|o| o.path.as_deref())
    }

    pub fn workbook(&self) -> Result<&Workbook> {
        Ok(&opened(&self.current)?.workbook)
    }

    // === Lifecycle ===

    /// Open the workbook at `path`
    ///
    /// `ReadWrite` takes the exclusive lock before the file is read. If the
    /// read fails the lock is released before the error is returned.
    pub fn open<P: AsRef<Path>>(&mut self, path: P, access: AccessMode) -> Result<()> {
        let path = path.as_ref();
        if self.current.is_some() {
            return Err(Error::Session(
                "A workbook is already open in this session; close it first".into(),
            ));
        }
        if !path.is_file() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let lock = match access {
            AccessMode::ReadWrite => Some(self.locks.acquire(path, LockMode::Exclusive)?),
            AccessMode::ReadOnly if self.options.shared_read_lock => {
                Some(self.locks.acquire(path, LockMode::Shared)?)
            }
            AccessMode::ReadOnly => None,
        };

        let workbook = self.codec.read(path)?;
        debug!(
            "Opened {} ({:?}, {} sheets)",
            path.display(),
            access,
            workbook.sheet_count()
        );

        self.current = Some(OpenWorkbook {
            workbook,
            path: Some(path.to_path_buf()),
            access,
            lock,
            dirty: false,
        });
        Ok(())
    }

    /// Start a new in-memory workbook with the given sheets
    ///
    /// Invalid names are sanitized and reported as warnings. Nothing is
    /// written until [`Self::save`] is called with a target path.
    pub fn create_new<S: AsRef<str>>(&mut self, sheet_names: &[S]) -> Result<CreateReport> {
        if self.current.is_some() {
            return Err(Error::Session(
                "A workbook is already open in this session; close it first".into(),
            ));
        }
        let report = plan_sheets(sheet_names, &self.options.sheet_names)?;

        let mut workbook = Workbook::with_rules(self.options.sheet_names.clone());
        for name in &report.sheets {
            workbook.add_worksheet(name)?;
        }
        for warning in &report.warnings {
            warn!("{}", warning);
        }

        self.current = Some(OpenWorkbook {
            workbook,
            path: None,
            access: AccessMode::ReadWrite,
            lock: None,
            dirty: true,
        });
        Ok(report)
    }

    /// Write the workbook atomically to `target`, or back to its own path
    ///
    /// A target other than the locked path is locked for the duration of
    /// the write. The first save of a new workbook keeps that lock until the
    /// session closes. On failure the destination is unchanged and the
    /// session stays dirty.
    pub fn save(&mut self, target: Option<&Path>) -> Result<SaveReport> {
        let open = opened_mut(&mut self.current)?;
        if open.access == AccessMode::ReadOnly {
            return Err(Error::Session("Cannot save a read-only session".into()));
        }
        let dest = target
            .map(Path::to_path_buf)
            .or_else(|| open.path.clone())
            .ok_or_else(|| {
                Error::Validation("Workbook has no path; give an explicit save target".into())
            })?;

        let (bytes, guard) = save_workbook(
            &self.codec,
            &self.locks,
            open.lock.as_ref(),
            &open.workbook,
            &dest,
        )?;

        open.dirty = false;
        if open.path.is_none() {
            // A new workbook now has a file; keep it locked while the session is open
            open.path = Some(dest.clone());
            if open.lock.is_none() {
                open.lock = guard;
            }
        }
        Ok(SaveReport {
            path: dest,
            bytes_written: bytes,
        })
    }

    /// Save, then close regardless of the outcome
    pub fn save_and_close(&mut self, target: Option<&Path>) -> Result<SaveReport> {
        let result = self.save(target);
        self.close();
        result
    }

    /// Drop the open workbook and release its lock. Unsaved changes are
    /// discarded. Closing a closed session does nothing.
    pub fn close(&mut self) {
        if let Some(mut open) = self.current.take() {
            let name = open
                .path
                .as_deref()
                .map_or_else(|| "new workbook".to_string(), |p| p.display().to_string());
            if open.dirty {
                warn!("Discarding unsaved changes to {}", name);
            }
            if let Some(lock) = open.lock.as_mut() {
                lock.release();
            }
            debug!("Closed {}", name);
        }
    }

    // === Mutations ===

    /// Write a value, optionally applying a catalog style and number format
    ///
    /// The style replaces any existing cell style; the number format is
    /// layered over whichever style ends up on the cell. Dates get a date
    /// format when neither supplies one.
    pub fn set_cell_value(
        &mut self,
        sheet: &str,
        cell: &str,
        value: &TypedValue,
        style: Option<&str>,
        number_format: Option<&str>,
    ) -> Result<()> {
        let open = writable(&mut self.current)?;
        let addr = CellAddress::parse(cell)?;
        let preset = resolve_preset(&self.catalog, style)?;
        let number_format = check_number_format(number_format)?;
        let stored = value.to_cell_value()?;

        let existing = open.workbook.require_sheet(sheet)?.cell(addr);
        let current_style = existing.and_then(|c| c.style.clone());
        let mut new_style = preset.or_else(|| current_style.clone());
        let has_format = new_style.as_ref().is_some_and(|s| s.number_format.is_some());
        let format = match number_format {
            Some(f) => Some(f),
            None if !has_format => value.default_number_format(),
            None => None,
        };
        if let Some(format) = format {
            new_style = Some(new_style.unwrap_or_default().number_format(format));
        }

        let worksheet = open.workbook.require_sheet_mut(sheet)?;
        worksheet.set_value(addr, stored);
        if new_style != current_style {
            worksheet.set_style(addr, new_style);
        }
        open.dirty = true;
        debug!("Set {}!{} to {} ({})", sheet, addr, value, value.kind_name());
        Ok(())
    }

    /// Validate a formula against this workbook's sheets, then write it
    ///
    /// Rejections are returned unchanged and leave the workbook untouched.
    pub fn add_formula(
        &mut self,
        sheet: &str,
        cell: &str,
        formula: &str,
        options: ValidationOptions,
        style: Option<&str>,
    ) -> Result<ValidatedFormula> {
        let open = writable(&mut self.current)?;
        let addr = CellAddress::parse(cell)?;
        let preset = resolve_preset(&self.catalog, style)?;
        open.workbook.require_sheet(sheet)?;

        let known = open.workbook.sheet_names();
        let validated = self.validator.validate(formula, &known, options)?;
        for overridden in &validated.overrides {
            warn!(
                "Writing {} to {}!{} with external access allowed: {}",
                validated.text, sheet, addr, overridden
            );
        }

        let worksheet = open.workbook.require_sheet_mut(sheet)?;
        worksheet.set_value(addr, CellValue::formula(validated.text.clone()));
        if preset.is_some() {
            worksheet.set_style(addr, preset);
        }
        open.dirty = true;
        debug!("Set {}!{} to {} ({})", sheet, addr, validated.text, validated.class);
        Ok(validated)
    }

    /// Write a model driver: the value with the assumption style, plus the
    /// description as a note on the cell
    pub fn add_assumption(
        &mut self,
        sheet: &str,
        cell: &str,
        value: &TypedValue,
        description: &str,
        number_format: Option<&str>,
    ) -> Result<()> {
        if description.trim().is_empty() {
            return Err(Error::Validation(
                "Assumption description must not be empty".into(),
            ));
        }
        self.set_cell_value(sheet, cell, value, Some(ASSUMPTION_PRESET), number_format)?;

        let note = CellNote::new(self.options.note_author.clone(), description);
        let open = writable(&mut self.current)?;
        let addr = CellAddress::parse(cell)?;
        open.workbook.require_sheet_mut(sheet)?.set_note(addr, Some(note));
        Ok(())
    }

    // === Inspection ===

    /// Summary of the open workbook. Needs no lock.
    pub fn info(&self) -> Result<SessionInfo> {
        let open = opened(&self.current)?;
        let workbook = &open.workbook;
        Ok(SessionInfo {
            path: open.path.clone(),
            access: open.access,
            dirty: open.dirty,
            locked: open.lock.as_ref().is_some_and(LockHandle::is_held),
            active_sheet: workbook
                .worksheet(workbook.active_sheet())
                .map(|s| s.name().to_string()),
            sheets: workbook
                .worksheets()
                .map(|s| SheetInfo {
                    name: s.name().to_string(),
                    used_range: s.used_range().map(|r| r.to_string()),
                    cells: s.cell_count(),
                    formulas: s.formula_count(),
                    notes: s.note_count(),
                })
                .collect(),
        })
    }

    /// Rows of `range` (or the used range) of `sheet`, produced lazily
    pub fn export_range(
        &self,
        sheet: &str,
        range: Option<&str>,
        mode: ExportMode,
    ) -> Result<ExportRows<'_>> {
        let open = opened(&self.current)?;
        let range = range.map(RangeAddress::parse).transpose()?;
        let worksheet = open.workbook.require_sheet(sheet)?;
        Ok(ExportRows::new(worksheet, range, mode))
    }
}

impl<C: WorkbookCodec> Drop for WorkbookSession<C> {
    fn drop(&mut self) {
        self.close();
    }
}

fn opened(current: &Option<OpenWorkbook>) -> Result<&OpenWorkbook> {
    current
        .as_ref()
        .ok_or_else(|| Error::Session("No workbook is open".into()))
}

fn opened_mut(current: &mut Option<OpenWorkbook>) -> Result<&mut OpenWorkbook> {
    current
        .as_mut()
        .ok_or_else(|| Error::Session("No workbook is open".into()))
}

fn writable(current: &mut Option<OpenWorkbook>) -> Result<&mut OpenWorkbook> {
    let open = opened_mut(current)?;
    if open.access == AccessMode::ReadOnly {
        return Err(Error::Session("Workbook is open read-only".into()));
    }
    Ok(open)
}

fn resolve_preset(catalog: &StyleCatalog, style: Option<&str>) -> Result<Option<CellStyle>> {
    Ok(style.map(|name| catalog.style(name)).transpose()?)
}

fn check_number_format(format: Option<&str>) -> Result<Option<&str>> {
    match format {
        Some(f) if f.trim().is_empty() => Err(Error::Validation(
            "Number format must not be empty".into(),
        )),
        other => Ok(other),
    }
}

/// Final sheet names for a new workbook
///
/// Valid names are kept as given; invalid ones are sanitized against the
/// names accepted so far, each producing a warning. Fails when the list is
/// empty or two final names are equal ignoring case.
///
/// ```
/// use sheetwarden::{plan_sheets, SheetNameRules};
///
/// let report = plan_sheets(&["Inputs", "P&L: 2024"], &SheetNameRules::default()).unwrap();
/// assert_eq!(report.sheets, vec!["Inputs", "P&L 2024"]);
/// assert_eq!(report.warnings.len(), 1);
///
/// assert!(plan_sheets(&["Sheet1", "sheet1"], &SheetNameRules::default()).is_err());
/// ```
pub fn plan_sheets<S: AsRef<str>>(names: &[S], rules: &SheetNameRules) -> Result<CreateReport> {
    if names.is_empty() {
        return Err(Error::Validation("At least one sheet name required".into()));
    }

    let mut report = CreateReport::default();
    for name in names.iter().map(AsRef::as_ref) {
        let final_name = if rules.validate(name).is_ok() {
            name.to_string()
        } else {
            let sanitized = rules.sanitize(name, &report.sheets);
            report
                .warnings
                .push(format!("Sheet name '{}' invalid, using '{}'", name, sanitized));
            sanitized
        };

        if SheetNameRules::collides(&final_name, report.sheets.iter().map(String::as_str)) {
            return Err(Error::Validation(format!(
                "Duplicate sheet names detected: '{}'",
                final_name
            )));
        }
        report.sheets.push(final_name);
    }
    Ok(report)
}

/// Write `workbook` to `dest` atomically under an exclusive lock
///
/// `held` is a lock the caller already owns; it is reused when it guards
/// `dest`. Otherwise `dest` is locked for the write and the new handle is
/// returned with the byte count, so the caller can keep holding it.
pub(crate) fn save_workbook<C: WorkbookCodec + ?Sized>(
    codec: &C,
    locks: &LockCoordinator,
    held: Option<&LockHandle>,
    workbook: &Workbook,
    dest: &Path,
) -> Result<(u64, Option<LockHandle>)> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let covered = held.is_some_and(|l| l.is_held() && same_path(l.path(), dest));
    let guard = if covered {
        None
    } else {
        Some(locks.acquire(dest, LockMode::Exclusive)?)
    };

    let bytes = atomic_write_with_path(dest, |tmp| codec.write(workbook, tmp))?;
    info!("Saved {} ({} bytes)", dest.display(), bytes);
    Ok((bytes, guard))
}

/// Compare paths by their canonical parent directory and file name
fn same_path(a: &Path, b: &Path) -> bool {
    fn key(p: &Path) -> PathBuf {
        let parent = p.parent().filter(|d| !d.as_os_str().is_empty()).unwrap_or(Path::new("."));
        match (fs::canonicalize(parent), p.file_name()) {
            (Ok(dir), Some(name)) => dir.join(name),
            _ => p.to_path_buf(),
        }
    }
    a == b || key(a) == key(b)
}
