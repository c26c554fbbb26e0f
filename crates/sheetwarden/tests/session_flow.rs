//! End-to-end session behavior against real files

use std::fs;
use std::path::Path;
use std::time::Duration;

use pretty_assertions::assert_eq;
use sheetwarden::{
    AccessMode, CellAddress, CellValue, Color, Error, ErrorKind, ExportMode, LockCoordinator,
    LockMode, Result, SessionOptions, TypedValue, ValidationOptions, Workbook, WorkbookCodec,
    WorkbookSession, XlsxCodec,
};

fn options() -> SessionOptions {
    SessionOptions {
        lock_timeout: Duration::from_millis(150),
        lock_poll_interval: Duration::from_millis(10),
        ..SessionOptions::default()
    }
}

fn a(s: &str) -> CellAddress {
    CellAddress::parse(s).unwrap()
}

fn create_model(path: &Path) {
    let mut session = WorkbookSession::new(options());
    session.create_new(&["Assumptions", "Model"]).unwrap();
    session
        .add_assumption(
            "Assumptions",
            "B2",
            &TypedValue::Number(0.05),
            "Long-run growth",
            Some("0.0%"),
        )
        .unwrap();
    session
        .set_cell_value("Model", "A1", &TypedValue::Text("Revenue".into()), Some("header"), None)
        .unwrap();
    session
        .set_cell_value("Model", "B1", &TypedValue::Integer(1200), None, None)
        .unwrap();
    session
        .add_formula(
            "Model",
            "B2",
            "=B1*(1+Assumptions!B2)",
            ValidationOptions::default(),
            None,
        )
        .unwrap();
    let report = session.save_and_close(Some(path)).unwrap();
    assert_eq!(report.path, path);
    assert!(report.bytes_written > 0);
}

/// Reads like XLSX but writes a truncated file and then fails
struct FailingCodec;

impl WorkbookCodec for FailingCodec {
    fn read(&self, path: &Path) -> Result<Workbook> {
        XlsxCodec.read(path)
    }

    fn write(&self, _workbook: &Workbook, path: &Path) -> Result<()> {
        fs::write(path, b"PK\x03\x04 truncated")?;
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )))
    }
}

#[test]
fn test_create_edit_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.xlsx");
    create_model(&path);

    let mut session = WorkbookSession::new(options());
    session.open(&path, AccessMode::ReadWrite).unwrap();
    assert!(!session.is_dirty());
    session
        .set_cell_value("Model", "B1", &TypedValue::Integer(1500), None, None)
        .unwrap();
    assert!(session.is_dirty());
    session.save(None).unwrap();
    assert!(!session.is_dirty());
    session.close();

    session.open(&path, AccessMode::ReadOnly).unwrap();
    let workbook = session.workbook().unwrap();
    assert_eq!(workbook.sheet_names(), vec!["Assumptions", "Model"]);

    let model = workbook.require_sheet("Model").unwrap();
    assert_eq!(model.value(a("B1")), &CellValue::Number(1500.0));
    assert_eq!(model.formula(a("B2")), Some("=B1*(1+Assumptions!B2)"));
    assert!(model.cell(a("A1")).unwrap().style.as_ref().unwrap().bold);

    let assumption = workbook.require_sheet("Assumptions").unwrap().cell(a("B2")).unwrap();
    assert_eq!(assumption.style.as_ref().unwrap().fill, Some(Color::YELLOW));
    assert_eq!(assumption.note.as_ref().unwrap().text, "Long-run growth");

    let info = session.info().unwrap();
    assert_eq!(info.access, AccessMode::ReadOnly);
    assert!(!info.locked);
    assert_eq!(info.sheets[1].used_range.as_deref(), Some("A1:B2"));
    assert_eq!(info.sheets[0].notes, 1);
}

#[test]
fn test_second_writer_times_out_while_first_holds_lock() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.xlsx");
    create_model(&path);

    let mut first = WorkbookSession::new(options());
    first.open(&path, AccessMode::ReadWrite).unwrap();

    let mut second = WorkbookSession::new(options());
    let err = second.open(&path, AccessMode::ReadWrite).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lock);
    assert!(!second.is_open());

    // Readers are not blocked
    second.open(&path, AccessMode::ReadOnly).unwrap();
    second.close();

    // The first writer is unaffected and can still save
    first
        .set_cell_value("Model", "C1", &TypedValue::Integer(1), None, None)
        .unwrap();
    first.save_and_close(None).unwrap();

    second.open(&path, AccessMode::ReadWrite).unwrap();
}

#[test]
fn test_new_workbook_stays_locked_after_first_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("new.xlsx");

    let mut creator = WorkbookSession::new(options());
    creator.create_new(&["S"]).unwrap();
    creator.save(Some(&path)).unwrap();
    assert!(creator.is_open());
    assert!(creator.info().unwrap().locked);

    let mut other = WorkbookSession::new(options());
    let err = other.open(&path, AccessMode::ReadWrite).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lock);

    creator
        .set_cell_value("S", "B1", &TypedValue::Integer(2), None, None)
        .unwrap();
    creator.save(None).unwrap();
    creator.close();

    other.open(&path, AccessMode::ReadWrite).unwrap();
    assert_eq!(
        other.workbook().unwrap().require_sheet("S").unwrap().value(a("B1")),
        &CellValue::Number(2.0)
    );
}

#[test]
fn test_dropping_a_session_releases_its_lock() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.xlsx");
    create_model(&path);

    {
        let mut session = WorkbookSession::new(options());
        session.open(&path, AccessMode::ReadWrite).unwrap();
    }
    let locks = LockCoordinator::new(Duration::from_millis(50), Duration::from_millis(10));
    locks.acquire(&path, LockMode::Exclusive).unwrap();
}

#[test]
fn test_failed_save_leaves_original_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.xlsx");
    create_model(&path);
    let before = fs::read(&path).unwrap();

    let mut session = WorkbookSession::with_codec(FailingCodec, options());
    session.open(&path, AccessMode::ReadWrite).unwrap();
    session
        .set_cell_value("Model", "B1", &TypedValue::Integer(9999), None, None)
        .unwrap();
    let err = session.save(None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(session.is_dirty());
    session.close();

    assert_eq!(fs::read(&path).unwrap(), before);
    let mut leftovers: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    leftovers.sort();
    assert_eq!(leftovers, vec!["model.xlsx", "model.xlsx.lock"]);
}

#[test]
fn test_duplicate_sheets_create_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("new.xlsx");

    let mut session = WorkbookSession::new(options());
    let err = session.create_new(&["Sheet1", "Sheet1"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(!session.is_open());
    assert!(!path.exists());
}

#[test]
fn test_open_missing_and_corrupt_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = WorkbookSession::new(options());

    let err = session
        .open(dir.path().join("absent.xlsx"), AccessMode::ReadWrite)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let corrupt = dir.path().join("corrupt.xlsx");
    fs::write(&corrupt, b"not a zip file").unwrap();
    let err = session.open(&corrupt, AccessMode::ReadWrite).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(!session.is_open());

    // The lock taken for the read was released with the error
    let locks = LockCoordinator::new(Duration::from_millis(50), Duration::from_millis(10));
    locks.acquire(&corrupt, LockMode::Exclusive).unwrap();
}

#[test]
fn test_read_only_session_rejects_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.xlsx");
    create_model(&path);

    let mut session = WorkbookSession::new(options());
    session.open(&path, AccessMode::ReadOnly).unwrap();
    let err = session
        .add_formula("Model", "C1", "=1+1", ValidationOptions::default(), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Session);
    assert_eq!(session.save(None).unwrap_err().kind(), ErrorKind::Session);

    let err = session.open(&path, AccessMode::ReadOnly).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Session);
}

#[test]
fn test_save_as_waits_for_the_target_lock() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.xlsx");
    let copy = dir.path().join("copy.xlsx");
    create_model(&path);

    let mut session = WorkbookSession::new(options());
    session.open(&path, AccessMode::ReadWrite).unwrap();

    let locks = LockCoordinator::new(Duration::from_millis(50), Duration::from_millis(10));
    let held = locks.acquire(&copy, LockMode::Exclusive).unwrap();
    let err = session.save(Some(&copy)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lock);
    assert!(!copy.exists());

    drop(held);
    let report = session.save(Some(&copy)).unwrap();
    assert_eq!(report.path, copy);
    assert!(copy.exists());
}

#[test]
fn test_export_modes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.xlsx");
    create_model(&path);

    let mut session = WorkbookSession::new(options());
    session.open(&path, AccessMode::ReadOnly).unwrap();

    let values: Vec<_> = session
        .export_range("Model", None, ExportMode::Values)
        .unwrap()
        .collect();
    assert_eq!(
        values,
        vec![
            vec![CellValue::text("Revenue"), CellValue::Number(1200.0)],
            vec![CellValue::Empty, CellValue::Empty],
        ]
    );

    let formulas: Vec<_> = session
        .export_range("Model", Some("B2"), ExportMode::Formulas)
        .unwrap()
        .collect();
    assert_eq!(formulas, vec![vec![CellValue::formula("=B1*(1+Assumptions!B2)")]]);

    let err = session
        .export_range("Model", Some("B2:"), ExportMode::Values)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = session
        .export_range("Outputs", None, ExportMode::Values)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
