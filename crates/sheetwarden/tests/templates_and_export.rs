use std::fs;
use std::path::Path;
use std::time::Duration;

use pretty_assertions::assert_eq;
use sheetwarden::{
    clone_template, write_rows, AccessMode, CellAddress, CellValue, CloneMethod, ErrorKind,
    ExportFormat, ExportMode, LockCoordinator, Preserve, SessionOptions, TypedValue,
    ValidationOptions, WorkbookSession, XlsxCodec,
};

fn locks() -> LockCoordinator {
    LockCoordinator::new(Duration::from_millis(100), Duration::from_millis(10))
}

fn a(s: &str) -> CellAddress {
    CellAddress::parse(s).unwrap()
}

fn create_template(path: &Path) {
    let mut session = WorkbookSession::new(SessionOptions::default());
    session.create_new(&["Inputs"]).unwrap();
    session
        .set_cell_value("Inputs", "A1", &TypedValue::Text("Units".into()), Some("header"), None)
        .unwrap();
    session
        .set_cell_value("Inputs", "B1", &TypedValue::Integer(40), Some("input"), None)
        .unwrap();
    session
        .add_formula("Inputs", "C1", "=B1*2", ValidationOptions::default(), None)
        .unwrap();
    session.save_and_close(Some(path)).unwrap();
}

fn reopen(path: &Path) -> sheetwarden::Workbook {
    let mut session = WorkbookSession::new(SessionOptions::default());
    session.open(path, AccessMode::ReadOnly).unwrap();
    session.workbook().unwrap().clone()
}

#[test]
fn test_full_copy_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("template.xlsx");
    let output = dir.path().join("out/copy.xlsx");
    create_template(&source);

    let report =
        clone_template(&XlsxCodec, &locks(), &source, &output, Preserve::everything()).unwrap();

    assert_eq!(report.method, CloneMethod::FullCopy);
    assert_eq!(fs::read(&output).unwrap(), fs::read(&source).unwrap());
    assert_eq!(report.file_size_bytes, fs::metadata(&output).unwrap().len());
}

#[test]
fn test_blank_template_keeps_formatting_only() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("template.xlsx");
    let output = dir.path().join("blank.xlsx");
    create_template(&source);

    let report = clone_template(&XlsxCodec, &locks(), &source, &output, Preserve::default()).unwrap();
    assert_eq!(report.method, CloneMethod::SelectiveCopy);
    assert_eq!(report.sheets, vec!["Inputs"]);

    let workbook = reopen(&output);
    let sheet = workbook.require_sheet("Inputs").unwrap();
    assert_eq!(sheet.cell_count(), 0);
    // Styled cells survive as empty formatted cells
    assert!(sheet.cell(a("A1")).unwrap().style.as_ref().unwrap().bold);
    assert!(sheet.cell(a("B1")).is_some());
    assert_eq!(sheet.cell(a("C1")), None);
}

#[test]
fn test_keep_formulas_drop_values_and_styles() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("template.xlsx");
    let output = dir.path().join("formulas.xlsx");
    create_template(&source);

    let preserve = Preserve {
        values: false,
        formulas: true,
        formatting: false,
    };
    clone_template(&XlsxCodec, &locks(), &source, &output, preserve).unwrap();

    let workbook = reopen(&output);
    let sheet = workbook.require_sheet("Inputs").unwrap();
    assert_eq!(sheet.formula(a("C1")), Some("=B1*2"));
    assert_eq!(sheet.cell(a("A1")), None);
    assert_eq!(sheet.cell(a("B1")), None);
}

#[test]
fn test_missing_source() {
    let dir = tempfile::tempdir().unwrap();
    let err = clone_template(
        &XlsxCodec,
        &locks(),
        &dir.path().join("nope.xlsx"),
        &dir.path().join("out.xlsx"),
        Preserve::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_export_sheet_to_csv_and_json() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("template.xlsx");
    create_template(&source);

    let mut session = WorkbookSession::new(SessionOptions::default());
    session.open(&source, AccessMode::ReadOnly).unwrap();

    let csv_path = dir.path().join("inputs.csv");
    let rows = session.export_range("Inputs", None, ExportMode::Formulas).unwrap();
    let report = write_rows(rows, ExportFormat::Csv, &csv_path).unwrap();
    assert_eq!(report.rows_exported, 1);
    assert_eq!(fs::read_to_string(&csv_path).unwrap(), "Units,40,=B1*2\n");

    let json_path = dir.path().join("inputs.json");
    let rows = session.export_range("Inputs", Some("A1:C1"), ExportMode::Values).unwrap();
    write_rows(rows, ExportFormat::Json, &json_path).unwrap();
    let parsed: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(parsed, serde_json::json!([["Units", 40.0, null]]));

    let rows = session.export_range("Inputs", Some("B1:C1"), ExportMode::Formulas).unwrap();
    let values: Vec<_> = rows.collect();
    assert_eq!(
        values,
        vec![vec![CellValue::Number(40.0), CellValue::formula("=B1*2")]]
    );
}
