//! Write a workbook with the full model subset, read it back, compare

use pretty_assertions::assert_eq;
use sheetwarden_core::{
    BorderKind, CellAddress, CellNote, CellStyle, CellValue, Color, DefinedName, StyleCatalog,
    Workbook,
};
use sheetwarden_xlsx::{XlsxReader, XlsxWriter};
use std::io::Cursor;

fn addr(s: &str) -> CellAddress {
    CellAddress::parse(s).unwrap()
}

fn sample_workbook() -> Workbook {
    let mut workbook = Workbook::new();
    let inputs = workbook.add_worksheet("Inputs").unwrap();
    let model = workbook.add_worksheet("P&L <2024>").unwrap();

    let catalog = StyleCatalog::new();
    let sheet = workbook.worksheet_mut(inputs).unwrap();
    sheet.set_value(addr("A1"), CellValue::text("Growth rate"));
    sheet.set_style(addr("A1"), Some(catalog.style("header").unwrap()));
    sheet.set_value(addr("B1"), CellValue::Number(0.05));
    sheet.set_style(
        addr("B1"),
        Some(catalog.style("assumption").unwrap().number_format("0.00%")),
    );
    sheet.set_note(
        addr("B1"),
        Some(CellNote::new("sheetwarden", "Long-run growth & inflation")),
    );
    sheet.set_value(addr("C1"), CellValue::Boolean(true));
    sheet.set_value(addr("D1"), CellValue::text("  spaced\ttext "));

    let sheet = workbook.worksheet_mut(model).unwrap();
    sheet.set_value(addr("A1"), CellValue::Number(1200.0));
    sheet.set_value(
        addr("A2"),
        CellValue::Formula {
            text: "=A1*(1+Inputs!B1)".into(),
            cached_value: Some(Box::new(CellValue::Number(1260.0))),
        },
    );
    sheet.set_value(addr("A3"), CellValue::formula("=IF(A2>1000,\"big\",\"small\")"));
    sheet.set_value(addr("B3"), CellValue::Error("#REF!".into()));
    sheet.set_style(
        addr("C5"),
        Some(
            CellStyle::new()
                .fill(Color::rgb(0x12, 0x34, 0x56))
                .border(BorderKind::Thick)
                .number_format("_($* #,##0.00_);_($* (#,##0.00);_($* \"-\"??_);_(@_)"),
        ),
    );
    sheet.set_note(addr("Z100"), Some(CellNote::text_only("orphan note")));

    workbook
        .define_name(DefinedName::new("Growth", "Inputs!$B$1"))
        .unwrap();
    let mut local = DefinedName::new("Base", "'P&L <2024>'!$A$1").local_to(model);
    local.hidden = true;
    workbook.define_name(local).unwrap();

    workbook.set_active_sheet(model);
    workbook
}

#[test]
fn test_round_trip_preserves_model() {
    let original = sample_workbook();

    let mut buf = Vec::new();
    XlsxWriter::write(&original, Cursor::new(&mut buf)).unwrap();
    let restored = XlsxReader::read(Cursor::new(buf)).unwrap();

    assert_eq!(restored.sheet_names(), original.sheet_names());
    assert_eq!(restored.active_sheet(), 1);
    assert_eq!(restored.defined_names(), original.defined_names());

    for (before, after) in original.worksheets().zip(restored.worksheets()) {
        let before: Vec<_> = before.cells().collect();
        let after: Vec<_> = after.cells().collect();
        assert_eq!(after, before);
    }
}

#[test]
fn test_round_trip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.xlsx");

    let original = sample_workbook();
    XlsxWriter::write_file(&original, &path).unwrap();
    let restored = XlsxReader::read_file(&path).unwrap();

    let inputs = restored.require_sheet("inputs").unwrap();
    let cell = inputs.cell(addr("B1")).unwrap();
    assert_eq!(cell.value, CellValue::Number(0.05));
    let style = cell.style.as_ref().unwrap();
    assert_eq!(style.fill, Some(Color::YELLOW));
    assert!(!style.locked);
    assert_eq!(style.number_format.as_deref(), Some("0.00%"));
    assert_eq!(
        cell.note.as_ref().map(|n| n.text.as_str()),
        Some("Long-run growth & inflation")
    );
}

#[test]
fn test_written_package_parts() {
    let mut buf = Vec::new();
    XlsxWriter::write(&sample_workbook(), Cursor::new(&mut buf)).unwrap();

    let archive = zip::ZipArchive::new(Cursor::new(buf)).unwrap();
    let names: Vec<&str> = archive.file_names().collect();
    for part in [
        "[Content_Types].xml",
        "_rels/.rels",
        "xl/workbook.xml",
        "xl/_rels/workbook.xml.rels",
        "xl/styles.xml",
        "xl/worksheets/sheet1.xml",
        "xl/worksheets/sheet2.xml",
        "xl/worksheets/_rels/sheet1.xml.rels",
        "xl/comments1.xml",
        "xl/drawings/vmlDrawing1.vml",
    ] {
        assert!(names.contains(&part), "missing part {}", part);
    }
}
