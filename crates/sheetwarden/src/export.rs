//! Range export: lazy row iteration and CSV/JSON serialization

use std::fmt;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{json, Value};
use sheetwarden_core::{CellValue, RangeAddress, Worksheet};
use sheetwarden_csv::{CsvWriteOptions, CsvWriter};

use crate::atomic::atomic_write;
use crate::error::{Error, Result};

/// What an exported formula cell contributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportMode {
    /// Cached results; formulas without one export as empty
    #[default]
    Values,
    /// Formula text where present, values elsewhere
    Formulas,
}

/// Serialization of exported rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// Pick a format from the file extension, ignoring case
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        ext.parse().ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(Error::Validation(format!(
                "Unknown export format '{}' (expected csv or json)",
                s
            ))),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rows of a worksheet range, produced one at a time in row order
///
/// Every row has one entry per column of the range, `Empty` where nothing
/// is stored.
#[derive(Debug, Clone)]
pub struct ExportRows<'a> {
    sheet: &'a Worksheet,
    range: Option<RangeAddress>,
    next_row: u32,
    mode: ExportMode,
}

impl<'a> ExportRows<'a> {
    /// Rows of `range`, or of the used range when `None`
    pub fn new(sheet: &'a Worksheet, range: Option<RangeAddress>, mode: ExportMode) -> Self {
        let range = range.or_else(|| sheet.used_range());
        Self {
            sheet,
            next_row: range.map_or(0, |r| r.start.row),
            range,
            mode,
        }
    }

    /// The range being walked; `None` for an empty sheet
    pub fn range(&self) -> Option<RangeAddress> {
        self.range
    }

    fn exported(&self, value: &CellValue) -> CellValue {
        match self.mode {
            ExportMode::Formulas if value.is_formula() => value.clone(),
            _ => value.effective_value().clone(),
        }
    }
}

impl Iterator for ExportRows<'_> {
    type Item = Vec<CellValue>;

    fn next(&mut self) -> Option<Self::Item> {
        let range = self.range?;
        if self.next_row > range.end.row {
            return None;
        }
        let row = self.next_row;
        self.next_row += 1;

        let first_col = range.start.col;
        let mut values = vec![CellValue::Empty; usize::from(range.col_count())];
        for (addr, cell) in self.sheet.row_cells(row, first_col..=range.end.col) {
            values[usize::from(addr.col - first_col)] = self.exported(&cell.value);
        }
        Some(values)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match self.range {
            Some(r) if self.next_row <= r.end.row => (r.end.row - self.next_row + 1) as usize,
            _ => 0,
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ExportRows<'_> {}

/// Outcome of writing an export file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportReport {
    pub rows_exported: usize,
    pub file_size_bytes: u64,
    pub format: ExportFormat,
}

/// JSON form of one exported cell
pub fn cell_to_json(value: &CellValue) -> Value {
    match value {
        CellValue::Empty => Value::Null,
        CellValue::Text(s) | CellValue::Error(s) => Value::String(s.clone()),
        CellValue::Number(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
        CellValue::Boolean(b) => Value::Bool(*b),
        CellValue::Formula { text, .. } => json!({ "formula": text, "value": null }),
    }
}

/// Write rows to `dest` atomically in the given format
pub fn write_rows<I>(rows: I, format: ExportFormat, dest: &Path) -> Result<ExportReport>
where
    I: IntoIterator<Item = Vec<CellValue>>,
{
    let mut count = 0;
    let size = atomic_write(dest, |file| {
        count = match format {
            ExportFormat::Csv => CsvWriter::write(rows, &mut *file, &CsvWriteOptions::default())?,
            ExportFormat::Json => write_json(rows, BufWriter::new(file))?,
        };
        Ok(())
    })?;

    Ok(ExportReport {
        rows_exported: count,
        file_size_bytes: size,
        format,
    })
}

/// Stream rows as a JSON array of arrays
fn write_json<I, W>(rows: I, mut writer: W) -> Result<usize>
where
    I: IntoIterator<Item = Vec<CellValue>>,
    W: Write,
{
    let mut count = 0;
    writer.write_all(b"[")?;
    for row in rows {
        if count > 0 {
            writer.write_all(b",")?;
        }
        let cells: Vec<Value> = row.iter().map(cell_to_json).collect();
        serde_json::to_writer(&mut writer, &cells)?;
        count += 1;
    }
    writer.write_all(b"]\n")?;
    writer.flush()?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetwarden_core::CellAddress;

    fn a(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    fn sheet() -> Worksheet {
        let mut sheet = Worksheet::new("Model");
        sheet.set_value(a("B2"), CellValue::text("Revenue"));
        sheet.set_value(a("C2"), CellValue::Number(100.0));
        sheet.set_value(
            a("C3"),
            CellValue::Formula {
                text: "=C2*2".into(),
                cached_value: Some(Box::new(CellValue::Number(200.0))),
            },
        );
        sheet.set_value(a("D4"), CellValue::formula("=C3+1"));
        sheet
    }

    #[test]
    fn test_used_range_rows_in_values_mode() {
        let sheet = sheet();
        let rows: Vec<_> = ExportRows::new(&sheet, None, ExportMode::Values).collect();
        assert_eq!(
            rows,
            vec![
                vec![
                    CellValue::text("Revenue"),
                    CellValue::Number(100.0),
                    CellValue::Empty
                ],
                vec![CellValue::Empty, CellValue::Number(200.0), CellValue::Empty],
                vec![CellValue::Empty, CellValue::Empty, CellValue::Empty],
            ]
        );
    }

    #[test]
    fn test_formulas_mode_keeps_formula_cells() {
        let sheet = sheet();
        let range = RangeAddress::parse("C3:D4").unwrap();
        let rows: Vec<_> = ExportRows::new(&sheet, Some(range), ExportMode::Formulas).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0].formula_text(), Some("=C2*2"));
        assert_eq!(rows[1][1], CellValue::formula("=C3+1"));
    }

    #[test]
    fn test_rows_are_lazy_and_sized() {
        let sheet = sheet();
        let range = RangeAddress::parse("A1:A1000000").unwrap();
        let mut rows = ExportRows::new(&sheet, Some(range), ExportMode::Values);
        assert_eq!(rows.len(), 1_000_000);
        rows.next();
        assert_eq!(rows.len(), 999_999);
    }

    #[test]
    fn test_empty_sheet_has_no_rows() {
        let sheet = Worksheet::new("Blank");
        let mut rows = ExportRows::new(&sheet, None, ExportMode::Values);
        assert_eq!(rows.range(), None);
        assert!(rows.next().is_none());
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(ExportFormat::from_path(Path::new("out.CSV")), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::from_path(Path::new("a/b.json")), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::from_path(Path::new("out.txt")), None);
        assert!("xml".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_json_output() {
        let rows = vec![
            vec![CellValue::text("x"), CellValue::Number(1.5), CellValue::Empty],
            vec![CellValue::formula("=A1"), CellValue::Boolean(false)],
        ];
        let mut out = Vec::new();
        assert_eq!(write_json(rows, &mut out).unwrap(), 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "[[\"x\",1.5,null],[{\"formula\":\"=A1\",\"value\":null},false]]\n"
        );
    }

    #[test]
    fn test_write_rows_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.csv");
        let rows = vec![vec![CellValue::text("a"), CellValue::Number(2.0)]];

        let report = write_rows(rows, ExportFormat::Csv, &dest).unwrap();

        assert_eq!(report.rows_exported, 1);
        assert_eq!(report.file_size_bytes, 4);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "a,2\n");
    }
}
