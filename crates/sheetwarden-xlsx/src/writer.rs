//! XLSX writer

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use crate::error::XlsxResult;
use crate::escape::{encode_excel_escapes, escape_xml};
use crate::styles::XlsxStyleTable;
use sheetwarden_core::{CellAddress, CellNote, CellValue, Workbook, Worksheet};

type ZipWriter<W> = zip::ZipWriter<W>;

/// XLSX file writer
pub struct XlsxWriter;

impl XlsxWriter {
    /// Write a workbook to a file path
    pub fn write_file<P: AsRef<Path>>(workbook: &Workbook, path: P) -> XlsxResult<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write(workbook, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write a workbook to a writer
    pub fn write<W: Write + Seek>(workbook: &Workbook, writer: W) -> XlsxResult<()> {
        let mut zip = zip::ZipWriter::new(writer);
        let style_table = XlsxStyleTable::build(workbook);

        let sheets_with_notes: Vec<usize> = workbook
            .worksheets()
            .enumerate()
            .filter(|(_, sheet)| sheet.note_count() > 0)
            .map(|(i, _)| i)
            .collect();

        Self::write_content_types(&mut zip, workbook, &sheets_with_notes)?;
        Self::write_root_rels(&mut zip)?;
        Self::write_workbook_xml(&mut zip, workbook)?;
        Self::write_workbook_rels(&mut zip, workbook)?;
        write_part(&mut zip, "xl/styles.xml", &style_table.to_styles_xml())?;

        for (i, sheet) in workbook.worksheets().enumerate() {
            let has_notes = sheet.note_count() > 0;
            Self::write_worksheet(&mut zip, sheet, i, &style_table, has_notes)?;

            if has_notes {
                Self::write_worksheet_rels(&mut zip, i)?;
                Self::write_comments(&mut zip, sheet, i)?;
                Self::write_vml_drawing(&mut zip, sheet, i)?;
            }
        }

        zip.finish()?;
        Ok(())
    }

    fn write_content_types<W: Write + Seek>(
        zip: &mut ZipWriter<W>,
        workbook: &Workbook,
        sheets_with_notes: &[usize],
    ) -> XlsxResult<()> {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Default Extension="vml" ContentType="application/vnd.openxmlformats-officedocument.vmlDrawing"/>
    <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
    <Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
        );

        for i in 0..workbook.sheet_count() {
            content.push_str(&format!(
                r#"
    <Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                i + 1
            ));
        }

        for &i in sheets_with_notes {
            content.push_str(&format!(
                r#"
    <Override PartName="/xl/comments{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.comments+xml"/>"#,
                i + 1
            ));
        }

        content.push_str("\n</Types>");
        write_part(zip, "[Content_Types].xml", &content)
    }

    fn write_root_rels<W: Write + Seek>(zip: &mut ZipWriter<W>) -> XlsxResult<()> {
        write_part(
            zip,
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#,
        )
    }

    fn write_workbook_xml<W: Write + Seek>(
        zip: &mut ZipWriter<W>,
        workbook: &Workbook,
    ) -> XlsxResult<()> {
        let mut content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
    <bookViews>
        <workbookView activeTab="{}"/>
    </bookViews>
    <sheets>"#,
            workbook.active_sheet()
        );

        for (i, sheet) in workbook.worksheets().enumerate() {
            content.push_str(&format!(
                r#"
        <sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape_xml(sheet.name()),
                i + 1,
                i + 1
            ));
        }

        content.push_str(
            r#"
    </sheets>"#,
        );

        if !workbook.defined_names().is_empty() {
            content.push_str("\n    <definedNames>");
            for defined in workbook.defined_names() {
                let mut attrs = format!(r#"name="{}""#, escape_xml(&defined.name));
                if let Some(index) = defined.local_sheet() {
                    attrs.push_str(&format!(r#" localSheetId="{}""#, index));
                }
                if defined.hidden {
                    attrs.push_str(r#" hidden="1""#);
                }
                content.push_str(&format!(
                    "\n        <definedName {}>{}</definedName>",
                    attrs,
                    escape_xml(&defined.refers_to)
                ));
            }
            content.push_str("\n    </definedNames>");
        }

        content.push_str("\n</workbook>");
        write_part(zip, "xl/workbook.xml", &content)
    }

    fn write_workbook_rels<W: Write + Seek>(
        zip: &mut ZipWriter<W>,
        workbook: &Workbook,
    ) -> XlsxResult<()> {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );

        for i in 0..workbook.sheet_count() {
            content.push_str(&format!(
                r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                i + 1,
                i + 1
            ));
        }

        content.push_str(&format!(
            r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#,
            workbook.sheet_count() + 1
        ));
        write_part(zip, "xl/_rels/workbook.xml.rels", &content)
    }

    fn write_worksheet<W: Write + Seek>(
        zip: &mut ZipWriter<W>,
        sheet: &Worksheet,
        index: usize,
        style_table: &XlsxStyleTable,
        has_notes: bool,
    ) -> XlsxResult<()> {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
        );

        if let Some(range) = sheet.used_range() {
            content.push_str(&format!("\n    <dimension ref=\"{}\"/>", range));
        }
        content.push_str("\n    <sheetData>");

        // Cells iterate row-major, so rows open and close in order
        let mut current_row: Option<u32> = None;
        for (addr, cell) in sheet.cells() {
            if current_row != Some(addr.row) {
                if current_row.is_some() {
                    content.push_str("\n        </row>");
                }
                content.push_str(&format!("\n        <row r=\"{}\">", addr.row));
                current_row = Some(addr.row);
            }

            let xf_id = style_table.xf_id_for(cell.style.as_ref());
            let style_attr = if xf_id != 0 {
                format!(" s=\"{}\"", xf_id)
            } else {
                String::new()
            };
            content.push_str(&cell_xml(addr, &style_attr, &cell.value));
        }
        if current_row.is_some() {
            content.push_str("\n        </row>");
        }
        content.push_str("\n    </sheetData>");

        if has_notes {
            content.push_str("\n    <legacyDrawing r:id=\"rId2\"/>");
        }
        content.push_str("\n</worksheet>");

        write_part(zip, &format!("xl/worksheets/sheet{}.xml", index + 1), &content)
    }

    /// Worksheet relationships: rId1 is the comments part, rId2 its drawing
    fn write_worksheet_rels<W: Write + Seek>(
        zip: &mut ZipWriter<W>,
        index: usize,
    ) -> XlsxResult<()> {
        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments" Target="../comments{n}.xml"/>
    <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/vmlDrawing" Target="../drawings/vmlDrawing{n}.vml"/>
</Relationships>"#,
            n = index + 1
        );
        write_part(
            zip,
            &format!("xl/worksheets/_rels/sheet{}.xml.rels", index + 1),
            &content,
        )
    }

    fn write_comments<W: Write + Seek>(
        zip: &mut ZipWriter<W>,
        sheet: &Worksheet,
        index: usize,
    ) -> XlsxResult<()> {
        let notes: Vec<(CellAddress, &CellNote)> = sheet
            .cells()
            .filter_map(|(addr, cell)| cell.note.as_ref().map(|n| (addr, n)))
            .collect();

        // Authors in first-use order; index 0 always exists
        let mut authors: Vec<&str> = Vec::new();
        for (_, note) in &notes {
            if !authors.contains(&note.author.as_str()) {
                authors.push(&note.author);
            }
        }
        if authors.is_empty() {
            authors.push("");
        }

        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<comments xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
    <authors>"#,
        );
        for author in &authors {
            content.push_str(&format!("\n        <author>{}</author>", escape_xml(author)));
        }
        content.push_str("\n    </authors>\n    <commentList>");

        for (addr, note) in &notes {
            let author_id = authors
                .iter()
                .position(|a| *a == note.author)
                .unwrap_or(0);
            content.push_str(&format!(
                r#"
        <comment ref="{}" authorId="{}"><text><r><t xml:space="preserve">{}</t></r></text></comment>"#,
                addr,
                author_id,
                escape_xml(&encode_excel_escapes(&note.text))
            ));
        }

        content.push_str("\n    </commentList>\n</comments>");
        write_part(zip, &format!("xl/comments{}.xml", index + 1), &content)
    }

    /// Legacy drawing Excel needs to show the note boxes
    fn write_vml_drawing<W: Write + Seek>(
        zip: &mut ZipWriter<W>,
        sheet: &Worksheet,
        index: usize,
    ) -> XlsxResult<()> {
        let mut xml = String::from(concat!(
            r#"<xml xmlns:v="urn:schemas-microsoft-com:vml" xmlns:o="urn:schemas-microsoft-com:office:office" xmlns:x="urn:schemas-microsoft-com:office:excel">"#,
            r#"<o:shapelayout v:ext="edit"><o:idmap v:ext="edit" data="1"/></o:shapelayout>"#,
            r#"<v:shapetype id="_x0000_t202" coordsize="21600,21600" o:spt="202" path="m,l,21600r21600,l21600,xe">"#,
            r#"<v:stroke joinstyle="miter"/><v:path gradientshapeok="t" o:connecttype="rect"/></v:shapetype>"#,
        ));

        let noted = sheet.cells().filter(|(_, cell)| cell.note.is_some());
        for (n, (addr, _)) in noted.enumerate() {
            let row0 = addr.row - 1;
            let col0 = u32::from(addr.col) - 1;
            xml.push_str(&format!(
                concat!(
                    r##"<v:shape id="_x0000_s{}" type="#_x0000_t202" style="position:absolute;width:108pt;height:59.25pt;z-index:{};visibility:hidden" fillcolor="#ffffe1" o:insetmode="auto">"##,
                    r##"<v:fill color2="#ffffe1"/><v:shadow on="t" color="black" obscured="t"/><v:path o:connecttype="none"/>"##,
                    r#"<v:textbox style="mso-direction-alt:auto"><div style="text-align:left"></div></v:textbox>"#,
                    r#"<x:ClientData ObjectType="Note"><x:MoveWithCells/><x:SizeWithCells/>"#,
                    r#"<x:Anchor>{}, 15, {}, 2, {}, 15, {}, 16</x:Anchor><x:AutoFill>False</x:AutoFill>"#,
                    r#"<x:Row>{}</x:Row><x:Column>{}</x:Column></x:ClientData></v:shape>"#
                ),
                1025 + n,
                n + 1,
                col0 + 1,
                row0.saturating_sub(1),
                col0 + 3,
                row0 + 3,
                row0,
                col0
            ));
        }

        xml.push_str("</xml>");
        write_part(
            zip,
            &format!("xl/drawings/vmlDrawing{}.vml", index + 1),
            &xml,
        )
    }
}

fn write_part<W: Write + Seek>(zip: &mut ZipWriter<W>, name: &str, content: &str) -> XlsxResult<()> {
    let options = zip::write::SimpleFileOptions::default();
    zip.start_file(name, options)?;
    zip.write_all(content.as_bytes())?;
    Ok(())
}

/// `<c>` element for one cell. Empty values are kept only when styled.
fn cell_xml(addr: CellAddress, style_attr: &str, value: &CellValue) -> String {
    match value {
        CellValue::Empty => {
            if style_attr.is_empty() {
                String::new()
            } else {
                format!("\n            <c r=\"{}\"{}/>", addr, style_attr)
            }
        }
        CellValue::Formula { text, cached_value } => {
            let body = text.strip_prefix('=').unwrap_or(text);
            let (type_attr, cached) = match cached_value.as_deref() {
                Some(v) => literal_parts(v),
                None => ("", None),
            };
            let cached = cached.map_or(String::new(), |v| format!("<v>{}</v>", v));
            format!(
                "\n            <c r=\"{}\"{}{}><f>{}</f>{}</c>",
                addr,
                style_attr,
                type_attr,
                escape_xml(body),
                cached
            )
        }
        CellValue::Text(s) => format!(
            "\n            <c r=\"{}\"{} t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
            addr,
            style_attr,
            escape_xml(&encode_excel_escapes(s))
        ),
        other => {
            let (type_attr, v) = literal_parts(other);
            let v = v.unwrap_or_default();
            format!(
                "\n            <c r=\"{}\"{}{}><v>{}</v></c>",
                addr, style_attr, type_attr, v
            )
        }
    }
}

/// The `t` attribute and escaped `<v>` text for a literal value
fn literal_parts(value: &CellValue) -> (&'static str, Option<String>) {
    match value {
        CellValue::Number(n) if n.is_finite() => ("", Some(n.to_string())),
        CellValue::Number(_) => (" t=\"e\"", Some("#NUM!".to_string())),
        CellValue::Boolean(b) => (" t=\"b\"", Some(if *b { "1" } else { "0" }.to_string())),
        CellValue::Error(e) => (" t=\"e\"", Some(escape_xml(e))),
        CellValue::Text(s) => (
            " t=\"str\"",
            Some(escape_xml(&encode_excel_escapes(s))),
        ),
        CellValue::Empty | CellValue::Formula { .. } => ("", None),
    }
}
