//! XLSX reader

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::escape::decode_excel_escapes;
use crate::shared_formula::SharedFormulas;
use crate::styles::{attr_value, is_truthy, read_styles_xml};
use sheetwarden_core::{
    CellAddress, CellNote, CellStyle, CellValue, DefinedName, NameScope, Workbook, Worksheet,
};

const REL_WORKSHEET: &str = "/worksheet";
const REL_COMMENTS: &str = "/comments";

/// Sheet entry from `xl/workbook.xml`
struct SheetEntry {
    name: String,
    rel_id: String,
}

/// Everything kept from `xl/workbook.xml`
#[derive(Default)]
struct WorkbookPart {
    sheets: Vec<SheetEntry>,
    active_tab: usize,
    defined_names: Vec<DefinedName>,
}

/// XLSX file reader
pub struct XlsxReader;

impl XlsxReader {
    /// Read a workbook from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook> {
        let file = File::open(path)?;
        Self::read(BufReader::new(file))
    }

    /// Read a workbook from a reader
    pub fn read<R: Read + Seek>(reader: R) -> XlsxResult<Workbook> {
        let mut archive = zip::ZipArchive::new(reader)?;

        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }

        let shared_strings = Self::read_shared_strings(&mut archive)?;
        let cell_styles = match archive.by_name("xl/styles.xml") {
            Ok(file) => read_styles_xml(file)?,
            Err(_) => Vec::new(),
        };
        let WorkbookPart {
            sheets,
            active_tab,
            defined_names,
        } = Self::read_workbook_xml(&mut archive)?;
        let sheet_paths = Self::read_rels(&mut archive, "xl/workbook.xml", REL_WORKSHEET)?;

        let mut workbook = Workbook::new();
        // `localSheetId` counts `<sheet>` entries, skipped ones included
        let mut sheet_slots = Vec::with_capacity(sheets.len());
        for entry in sheets {
            let Some(path) = sheet_paths.get(&entry.rel_id) else {
                debug!("sheet '{}' has no worksheet part, skipping", entry.name);
                sheet_slots.push(None);
                continue;
            };
            sheet_slots.push(Some(workbook.sheet_count()));

            let mut worksheet = Worksheet::new(entry.name);
            Self::read_worksheet(
                &mut archive,
                path,
                &mut worksheet,
                &shared_strings,
                &cell_styles,
            )?;

            let comment_parts = Self::read_rels(&mut archive, path, REL_COMMENTS)?;
            for comments_path in comment_parts.values() {
                Self::read_comments(&mut archive, comments_path, &mut worksheet)?;
            }

            workbook.push_worksheet(worksheet)?;
        }

        if workbook.is_empty() {
            return Err(XlsxError::InvalidFormat("workbook has no worksheets".into()));
        }
        workbook.set_active_sheet(active_tab);

        for mut defined in defined_names {
            if let NameScope::Sheet(slot) = defined.scope {
                let Some(index) = sheet_slots.get(slot).copied().flatten() else {
                    debug!("defined name '{}' is local to a skipped sheet", defined.name);
                    continue;
                };
                defined.scope = NameScope::Sheet(index);
            }
            workbook.define_name(defined)?;
        }

        Ok(workbook)
    }

    /// Read the shared strings table
    fn read_shared_strings<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<String>> {
        let file = match archive.by_name("xl/sharedStrings.xml") {
            Ok(f) => f,
            Err(_) => return Ok(Vec::new()),
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        let mut buf = Vec::new();
        let mut strings = Vec::new();
        let mut current = String::new();
        let mut in_si = false;
        let mut in_t = false;
        // Phonetic runs (<rPh>) carry reading hints, not cell text
        let mut in_phonetic = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current.clear();
                    }
                    b"rPh" => in_phonetic = true,
                    b"t" if in_si && !in_phonetic => in_t = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) if e.name().as_ref() == b"si" => {
                    strings.push(String::new());
                }
                Ok(Event::Text(e)) if in_t => {
                    current.push_str(&e.unescape()?);
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"si" => {
                        strings.push(decode_excel_escapes(&current));
                        in_si = false;
                    }
                    b"rPh" => in_phonetic = false,
                    b"t" => in_t = false,
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    /// Read sheet names, relationship ids, the active tab and defined names
    fn read_workbook_xml<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<WorkbookPart> {
        let file = archive
            .by_name("xl/workbook.xml")
            .map_err(|_| XlsxError::MissingPart("xl/workbook.xml".into()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);
        let mut buf = Vec::new();
        let mut part = WorkbookPart::default();
        let mut defined: Option<DefinedName> = None;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) if e.name().as_ref() == b"definedName" => {
                    let name = attr_value(&e, b"name")
                        .ok_or_else(|| XlsxError::Parse("<definedName> without name".into()))?;
                    let mut entry = DefinedName::new(name, "");
                    if let Some(slot) = attr_value(&e, b"localSheetId").and_then(|v| v.parse().ok())
                    {
                        entry = entry.local_to(slot);
                    }
                    entry.hidden = attr_value(&e, b"hidden").is_some_and(|v| is_truthy(&v));
                    defined = Some(entry);
                }
                Ok(Event::Text(e)) => {
                    if let Some(entry) = defined.as_mut() {
                        entry.refers_to.push_str(&e.unescape()?);
                    }
                }
                Ok(Event::End(e)) if e.name().as_ref() == b"definedName" => {
                    if let Some(entry) = defined.take() {
                        part.defined_names.push(entry);
                    }
                }
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                    b"sheet" => {
                        let name = attr_value(&e, b"name");
                        let rel_id = attr_value(&e, b"r:id");
                        match (name, rel_id) {
                            (Some(name), Some(rel_id)) => {
                                part.sheets.push(SheetEntry { name, rel_id })
                            }
                            _ => {
                                return Err(XlsxError::Parse(
                                    "<sheet> without name or r:id".into(),
                                ))
                            }
                        }
                    }
                    b"workbookView" => {
                        part.active_tab = attr_value(&e, b"activeTab")
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(0);
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(part)
    }

    /// Read the relationships of `part`, keeping those whose type ends with
    /// `type_suffix`. Returns relationship id -> resolved archive path.
    fn read_rels<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        part: &str,
        type_suffix: &str,
    ) -> XlsxResult<HashMap<String, String>> {
        let (dir, file_name) = split_part(part);
        let rels_path = format!("{}_rels/{}.rels", dir, file_name);

        let file = match archive.by_name(&rels_path) {
            Ok(f) => f,
            Err(_) => return Ok(HashMap::new()),
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);
        let mut buf = Vec::new();
        let mut rels = HashMap::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    let id = attr_value(&e, b"Id");
                    let target = attr_value(&e, b"Target");
                    let rel_type = attr_value(&e, b"Type").unwrap_or_default();
                    let external = attr_value(&e, b"TargetMode").as_deref() == Some("External");
                    if let (Some(id), Some(target)) = (id, target) {
                        if rel_type.ends_with(type_suffix) && !external {
                            rels.insert(id, resolve_target(dir, &target));
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Read a worksheet from the archive
    fn read_worksheet<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        path: &str,
        worksheet: &mut Worksheet,
        shared_strings: &[String],
        cell_styles: &[CellStyle],
    ) -> XlsxResult<()> {
        let file = archive
            .by_name(path)
            .map_err(|_| XlsxError::MissingPart(path.to_string()))?;

        // Text is not trimmed: leading and trailing spaces in strings matter
        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        let mut buf = Vec::new();

        let mut cell: Option<RawCell> = None;
        let mut shared = SharedFormulas::default();
        let mut in_value = false;
        let mut in_formula = false;
        let mut in_inline_text = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"c" => cell = Some(RawCell::from_element(&e)),
                    b"v" if cell.is_some() => in_value = true,
                    b"f" => {
                        if let Some(raw) = cell.as_mut() {
                            raw.shared_index = shared_index(&e);
                            in_formula = true;
                        }
                    }
                    b"is" => {
                        if let Some(raw) = cell.as_mut() {
                            raw.inline = Some(String::new());
                        }
                    }
                    b"t" if cell.is_some() => in_inline_text = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) => match e.name().as_ref() {
                    b"c" => {
                        let raw = RawCell::from_element(&e);
                        raw.apply(worksheet, &mut shared, shared_strings, cell_styles)?;
                    }
                    // Shared formula follower
                    b"f" => {
                        if let Some(raw) = cell.as_mut() {
                            raw.shared_index = shared_index(&e);
                        }
                    }
                    _ => {}
                },
                Ok(Event::Text(e)) => {
                    if let Some(raw) = cell.as_mut() {
                        let text = e.unescape()?;
                        if in_value {
                            raw.value.get_or_insert_with(String::new).push_str(&text);
                        } else if in_formula {
                            raw.formula.get_or_insert_with(String::new).push_str(&text);
                        } else if in_inline_text {
                            raw.inline.get_or_insert_with(String::new).push_str(&text);
                        }
                    }
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"c" => {
                        if let Some(raw) = cell.take() {
                            raw.apply(worksheet, &mut shared, shared_strings, cell_styles)?;
                        }
                    }
                    b"v" => in_value = false,
                    b"f" => in_formula = false,
                    b"t" => in_inline_text = false,
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }

    /// Read notes from a comments part into the worksheet
    fn read_comments<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        path: &str,
        worksheet: &mut Worksheet,
    ) -> XlsxResult<()> {
        let file = match archive.by_name(path) {
            Ok(f) => f,
            Err(_) => {
                debug!("comments part {} is referenced but missing", path);
                return Ok(());
            }
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        let mut buf = Vec::new();
        let mut authors: Vec<String> = Vec::new();

        let mut in_author = false;
        let mut in_t = false;
        let mut current_ref: Option<String> = None;
        let mut current_author: Option<usize> = None;
        let mut current_text = String::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"author" => {
                        in_author = true;
                        authors.push(String::new());
                    }
                    b"comment" => {
                        current_ref = attr_value(&e, b"ref");
                        current_author = attr_value(&e, b"authorId").and_then(|v| v.parse().ok());
                        current_text.clear();
                    }
                    b"t" if current_ref.is_some() => in_t = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) if e.name().as_ref() == b"author" => {
                    authors.push(String::new());
                }
                Ok(Event::Text(e)) => {
                    if in_author {
                        if let Some(last) = authors.last_mut() {
                            last.push_str(&e.unescape()?);
                        }
                    } else if in_t {
                        current_text.push_str(&e.unescape()?);
                    }
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"author" => in_author = false,
                    b"t" => in_t = false,
                    b"comment" => {
                        if let Some(cell_ref) = current_ref.take() {
                            let addr = parse_cell_ref(&cell_ref)?;
                            let author = current_author
                                .and_then(|id| authors.get(id))
                                .cloned()
                                .unwrap_or_default();
                            let text = decode_excel_escapes(&current_text);
                            worksheet.set_note(addr, Some(CellNote::new(author, text)));
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }
}

/// Cell state collected between `<c>` and `</c>`
#[derive(Debug, Default)]
struct RawCell {
    reference: Option<String>,
    cell_type: Option<String>,
    style: Option<usize>,
    value: Option<String>,
    formula: Option<String>,
    /// `si` of a `t="shared"` formula
    shared_index: Option<u32>,
    inline: Option<String>,
}

impl RawCell {
    fn from_element(e: &BytesStart<'_>) -> Self {
        Self {
            reference: attr_value(e, b"r"),
            cell_type: attr_value(e, b"t"),
            style: attr_value(e, b"s").and_then(|v| v.parse().ok()),
            ..Self::default()
        }
    }

    fn apply(
        self,
        worksheet: &mut Worksheet,
        shared: &mut SharedFormulas,
        shared_strings: &[String],
        cell_styles: &[CellStyle],
    ) -> XlsxResult<()> {
        let Some(reference) = self.reference.as_deref() else {
            // Cells without `r` are legal but rare; sheetwarden never writes them
            return Err(XlsxError::Parse("cell without a reference".into()));
        };
        let addr = parse_cell_ref(reference)?;

        let value = self.literal_value(shared_strings)?;
        let formula = match (self.formula.as_deref().filter(|f| !f.is_empty()), self.shared_index) {
            (Some(f), Some(index)) => {
                shared.insert_master(index, addr, f);
                Some(f.to_string())
            }
            (Some(f), None) => Some(f.to_string()),
            (None, Some(index)) => Some(shared.follower(index, addr)?),
            (None, None) => None,
        };
        let value = match formula {
            Some(f) => CellValue::Formula {
                text: if f.starts_with('=') {
                    f
                } else {
                    format!("={}", f)
                },
                cached_value: value.map(Box::new),
            },
            None => value.unwrap_or_default(),
        };
        worksheet.set_value(addr, value);

        if let Some(idx) = self.style.filter(|&s| s != 0) {
            let style = cell_styles
                .get(idx)
                .ok_or_else(|| XlsxError::Parse(format!("Style index {} out of bounds", idx)))?;
            if !style.is_default() {
                worksheet.set_style(addr, Some(style.clone()));
            }
        }

        Ok(())
    }

    /// The value written in `<v>` or `<is>`, typed by the `t` attribute
    fn literal_value(&self, shared_strings: &[String]) -> XlsxResult<Option<CellValue>> {
        if let Some(inline) = &self.inline {
            return Ok(Some(CellValue::Text(decode_excel_escapes(inline))));
        }
        let Some(v) = self.value.as_deref() else {
            return Ok(None);
        };

        let value = match self.cell_type.as_deref() {
            Some("s") => {
                let idx: usize = v.trim().parse().map_err(|_| {
                    XlsxError::Parse(format!("Invalid shared string index: {}", v))
                })?;
                let s = shared_strings.get(idx).ok_or_else(|| {
                    XlsxError::Parse(format!("Shared string index {} out of bounds", idx))
                })?;
                CellValue::Text(s.clone())
            }
            Some("b") => CellValue::Boolean(is_truthy(v.trim())),
            Some("e") => CellValue::Error(v.to_string()),
            Some("str") | Some("inlineStr") => CellValue::Text(decode_excel_escapes(v)),
            None | Some("n") => match v.trim().parse::<f64>() {
                Ok(n) => CellValue::Number(n),
                Err(_) => CellValue::Text(v.to_string()),
            },
            Some(_) => CellValue::Text(v.to_string()),
        };
        Ok(Some(value))
    }
}

/// `si` of an `<f t="shared">` element
fn shared_index(e: &BytesStart<'_>) -> Option<u32> {
    if attr_value(e, b"t").as_deref() != Some("shared") {
        return None;
    }
    attr_value(e, b"si").and_then(|v| v.parse().ok())
}

fn parse_cell_ref(reference: &str) -> XlsxResult<CellAddress> {
    CellAddress::parse(reference).map_err(|e| {
        XlsxError::Parse(format!("Invalid cell reference '{}': {}", reference, e))
    })
}

/// Split `xl/worksheets/sheet1.xml` into (`xl/worksheets/`, `sheet1.xml`)
fn split_part(part: &str) -> (&str, &str) {
    match part.rfind('/') {
        Some(pos) => (&part[..=pos], &part[pos + 1..]),
        None => ("", part),
    }
}

/// Resolve a relationship target against the directory of its source part
fn resolve_target(dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
