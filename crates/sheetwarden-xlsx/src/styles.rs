//! XLSX styles (styles.xml) read/write helpers

use std::collections::HashMap;
use std::io::{BufReader, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::escape::escape_xml;
use sheetwarden_core::{BorderKind, CellStyle, Color, Workbook};

/// First id available for custom number formats
const FIRST_CUSTOM_NUMFMT_ID: u32 = 164;

/// Built-in number formats that never appear in `<numFmts>`
const BUILTIN_NUMFMTS: &[(u32, &str)] = &[
    (1, "0"),
    (2, "0.00"),
    (3, "#,##0"),
    (4, "#,##0.00"),
    (9, "0%"),
    (10, "0.00%"),
    (11, "0.00E+00"),
    (14, "m/d/yyyy"),
    (22, "m/d/yyyy h:mm"),
    (49, "@"),
];

fn builtin_numfmt_id(code: &str) -> Option<u32> {
    BUILTIN_NUMFMTS
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(id, _)| *id)
}

fn builtin_numfmt_code(id: u32) -> Option<&'static str> {
    BUILTIN_NUMFMTS
        .iter()
        .find(|(i, _)| *i == id)
        .map(|(_, c)| *c)
}

// === Writing ===

/// Workbook-wide deduplicated cell formats
///
/// Index 0 is the default style; every other entry is a distinct
/// [`CellStyle`] used by at least one cell.
#[derive(Debug)]
pub(crate) struct XlsxStyleTable {
    styles: Vec<CellStyle>,
    xf_ids: HashMap<CellStyle, u32>,
}

impl XlsxStyleTable {
    pub(crate) fn build(workbook: &Workbook) -> Self {
        let default = CellStyle::default();
        let mut styles = vec![default.clone()];
        let mut xf_ids = HashMap::new();
        xf_ids.insert(default, 0);

        for sheet in workbook.worksheets() {
            for (_, cell) in sheet.cells() {
                let Some(style) = &cell.style else { continue };
                if !xf_ids.contains_key(style) {
                    xf_ids.insert(style.clone(), styles.len() as u32);
                    styles.push(style.clone());
                }
            }
        }

        Self { styles, xf_ids }
    }

    /// The `s` attribute for a cell with this style (0 for the default)
    pub(crate) fn xf_id_for(&self, style: Option<&CellStyle>) -> u32 {
        style
            .and_then(|s| self.xf_ids.get(s))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn to_styles_xml(&self) -> String {
        // Component tables. Excel requires fills 0 and 1 to be none and gray125.
        let mut fills: Vec<Option<Color>> = vec![None];
        let mut borders: Vec<BorderKind> = vec![BorderKind::None];
        let mut numfmts: Vec<(u32, String)> = Vec::new();
        let mut next_numfmt_id = FIRST_CUSTOM_NUMFMT_ID;

        let mut xfs = String::new();
        for style in &self.styles {
            let font_id = u32::from(style.bold);

            let fill_id = match style.fill {
                None => 0,
                Some(color) => match fills.iter().position(|f| *f == Some(color)) {
                    // Offset by the gray125 slot
                    Some(pos) => pos as u32 + 1,
                    None => {
                        fills.push(Some(color));
                        fills.len() as u32
                    }
                },
            };

            let border_id = match borders.iter().position(|b| *b == style.border) {
                Some(pos) => pos as u32,
                None => {
                    borders.push(style.border);
                    borders.len() as u32 - 1
                }
            };

            let num_fmt_id = match style.number_format.as_deref() {
                None | Some("General") => 0,
                Some(code) => match builtin_numfmt_id(code) {
                    Some(id) => id,
                    None => match numfmts.iter().find(|(_, c)| c == code) {
                        Some((id, _)) => *id,
                        None => {
                            let id = next_numfmt_id;
                            next_numfmt_id += 1;
                            numfmts.push((id, code.to_string()));
                            id
                        }
                    },
                },
            };

            xfs.push_str(&write_xf(style, font_id, fill_id, border_id, num_fmt_id));
        }

        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );

        if !numfmts.is_empty() {
            xml.push_str(&format!("<numFmts count=\"{}\">", numfmts.len()));
            for (id, code) in &numfmts {
                xml.push_str(&format!(
                    "<numFmt numFmtId=\"{}\" formatCode=\"{}\"/>",
                    id,
                    escape_xml(code)
                ));
            }
            xml.push_str("</numFmts>");
        }

        xml.push_str(concat!(
            "<fonts count=\"2\">",
            "<font><sz val=\"11\"/><name val=\"Calibri\"/><family val=\"2\"/></font>",
            "<font><b/><sz val=\"11\"/><name val=\"Calibri\"/><family val=\"2\"/></font>",
            "</fonts>"
        ));

        xml.push_str(&format!("<fills count=\"{}\">", fills.len() + 1));
        xml.push_str("<fill><patternFill patternType=\"none\"/></fill>");
        xml.push_str("<fill><patternFill patternType=\"gray125\"/></fill>");
        for color in fills.iter().flatten() {
            xml.push_str(&format!(
                "<fill><patternFill patternType=\"solid\"><fgColor rgb=\"{}\"/><bgColor indexed=\"64\"/></patternFill></fill>",
                color.to_argb_hex()
            ));
        }
        xml.push_str("</fills>");

        xml.push_str(&format!("<borders count=\"{}\">", borders.len()));
        for border in &borders {
            xml.push_str(&write_border(*border));
        }
        xml.push_str("</borders>");

        xml.push_str(concat!(
            "<cellStyleXfs count=\"1\">",
            "<xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\"/>",
            "</cellStyleXfs>"
        ));
        xml.push_str(&format!("<cellXfs count=\"{}\">", self.styles.len()));
        xml.push_str(&xfs);
        xml.push_str("</cellXfs>");
        xml.push_str(concat!(
            "<cellStyles count=\"1\">",
            "<cellStyle name=\"Normal\" xfId=\"0\" builtinId=\"0\"/>",
            "</cellStyles>",
            "</styleSheet>"
        ));
        xml
    }
}

fn write_border(border: BorderKind) -> String {
    match border.as_xlsx_str() {
        None => "<border><left/><right/><top/><bottom/><diagonal/></border>".to_string(),
        Some(style) => {
            let edge = |tag: &str| {
                format!("<{tag} style=\"{style}\"><color indexed=\"64\"/></{tag}>")
            };
            format!(
                "<border>{}{}{}{}<diagonal/></border>",
                edge("left"),
                edge("right"),
                edge("top"),
                edge("bottom")
            )
        }
    }
}

fn write_xf(style: &CellStyle, font_id: u32, fill_id: u32, border_id: u32, num_fmt_id: u32) -> String {
    let mut attrs = String::new();
    if num_fmt_id != 0 {
        attrs.push_str(" applyNumberFormat=\"1\"");
    }
    if font_id != 0 {
        attrs.push_str(" applyFont=\"1\"");
    }
    if fill_id != 0 {
        attrs.push_str(" applyFill=\"1\"");
    }
    if border_id != 0 {
        attrs.push_str(" applyBorder=\"1\"");
    }
    if !style.locked {
        attrs.push_str(" applyProtection=\"1\"");
    }

    let mut s = format!(
        "<xf numFmtId=\"{}\" fontId=\"{}\" fillId=\"{}\" borderId=\"{}\" xfId=\"0\"{}",
        num_fmt_id, font_id, fill_id, border_id, attrs
    );
    if style.locked {
        s.push_str("/>");
    } else {
        s.push_str("><protection locked=\"0\"/></xf>");
    }
    s
}

// === Reading ===

/// Parse `styles.xml` into one [`CellStyle`] per `cellXfs` entry
pub(crate) fn read_styles_xml<R: Read>(reader: R) -> XlsxResult<Vec<CellStyle>> {
    let mut xml_reader = Reader::from_reader(BufReader::new(reader));
    xml_reader.trim_text(true);

    let mut parser = StylesParser::default();
    let mut buf = Vec::new();
    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => parser.start(&e, false),
            Ok(Event::Empty(e)) => parser.start(&e, true),
            Ok(Event::End(e)) => parser.end(e.name().as_ref()),
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(parser.resolve())
}

#[derive(Debug, Clone, Copy, Default)]
struct RawXf {
    num_fmt_id: u32,
    font_id: usize,
    fill_id: usize,
    border_id: usize,
    locked: bool,
}

#[derive(Debug, Default)]
struct StylesParser {
    numfmts: HashMap<u32, String>,
    /// Bold flag per font
    fonts: Vec<bool>,
    fills: Vec<Option<Color>>,
    borders: Vec<BorderKind>,
    xfs: Vec<RawXf>,

    in_font: bool,
    in_fill: bool,
    solid_fill: bool,
    in_border: bool,
    in_cell_xfs: bool,
    current_xf: Option<RawXf>,
}

impl StylesParser {
    fn start(&mut self, e: &BytesStart<'_>, empty: bool) {
        match e.name().as_ref() {
            b"numFmt" => {
                let id = attr_value(e, b"numFmtId").and_then(|v| v.parse().ok());
                let code = attr_value(e, b"formatCode");
                if let (Some(id), Some(code)) = (id, code) {
                    self.numfmts.insert(id, code);
                }
            }
            b"font" => {
                self.fonts.push(false);
                self.in_font = !empty;
            }
            b"b" if self.in_font => {
                let bold = attr_value(e, b"val").map_or(true, |v| is_truthy(&v));
                if let Some(last) = self.fonts.last_mut() {
                    *last = bold;
                }
            }
            b"fill" => {
                self.fills.push(None);
                self.in_fill = !empty;
                self.solid_fill = false;
            }
            b"patternFill" if self.in_fill => {
                self.solid_fill = attr_value(e, b"patternType").as_deref() == Some("solid");
            }
            b"fgColor" if self.in_fill && self.solid_fill => {
                let color = attr_value(e, b"rgb").and_then(|rgb| Color::from_hex(&rgb));
                if let Some(last) = self.fills.last_mut() {
                    *last = color;
                }
            }
            b"border" => {
                self.borders.push(BorderKind::None);
                self.in_border = !empty;
            }
            b"left" | b"right" | b"top" | b"bottom" if self.in_border => {
                // The heaviest edge stands for the whole outline
                if let Some(style) = attr_value(e, b"style") {
                    let kind = BorderKind::from_xlsx_str(&style);
                    if let Some(last) = self.borders.last_mut() {
                        if border_weight(kind) > border_weight(*last) {
                            *last = kind;
                        }
                    }
                }
            }
            b"cellXfs" => {
                self.in_cell_xfs = !empty;
            }
            b"xf" if self.in_cell_xfs => {
                let num = |key: &[u8]| {
                    attr_value(e, key)
                        .and_then(|v| v.parse::<u32>().ok())
                        .unwrap_or(0)
                };
                let xf = RawXf {
                    num_fmt_id: num(b"numFmtId"),
                    font_id: num(b"fontId") as usize,
                    fill_id: num(b"fillId") as usize,
                    border_id: num(b"borderId") as usize,
                    locked: true,
                };
                if empty {
                    self.xfs.push(xf);
                } else {
                    self.current_xf = Some(xf);
                }
            }
            b"protection" => {
                if let Some(xf) = self.current_xf.as_mut() {
                    xf.locked = attr_value(e, b"locked").map_or(true, |v| is_truthy(&v));
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, name: &[u8]) {
        match name {
            b"font" => self.in_font = false,
            b"fill" => self.in_fill = false,
            b"border" => self.in_border = false,
            b"cellXfs" => self.in_cell_xfs = false,
            b"xf" => {
                if let Some(xf) = self.current_xf.take() {
                    self.xfs.push(xf);
                }
            }
            _ => {}
        }
    }

    fn resolve(self) -> Vec<CellStyle> {
        self.xfs
            .iter()
            .map(|xf| {
                let number_format = match xf.num_fmt_id {
                    0 => None,
                    id => self
                        .numfmts
                        .get(&id)
                        .cloned()
                        .or_else(|| builtin_numfmt_code(id).map(str::to_string)),
                };
                CellStyle {
                    fill: self.fills.get(xf.fill_id).copied().flatten(),
                    bold: self.fonts.get(xf.font_id).copied().unwrap_or(false),
                    border: self.borders.get(xf.border_id).copied().unwrap_or_default(),
                    number_format,
                    locked: xf.locked,
                }
            })
            .collect()
    }
}

fn border_weight(kind: BorderKind) -> u8 {
    match kind {
        BorderKind::None => 0,
        BorderKind::Thin => 1,
        BorderKind::Medium => 2,
        BorderKind::Thick => 3,
    }
}

pub(crate) fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

pub(crate) fn is_truthy(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true")
}
