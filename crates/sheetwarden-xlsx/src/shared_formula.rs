//! Shared formula expansion
//!
//! Excel stores a filled-down formula once, on the top-left ("master")
//! cell of the block: `<f t="shared" ref="B1:B3" si="0">A1*2</f>`. The
//! other cells carry only `<f t="shared" si="0"/>` and mean the master's
//! text with every relative reference moved by the cell's offset.

use std::collections::HashMap;

use crate::error::{XlsxError, XlsxResult};
use sheetwarden_core::{CellAddress, MAX_COLS, MAX_ROWS};

/// Masters seen so far in one worksheet, by shared index
#[derive(Debug, Default)]
pub(crate) struct SharedFormulas {
    masters: HashMap<u32, (CellAddress, String)>,
}

impl SharedFormulas {
    pub(crate) fn insert_master(&mut self, index: u32, at: CellAddress, text: &str) {
        self.masters.insert(index, (at, text.to_string()));
    }

    /// Formula text for a follower cell at `at`
    pub(crate) fn follower(&self, index: u32, at: CellAddress) -> XlsxResult<String> {
        let (origin, text) = self.masters.get(&index).ok_or_else(|| {
            XlsxError::Parse(format!(
                "shared formula {} used at {} before its master cell",
                index, at
            ))
        })?;
        let rows = i64::from(at.row) - i64::from(origin.row);
        let cols = i64::from(at.col) - i64::from(origin.col);
        Ok(shift_references(text, rows, cols))
    }
}

/// Move every relative reference in `formula` by `rows` and `cols`
///
/// `$`-anchored parts stay put. String literals, quoted sheet names and
/// bracketed parts (structured references, external books) are copied
/// untouched. A reference pushed off the grid becomes `#REF!`.
pub(crate) fn shift_references(formula: &str, rows: i64, cols: i64) -> String {
    let bytes = formula.as_bytes();
    let mut out = String::with_capacity(formula.len() + 8);
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'"' | b'\'') => {
                let end = skip_quoted(bytes, i, quote);
                out.push_str(&formula[i..end]);
                i = end;
            }
            b'[' => {
                let end = skip_brackets(bytes, i);
                out.push_str(&formula[i..end]);
                i = end;
            }
            c if is_word_byte(c) => {
                let end = word_end(bytes, i);
                let word = &formula[i..end];
                match bytes.get(end) {
                    // Function name, sheet name or table name
                    Some(b'(' | b'!' | b'[') => out.push_str(word),
                    Some(b':') if is_line(word) => {
                        // Whole-column or whole-row range: `A:C`, `$1:$3`
                        let second_start = end + 1;
                        let second_end = word_end(bytes, second_start);
                        let second = &formula[second_start..second_end];
                        let sheet_span = bytes.get(second_end) == Some(&b'!');
                        if !sheet_span && same_line_kind(word, second) {
                            out.push_str(&shift_line(word, rows, cols));
                            out.push(':');
                            out.push_str(&shift_line(second, rows, cols));
                            i = second_end;
                            continue;
                        }
                        out.push_str(&shift_cell(word, rows, cols).unwrap_or_else(|| word.into()));
                    }
                    _ => {
                        out.push_str(&shift_cell(word, rows, cols).unwrap_or_else(|| word.into()))
                    }
                }
                i = end;
            }
            c => {
                out.push(char::from(c));
                i += 1;
            }
        }
    }

    out
}

/// Bytes that can belong to a name, number or reference. Non-ASCII bytes
/// count so multi-byte characters are never split.
fn is_word_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'_' | b'.' | b'$' | b'\\') || c >= 0x80
}

fn word_end(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && is_word_byte(bytes[end]) {
        end += 1;
    }
    end
}

/// End of a `"..."` or `'...'` run; a doubled quote is an escape
fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

fn skip_brackets(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    for (offset, &c) in bytes[start..].iter().enumerate() {
        match c {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return start + offset + 1;
                }
            }
            _ => {}
        }
    }
    bytes.len()
}

/// `$`-prefixed letters, then `$`-prefixed digits, nothing else
struct CellParts<'a> {
    col_abs: bool,
    col: &'a str,
    row_abs: bool,
    row: &'a str,
}

fn split_cell(word: &str) -> Option<CellParts<'_>> {
    let (col_abs, rest) = strip_dollar(word);
    let letters = rest.bytes().take_while(u8::is_ascii_alphabetic).count();
    if !(1..=3).contains(&letters) {
        return None;
    }
    let (col, rest) = rest.split_at(letters);
    let (row_abs, row) = strip_dollar(rest);
    if row.is_empty() || !row.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(CellParts {
        col_abs,
        col,
        row_abs,
        row,
    })
}

fn strip_dollar(s: &str) -> (bool, &str) {
    match s.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, s),
    }
}

fn shift_cell(word: &str, rows: i64, cols: i64) -> Option<String> {
    let parts = split_cell(word)?;
    let col = column_number(parts.col)?;
    let row: i64 = parts.row.parse().ok()?;
    if row < 1 || row > i64::from(MAX_ROWS) {
        return None;
    }

    let new_col = if parts.col_abs { col } else { col + cols };
    let new_row = if parts.row_abs { row } else { row + rows };
    if !in_cols(new_col) || !in_rows(new_row) {
        return Some("#REF!".to_string());
    }
    Some(format!(
        "{}{}{}{}",
        dollar(parts.col_abs),
        column_letters(new_col),
        dollar(parts.row_abs),
        new_row
    ))
}

/// A bare column (`A`, `$XFD`) or a bare row (`7`, `$7`)
fn is_line(word: &str) -> bool {
    let (_, rest) = strip_dollar(word);
    is_column_word(rest) || is_row_word(rest)
}

fn is_column_word(s: &str) -> bool {
    (1..=3).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_alphabetic())
}

fn is_row_word(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn same_line_kind(first: &str, second: &str) -> bool {
    let (_, a) = strip_dollar(first);
    let (_, b) = strip_dollar(second);
    (is_column_word(a) && is_column_word(b)) || (is_row_word(a) && is_row_word(b))
}

fn shift_line(word: &str, rows: i64, cols: i64) -> String {
    let (absolute, rest) = strip_dollar(word);
    if absolute {
        return word.to_string();
    }
    if is_row_word(rest) {
        return match rest.parse::<i64>() {
            Ok(row) if in_rows(row + rows) => (row + rows).to_string(),
            _ => "#REF!".to_string(),
        };
    }
    match column_number(rest) {
        Some(col) if in_cols(col + cols) => column_letters(col + cols),
        _ => "#REF!".to_string(),
    }
}

fn in_rows(row: i64) -> bool {
    (1..=i64::from(MAX_ROWS)).contains(&row)
}

fn in_cols(col: i64) -> bool {
    (1..=i64::from(MAX_COLS)).contains(&col)
}

fn dollar(absolute: bool) -> &'static str {
    if absolute {
        "$"
    } else {
        ""
    }
}

/// 1-based column number for `A`..`XFD`
fn column_number(letters: &str) -> Option<i64> {
    let col = letters.bytes().fold(0i64, |acc, b| {
        acc * 26 + i64::from(b.to_ascii_uppercase() - b'A') + 1
    });
    in_cols(col).then_some(col)
}

fn column_letters(col: i64) -> String {
    match u16::try_from(col) {
        Ok(col) => CellAddress::column_to_letters(col),
        Err(_) => "#REF!".to_string(),
    }
}
