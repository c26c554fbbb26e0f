//! Text escaping shared by the reader and writer

/// Escape text for XML element content and attribute values
pub(crate) fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Decode Excel's `_xHHHH_` escape sequences in strings.
///
/// Excel writes characters XML cannot carry (most control characters) as
/// `_x000B_`; a literal `_x` that would otherwise look like an escape is
/// written as `_x005F_x`. Anything that is not a complete sequence passes
/// through unchanged.
pub(crate) fn decode_excel_escapes(s: &str) -> String {
    if !s.contains("_x") {
        return s.to_string();
    }

    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find("_x") {
        result.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        match parse_escape(candidate) {
            Some(decoded) => {
                result.push(decoded);
                rest = &candidate[7..];
            }
            None => {
                result.push('_');
                rest = &candidate[1..];
            }
        }
    }
    result.push_str(rest);
    result
}

/// Parse `_xHHHH_` at the start of `s`
fn parse_escape(s: &str) -> Option<char> {
    let bytes = s.as_bytes();
    if bytes.len() < 7 || bytes[6] != b'_' {
        return None;
    }
    let hex = s.get(2..6)?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
}

/// Inverse of [`decode_excel_escapes`]
///
/// Control characters other than tab, line feed and carriage return are
/// encoded, as is the underscore of any `_xHHHH_` lookalike already present
/// in the text.
pub(crate) fn encode_excel_escapes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, c) in s.char_indices() {
        if c == '_' && parse_escape(&s[i..]).is_some() {
            out.push_str("_x005F_");
        } else if c.is_control() && !matches!(c, '\t' | '\n' | '\r') {
            out.push_str(&format!("_x{:04X}_", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}
