//! Export options

/// How exported rows are laid out as CSV
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvWriteOptions {
    pub delimiter: u8,
    pub quote: u8,
    pub line_terminator: LineTerminator,
}

impl Default for CsvWriteOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            line_terminator: LineTerminator::default(),
        }
    }
}

impl CsvWriteOptions {
    /// Semicolon-separated output, as Excel writes it in comma-decimal locales
    pub fn semicolon() -> Self {
        Self {
            delimiter: b';',
            ..Self::default()
        }
    }
}

/// Record terminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineTerminator {
    #[default]
    Lf,
    CrLf,
}

impl From<LineTerminator> for csv::Terminator {
    fn from(t: LineTerminator) -> Self {
        match t {
            LineTerminator::Lf => csv::Terminator::Any(b'\n'),
            LineTerminator::CrLf => csv::Terminator::CRLF,
        }
    }
}
