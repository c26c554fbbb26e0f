//! Cell address and range types
//!
//! Addresses here are the strict, canonical A1 form accepted from callers:
//! uppercase column letters followed by a row number without leading zeros.
//! Absolute markers (`$`) belong to formula text and are handled by the
//! formula lexer, not by this parser.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};

/// Longest column label in the grid ("XFD")
const MAX_COLUMN_LETTERS: usize = 3;

/// A cell address (e.g., "A1", "XFD1048576")
///
/// Both coordinates are 1-based: column A is 1, row 1 is 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellAddress {
    /// Row number (1-based). Declared first so ordering is row-major.
    pub row: u32,
    /// Column number (1-based, A=1, XFD=16384)
    pub col: u16,
}

impl CellAddress {
    /// Create a new cell address from 1-based column and row.
    ///
    /// Fails with [`Error::InvalidAddress`] if either coordinate is zero or
    /// beyond the sheet limits.
    pub fn new(col: u16, row: u32) -> Result<Self> {
        if col == 0 || col > MAX_COLS {
            return Err(Error::InvalidAddress(format!(
                "column {} out of range 1..={}",
                col, MAX_COLS
            )));
        }
        if row == 0 || row > MAX_ROWS {
            return Err(Error::InvalidAddress(format!(
                "row {} out of range 1..={}",
                row, MAX_ROWS
            )));
        }
        Ok(Self { row, col })
    }

    /// Parse a cell address from canonical A1 notation
    ///
    /// # Examples
    /// ```
    /// use sheetwarden_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("C7").unwrap();
    /// assert_eq!(addr.col, 3);
    /// assert_eq!(addr.row, 7);
    ///
    /// assert!(CellAddress::parse("a1").is_err());
    /// assert!(CellAddress::parse("A01").is_err());
    /// assert!(CellAddress::parse("XFE1").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::InvalidAddress("empty address".into()));
        }

        let bytes = s.as_bytes();
        let letters_end = bytes
            .iter()
            .position(|b| !b.is_ascii_uppercase())
            .unwrap_or(bytes.len());

        if letters_end == 0 {
            return Err(Error::InvalidAddress(format!(
                "'{}' must start with uppercase column letters",
                s
            )));
        }

        let digits = &s[letters_end..];
        if digits.is_empty() {
            return Err(Error::InvalidAddress(format!("no row number in '{}'", s)));
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidAddress(format!(
                "'{}' is not of the form [A-Z]+[1-9][0-9]*",
                s
            )));
        }
        if digits.starts_with('0') {
            return Err(Error::InvalidAddress(format!(
                "row number in '{}' must not start with 0",
                s
            )));
        }

        let col = Self::letters_to_column(&s[..letters_end])?;

        // More than seven digits is always past the last row; checking the
        // length first keeps the parse below from overflowing.
        if digits.len() > 7 {
            return Err(Error::InvalidAddress(format!(
                "row in '{}' exceeds {}",
                s, MAX_ROWS
            )));
        }
        let row: u32 = digits
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{}'", s)))?;

        Self::new(col, row).map_err(|_| {
            Error::InvalidAddress(format!("'{}' is outside the sheet limits", s))
        })
    }

    /// Convert a 1-based column number to letters (1 = A, 26 = Z, 27 = AA)
    pub fn column_to_letters(col: u16) -> String {
        let mut result = String::new();
        let mut n = col as u32;

        while n > 0 {
            n -= 1;
            let c = ((n % 26) as u8 + b'A') as char;
            result.insert(0, c);
            n /= 26;
        }

        result
    }

    /// Convert uppercase column letters to a 1-based column number
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        if letters.is_empty() {
            return Err(Error::InvalidAddress("empty column letters".into()));
        }
        if letters.len() > MAX_COLUMN_LETTERS {
            return Err(Error::InvalidAddress(format!(
                "column '{}' exceeds XFD",
                letters
            )));
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_uppercase() {
                return Err(Error::InvalidAddress(format!(
                    "invalid column letter '{}'",
                    c
                )));
            }
            col = col * 26 + (c as u32 - 'A' as u32 + 1);
        }

        if col > MAX_COLS as u32 {
            return Err(Error::InvalidAddress(format!(
                "column '{}' exceeds XFD",
                letters
            )));
        }

        Ok(col as u16)
    }

    /// Column letters of this address
    pub fn column_letters(&self) -> String {
        Self::column_to_letters(self.col)
    }

    /// Format as canonical A1 string
    pub fn to_a1_string(&self) -> String {
        format!("{}{}", Self::column_to_letters(self.col), self.row)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::column_to_letters(self.col), self.row)
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A normalized rectangular range of cells (e.g., "A1:B10")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangeAddress {
    /// Top-left corner
    pub start: CellAddress,
    /// Bottom-right corner
    pub end: CellAddress,
}

impl RangeAddress {
    /// Create a range from two corners in any order
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        Self {
            start: CellAddress {
                row: a.row.min(b.row),
                col: a.col.min(b.col),
            },
            end: CellAddress {
                row: a.row.max(b.row),
                col: a.col.max(b.col),
            },
        }
    }

    /// Create a single-cell range
    pub fn single(addr: CellAddress) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    /// Parse a range from `A1:B10` notation. A lone cell is a degenerate range.
    ///
    /// Reversed corners are normalized rather than rejected:
    ///
    /// ```
    /// use sheetwarden_core::RangeAddress;
    ///
    /// assert_eq!(
    ///     RangeAddress::parse("B10:A1").unwrap(),
    ///     RangeAddress::parse("A1:B10").unwrap()
    /// );
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::InvalidRange("empty range".into()));
        }

        let mut parts = s.split(':');
        let first = parts.next().unwrap_or_default();
        let second = parts.next();
        if parts.next().is_some() {
            return Err(Error::InvalidRange(format!(
                "'{}' has more than one ':' separator",
                s
            )));
        }

        let start = CellAddress::parse(first)
            .map_err(|e| Error::InvalidRange(format!("'{}': {}", s, e)))?;
        match second {
            None => Ok(Self::single(start)),
            Some(second) => {
                let end = CellAddress::parse(second)
                    .map_err(|e| Error::InvalidRange(format!("'{}': {}", s, e)))?;
                Ok(Self::new(start, end))
            }
        }
    }

    /// Check if a cell is within this range
    pub fn contains(&self, addr: &CellAddress) -> bool {
        addr.row >= self.start.row
            && addr.row <= self.end.row
            && addr.col >= self.start.col
            && addr.col <= self.end.col
    }

    /// Number of rows in the range
    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    /// Number of columns in the range
    pub fn col_count(&self) -> u16 {
        self.end.col - self.start.col + 1
    }

    /// Total number of cells in the range
    pub fn cell_count(&self) -> u64 {
        self.row_count() as u64 * self.col_count() as u64
    }

    /// Iterate over all cell addresses in the range (row by row)
    pub fn cells(&self) -> RangeCells {
        RangeCells {
            range: *self,
            next: Some(self.start),
        }
    }

    /// Format as `A1:B10`, or `A1` for a single cell
    pub fn to_a1_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RangeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

impl FromStr for RangeAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Iterator over cells in a range, row-major
pub struct RangeCells {
    range: RangeAddress,
    next: Option<CellAddress>,
}

impl Iterator for RangeCells {
    type Item = CellAddress;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        self.next = if current.col < self.range.end.col {
            Some(CellAddress {
                row: current.row,
                col: current.col + 1,
            })
        } else if current.row < self.range.end.row {
            Some(CellAddress {
                row: current.row + 1,
                col: self.range.start.col,
            })
        } else {
            None
        };

        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn addr(col: u16, row: u32) -> CellAddress {
        CellAddress::new(col, row).unwrap()
    }

    #[test]
    fn test_column_to_letters() {
        assert_eq!(CellAddress::column_to_letters(1), "A");
        assert_eq!(CellAddress::column_to_letters(26), "Z");
        assert_eq!(CellAddress::column_to_letters(27), "AA");
        assert_eq!(CellAddress::column_to_letters(702), "ZZ");
        assert_eq!(CellAddress::column_to_letters(703), "AAA");
        assert_eq!(CellAddress::column_to_letters(16384), "XFD");
    }

    #[test]
    fn test_letters_to_column() {
        assert_eq!(CellAddress::letters_to_column("A").unwrap(), 1);
        assert_eq!(CellAddress::letters_to_column("Z").unwrap(), 26);
        assert_eq!(CellAddress::letters_to_column("AA").unwrap(), 27);
        assert_eq!(CellAddress::letters_to_column("XFD").unwrap(), 16384);
        assert!(CellAddress::letters_to_column("XFE").is_err());
        assert!(CellAddress::letters_to_column("AAAA").is_err());
        assert!(CellAddress::letters_to_column("a").is_err());
    }

    #[test]
    fn test_cell_address_parse() {
        assert_eq!(CellAddress::parse("A1").unwrap(), addr(1, 1));
        assert_eq!(CellAddress::parse("B10").unwrap(), addr(2, 10));
        assert_eq!(
            CellAddress::parse("XFD1048576").unwrap(),
            addr(16384, 1_048_576)
        );
    }

    #[test]
    fn test_cell_address_parse_errors() {
        for bad in [
            "", "A", "1", "A0", "A01", "a1", "$A$1", " A1", "A1 ", "A1048577", "XFE1", "A-1",
            "A1.5", "1A", "AB12C", "A99999999999",
        ] {
            assert!(
                matches!(CellAddress::parse(bad), Err(Error::InvalidAddress(_))),
                "expected '{}' to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_new_rejects_zero_and_overflow() {
        assert!(CellAddress::new(0, 1).is_err());
        assert!(CellAddress::new(1, 0).is_err());
        assert!(CellAddress::new(16385, 1).is_err());
        assert!(CellAddress::new(1, 1_048_577).is_err());
    }

    #[test]
    fn test_cell_address_display() {
        assert_eq!(addr(1, 1).to_string(), "A1");
        assert_eq!(addr(3, 100).to_string(), "C100");
    }

    #[test]
    fn test_range_parse_normalizes() {
        let forward = RangeAddress::parse("A1:B10").unwrap();
        let reversed = RangeAddress::parse("B10:A1").unwrap();
        assert_eq!(forward, reversed);
        assert_eq!(forward.start, addr(1, 1));
        assert_eq!(forward.end, addr(2, 10));

        // Mixed corners (top-right to bottom-left)
        let mixed = RangeAddress::parse("B1:A10").unwrap();
        assert_eq!(mixed, forward);
    }

    #[test]
    fn test_range_single_cell() {
        let range = RangeAddress::parse("C3").unwrap();
        assert_eq!(range.start, range.end);
        assert_eq!(range.to_string(), "C3");
        assert_eq!(range.cell_count(), 1);
    }

    #[test]
    fn test_range_parse_errors() {
        for bad in ["", ":", "A1:", ":B2", "A1::B2", "A1:B2:C3", "A1-B2", "A1:ZZZZ1"] {
            assert!(
                matches!(RangeAddress::parse(bad), Err(Error::InvalidRange(_))),
                "expected '{}' to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_range_contains() {
        let range = RangeAddress::parse("B2:D4").unwrap();
        assert!(range.contains(&addr(2, 2)));
        assert!(range.contains(&addr(4, 4)));
        assert!(range.contains(&addr(3, 3)));
        assert!(!range.contains(&addr(1, 1)));
        assert!(!range.contains(&addr(2, 5)));
    }

    #[test]
    fn test_range_cells_row_major() {
        let range = RangeAddress::parse("A1:B2").unwrap();
        let cells: Vec<String> = range.cells().map(|c| c.to_string()).collect();
        assert_eq!(cells, vec!["A1", "B1", "A2", "B2"]);
    }

    #[test]
    fn test_ordering_is_row_major() {
        assert!(addr(5, 1) < addr(1, 2));
        assert!(addr(1, 2) < addr(2, 2));
    }
}
