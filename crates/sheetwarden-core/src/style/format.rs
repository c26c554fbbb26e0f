//! Number-format patterns for the common financial format types

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Most decimal places Excel accepts in a number format
pub const MAX_DECIMALS: u8 = 30;

/// Format types understood by [`number_format`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatType {
    /// `$#,##0.00`
    Currency,
    /// `0.00%`
    Percent,
    /// `#,##0.00`
    Number,
    /// Four-section accounting format with aligned currency symbol
    Accounting,
}

impl FormatType {
    pub const ALL: [FormatType; 4] = [
        FormatType::Currency,
        FormatType::Percent,
        FormatType::Number,
        FormatType::Accounting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FormatType::Currency => "currency",
            FormatType::Percent => "percent",
            FormatType::Number => "number",
            FormatType::Accounting => "accounting",
        }
    }
}

impl FromStr for FormatType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FormatType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownFormatType(s.to_string()))
    }
}

impl fmt::Display for FormatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the number-format pattern for a format type
///
/// ```
/// use sheetwarden_core::{number_format, FormatType};
///
/// assert_eq!(number_format(FormatType::Currency, 2).unwrap(), "$#,##0.00");
/// assert_eq!(number_format(FormatType::Percent, 0).unwrap(), "0%");
/// assert!(number_format(FormatType::Number, 31).is_err());
/// ```
pub fn number_format(format_type: FormatType, decimals: u8) -> Result<String> {
    if decimals > MAX_DECIMALS {
        return Err(Error::InvalidDecimals {
            actual: decimals as i64,
            max: MAX_DECIMALS,
        });
    }

    let fraction = if decimals == 0 {
        String::new()
    } else {
        format!(".{}", "0".repeat(decimals as usize))
    };

    Ok(match format_type {
        FormatType::Currency => format!("$#,##0{}", fraction),
        FormatType::Percent => format!("0{}%", fraction),
        FormatType::Number => format!("#,##0{}", fraction),
        FormatType::Accounting => format!(
            "_($* #,##0{f}_);_($* (#,##0{f});_($* \"-\"??_);_(@_)",
            f = fraction
        ),
    })
}

/// Like [`number_format`], taking the format type by name
pub fn number_format_named(format_type: &str, decimals: u8) -> Result<String> {
    number_format(format_type.parse()?, decimals)
}
